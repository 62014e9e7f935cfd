use crate::browser::driver::PageDriver;
use crate::dom::element::FRAME_PATH_SEPARATOR;
use crate::error::{BrowserError, Result};
use std::time::Duration;

/// Attempts made before tagging is declared failed
pub const TAG_ATTEMPTS: usize = 3;

/// Load-state wait between attempts
pub const TAG_RETRY_LOAD_WAIT: Duration = Duration::from_secs(3);

/// Build the tagging expression for a frame
pub fn tagging_script(frame_path: &[String]) -> String {
    let path = frame_path.join(&FRAME_PATH_SEPARATOR.to_string());
    // A JSON string literal is a valid JS string literal.
    let arg = serde_json::Value::String(path).to_string();
    format!("{}({})", include_str!("tag_elements.js").trim_end(), arg)
}

/// Write identity tokens into every element of the frame at `frame_path`.
///
/// Tagging is retried up to [`TAG_ATTEMPTS`] times, waiting for the frame's load
/// state in between. An unreachable frame is reported immediately.
pub async fn tag_frame(driver: &dyn PageDriver, frame_path: &[String]) -> Result<usize> {
    let script = tagging_script(frame_path);
    let mut last_error = String::new();

    for attempt in 1..=TAG_ATTEMPTS {
        match driver.evaluate(frame_path, &script).await {
            Ok(value) => {
                let tagged = value.as_u64().unwrap_or_default() as usize;
                log::debug!("Tagged {} elements in frame {:?}", tagged, frame_path);
                return Ok(tagged);
            }
            Err(e @ BrowserError::FrameUnreachable(_)) => return Err(e),
            Err(e) => {
                log::warn!("Tagging attempt {}/{} failed for frame {:?}: {}", attempt, TAG_ATTEMPTS, frame_path, e);
                last_error = e.to_string();

                if let Err(e) = driver.wait_for_load(TAG_RETRY_LOAD_WAIT).await {
                    log::debug!("Load wait after failed tagging attempt: {}", e);
                }
            }
        }
    }

    Err(BrowserError::DomTaggingFailed(format!(
        "Giving up on frame {:?} after {} attempts: {}",
        frame_path, TAG_ATTEMPTS, last_error
    )))
}
