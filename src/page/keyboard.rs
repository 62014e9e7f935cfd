use crate::browser::driver::Modifier;
use crate::error::{BrowserError, Result};
use crate::page::{scripts, Page};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;

const SCROLL_PAUSE: Duration = Duration::from_millis(100);

/// Options for [`Page::press`]
#[derive(Debug, Clone, Default)]
pub struct PressOptions {
    /// Modifier names such as `Shift`, `Control`, `Alt` or `Meta`
    pub modifiers: Vec<String>,
    pub hold_shift: bool,
    pub hold_ctrl: bool,
    pub hold_alt: bool,
    pub hold_cmd: bool,
}

impl PressOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifiers.push(modifier.into());
        self
    }

    pub fn shift(mut self) -> Self {
        self.hold_shift = true;
        self
    }

    pub fn ctrl(mut self) -> Self {
        self.hold_ctrl = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.hold_alt = true;
        self
    }

    pub fn cmd(mut self) -> Self {
        self.hold_cmd = true;
        self
    }
}

/// Options for [`Page::scroll_to_bottom`]
#[derive(Debug, Clone)]
pub struct ScrollOptions {
    pub timeout: Duration,
    /// Pixels per step
    pub scroll_increment: u32,
    /// Consecutive steps without movement before giving up
    pub no_progress_limit: u32,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), scroll_increment: 1000, no_progress_limit: 3 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScrollPosition {
    scroll_y: f64,
    at_bottom: bool,
}

/// Split a combination like `Control+Shift+A` into the key and its modifiers
fn parse_combination(key: &str, options: &PressOptions) -> Result<(String, Vec<Modifier>)> {
    let mut parts: Vec<&str> = key.split('+').map(str::trim).collect();
    // A lone "+" is the plus key
    let key = match parts.pop() {
        Some("") | None if key.ends_with('+') => "+".to_string(),
        Some(key) => key.to_string(),
        None => String::new(),
    };
    if key.is_empty() {
        return Err(BrowserError::InvalidArgument("No key to press".to_string()));
    }

    let mut modifiers = Vec::new();
    let held = [
        (options.hold_shift, Modifier::Shift),
        (options.hold_ctrl, Modifier::Control),
        (options.hold_alt, Modifier::Alt),
        (options.hold_cmd, Modifier::Meta),
    ];
    for name in parts.iter().copied().filter(|p| !p.is_empty()).chain(options.modifiers.iter().map(String::as_str)) {
        modifiers.push(name.parse::<Modifier>()?);
    }
    modifiers.extend(held.iter().filter(|(on, _)| *on).map(|(_, modifier)| *modifier));

    let mut unique = Vec::with_capacity(modifiers.len());
    for modifier in modifiers {
        if !unique.contains(&modifier) {
            unique.push(modifier);
        }
    }

    Ok((key, unique))
}

impl Page {
    /// Press a key, optionally with modifiers held
    pub async fn press(&self, key: &str, options: &PressOptions) -> Result<()> {
        let _scope = self.log().scope("press");
        let (key, modifiers) = parse_combination(key, options)?;
        log::debug!("Pressing {} with {:?}", key, modifiers);
        self.driver().press_key(&key, &modifiers).await
    }

    /// Scroll down in steps until the bottom is reached or scrolling stops making progress
    pub async fn scroll_to_bottom(&self, options: &ScrollOptions) -> Result<()> {
        let _scope = self.log().scope("scroll_to_bottom");
        let start = Instant::now();
        let script = scripts::scroll_step(options.scroll_increment);
        let mut last_y = None;
        let mut stalled = 0;

        while start.elapsed() < options.timeout {
            let position: ScrollPosition = serde_json::from_value(self.evaluate(&script).await?)?;
            if position.at_bottom {
                log::debug!("Reached the bottom at {}px", position.scroll_y);
                return Ok(());
            }

            if last_y == Some(position.scroll_y) {
                stalled += 1;
                if stalled >= options.no_progress_limit {
                    log::debug!("Scrolling stalled at {}px", position.scroll_y);
                    return Ok(());
                }
            } else {
                stalled = 0;
            }
            last_y = Some(position.scroll_y);

            tokio::time::sleep(SCROLL_PAUSE).await;
        }

        log::info!("Stopped scrolling after {:?}", options.timeout);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, MockApi, MockPage};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_parse_combination() {
        let (key, modifiers) = parse_combination("Control+Shift+a", &PressOptions::new()).unwrap();
        assert_eq!(key, "a");
        assert_eq!(modifiers, vec![Modifier::Control, Modifier::Shift]);

        let (key, modifiers) = parse_combination("Enter", &PressOptions::new().shift().modifier("Ctrl")).unwrap();
        assert_eq!(key, "Enter");
        assert_eq!(modifiers, vec![Modifier::Control, Modifier::Shift]);

        let (_, modifiers) = parse_combination("Shift+Tab", &PressOptions::new().shift()).unwrap();
        assert_eq!(modifiers, vec![Modifier::Shift]);

        let (key, _) = parse_combination("+", &PressOptions::new()).unwrap();
        assert_eq!(key, "+");

        assert!(matches!(parse_combination("Hyper+x", &PressOptions::new()), Err(BrowserError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_press_sends_key_with_modifiers() {
        let harness = Harness::new(MockPage::new("https://example.com/"), MockApi::new()).await;
        let page = harness.active().await;

        page.press("a", &PressOptions::new().cmd()).await.unwrap();
        assert_eq!(harness.page.keys(), vec![("a".to_string(), vec![Modifier::Meta])]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_stops_at_bottom() {
        let harness = Harness::new(MockPage::new("https://example.com/"), MockApi::new()).await;
        let steps = Arc::new(Mutex::new(0));
        let counter = steps.clone();
        harness.page.respond_with(move |_, _| {
            let mut steps = counter.lock();
            *steps += 1;
            Ok(json!({"scrollY": *steps * 1000, "atBottom": *steps == 4}))
        });
        let page = harness.active().await;

        page.scroll_to_bottom(&ScrollOptions::default()).await.unwrap();
        assert_eq!(*steps.lock(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_stops_without_progress() {
        let harness = Harness::new(MockPage::new("https://example.com/"), MockApi::new()).await;
        harness.page.respond_with(|_, _| Ok(json!({"scrollY": 500, "atBottom": false})));
        let page = harness.active().await;

        let start = Instant::now();
        page.scroll_to_bottom(&ScrollOptions::default()).await.unwrap();
        assert_eq!(harness.page.scripts().len(), 4);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }
}
