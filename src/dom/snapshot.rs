use crate::browser::driver::PageDriver;
use crate::dom::element::{ElementNode, IDENTITY_ATTR};
use crate::dom::locator::{resolve, Locator};
use crate::dom::strip::mild_strip;
use crate::dom::tagger::tag_frame;
use crate::error::{BrowserError, Result};
use futures::future::{BoxFuture, FutureExt};
use scraper::{Html, Selector};
use std::time::SystemTime;

/// Serializes the document of whichever frame the expression runs in
pub(crate) const CONTENT_SCRIPT: &str = "document.documentElement ? document.documentElement.outerHTML : ''";

/// Point-in-time capture of a page: composite HTML of every reachable frame plus a screenshot
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub url: String,

    /// Composite document with iframe contents spliced in place of their iframes
    pub html: String,

    /// Base64 JPEG of the full page; `None` when capture failed
    pub screenshot: Option<String>,

    pub captured_at: SystemTime,

    root: ElementNode,

    /// Composite document with spliced frame roots flattened, for CSS matching
    match_html: String,
}

impl PageSnapshot {
    /// Assemble a snapshot from an already composed tree
    pub fn from_tree(url: impl Into<String>, root: ElementNode, screenshot: Option<String>) -> Self {
        Self {
            url: url.into(),
            html: root.to_html(),
            screenshot,
            captured_at: SystemTime::now(),
            match_html: root.to_matching_html(),
            root,
        }
    }

    /// Root of the composite tree
    pub fn root(&self) -> &ElementNode {
        &self.root
    }

    /// Screenshot or an empty string
    pub fn screenshot_or_empty(&self) -> String {
        self.screenshot.clone().unwrap_or_default()
    }

    /// Resolve an identity token to a frame-scoped locator
    pub fn resolve(&self, id: &str) -> Option<Locator> {
        resolve(&self.root, id)
    }

    /// Locators of every tagged element matching a CSS selector
    pub fn select(&self, selector: &str) -> Result<Vec<Locator>> {
        let selector = Selector::parse(selector)
            .map_err(|e| BrowserError::InvalidArgument(format!("Invalid selector '{}': {}", selector, e)))?;
        let document = Html::parse_document(&self.match_html);
        Ok(self.collect_matches(&document, &selector))
    }

    /// Try candidate selectors from the last to the first; the first one matching
    /// at least one tagged element wins. With `only_one` only its first match is kept.
    pub fn match_candidates(&self, candidates: &[String], only_one: bool) -> Option<Vec<Locator>> {
        if candidates.is_empty() {
            return None;
        }

        let document = Html::parse_document(&self.match_html);

        for candidate in candidates.iter().rev() {
            let selector = match Selector::parse(candidate) {
                Ok(selector) => selector,
                Err(e) => {
                    log::warn!("Skipping unparsable selector '{}': {}", candidate, e);
                    continue;
                }
            };

            let mut matches = self.collect_matches(&document, &selector);
            if matches.is_empty() {
                log::debug!("Selector '{}' matched nothing", candidate);
                continue;
            }

            if only_one {
                matches.truncate(1);
            }
            return Some(matches);
        }

        None
    }

    fn collect_matches(&self, document: &Html, selector: &Selector) -> Vec<Locator> {
        document
            .select(selector)
            .filter_map(|element| element.value().attr(IDENTITY_ATTR))
            .filter_map(|id| self.resolve(id))
            .collect()
    }
}

/// Tag the page, serialize every reachable frame into one composite tree and capture a screenshot.
///
/// Tagging failure in the top frame is fatal. Frames that cannot be entered or
/// tagged are left as plain iframe elements. A failed screenshot yields `None`.
pub async fn build_snapshot(driver: &dyn PageDriver) -> Result<PageSnapshot> {
    tag_frame(driver, &[]).await?;

    let url = driver.url().await?;
    let html = frame_content(driver, &[]).await?;
    let mut root = ElementNode::parse_document(&html);

    let (_, screenshot) = tokio::join!(expand_frames(driver, &mut root, Vec::new()), capture_screenshot(driver));

    Ok(PageSnapshot::from_tree(url, root, screenshot))
}

async fn capture_screenshot(driver: &dyn PageDriver) -> Option<String> {
    match driver.screenshot(true).await {
        Ok(data) => Some(data),
        Err(e) => {
            log::warn!("Snapshot screenshot failed, continuing without it: {}", e);
            None
        }
    }
}

async fn frame_content(driver: &dyn PageDriver, frame_path: &[String]) -> Result<String> {
    let value = driver.evaluate(frame_path, CONTENT_SCRIPT).await?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| BrowserError::DomParseFailed(format!("Frame {:?} returned no document", frame_path)))
}

fn expand_frames<'a>(
    driver: &'a dyn PageDriver,
    node: &'a mut ElementNode,
    parent_path: Vec<String>,
) -> BoxFuture<'a, ()> {
    async move {
        for iframe_id in node.iframe_identities() {
            let mut path = parent_path.clone();
            path.push(iframe_id.clone());

            let content = match load_frame(driver, &path).await {
                Ok(content) => content,
                Err(e) => {
                    log::debug!("Skipping frame {:?}: {}", path, e);
                    continue;
                }
            };

            let mut frame_root = ElementNode::parse_document(&content);
            mild_strip(&mut frame_root);
            expand_frames(driver, &mut frame_root, path).await;

            if !node.replace_iframe(&iframe_id, frame_root) {
                log::debug!("Iframe {} vanished from the tree before splicing", iframe_id);
            }
        }
    }
    .boxed()
}

async fn load_frame(driver: &dyn PageDriver, path: &[String]) -> Result<String> {
    tag_frame(driver, path).await?;
    frame_content(driver, path).await
}
