use crate::dom::element::{ElementNode, FRAME_PATH_SEPARATOR, IDENTITY_ATTR};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of a tagged element: the iframe hops leading to its frame, then its own token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    /// Identity tokens of the ancestor iframes, outermost first
    pub frame_path: Vec<String>,

    /// Identity token of the element within its frame
    pub id: String,
}

impl Locator {
    pub fn new(frame_path: Vec<String>, id: impl Into<String>) -> Self {
        Self { frame_path, id: id.into() }
    }

    /// Locator for an element of the top-level document
    pub fn top(id: impl Into<String>) -> Self {
        Self::new(Vec::new(), id)
    }

    /// CSS selector matching the element inside its own frame
    pub fn css(&self) -> String {
        format!("[{}=\"{}\"]", IDENTITY_ATTR, self.id.replace('\\', "\\\\").replace('"', "\\\""))
    }

    /// Fully qualified id, e.g. `frameA|frameB|elementId`
    pub fn qualified_id(&self) -> String {
        let mut parts = self.frame_path.clone();
        parts.push(self.id.clone());
        parts.join(&FRAME_PATH_SEPARATOR.to_string())
    }

    pub fn in_frame(&self) -> bool {
        !self.frame_path.is_empty()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_id())
    }
}

/// Split a frame path annotation into its segments
pub fn parse_frame_path(path: &str) -> Vec<String> {
    path.split(FRAME_PATH_SEPARATOR).filter(|segment| !segment.is_empty()).map(str::to_string).collect()
}

/// Resolve an identity token in a composite tree to a frame-scoped locator.
///
/// The frame path is taken from the nearest element (the target itself, then its
/// ancestors) carrying a frame path annotation; without one the locator is
/// scoped to the top-level page.
pub fn resolve(root: &ElementNode, id: &str) -> Option<Locator> {
    let chain = root.find_with_ancestors(id)?;
    let frame_path = chain.iter().rev().find_map(|element| element.frame_path()).map(parse_frame_path).unwrap_or_default();

    Some(Locator::new(frame_path, id))
}
