//! Light cleanup applied to frame documents before they are spliced into a snapshot.

use crate::dom::element::{DomNode, ElementNode, FRAME_PATH_ATTR, IDENTITY_ATTR};

/// Elements removed together with their subtree
const STRIPPED_TAGS: &[&str] = &["head", "script", "style", "path", "polygon", "defs", "svg", "br"];

/// Longest attribute value kept verbatim
pub const MAX_ATTRIBUTE_LEN: usize = 100;

/// Remove noise elements and truncate long attribute values in place.
///
/// Comments and doctypes never reach the owned tree, so only elements and
/// attributes are handled here. Identity attributes are kept whole.
pub fn mild_strip(node: &mut ElementNode) {
    node.children.retain(|child| match child {
        DomNode::Element(element) => !STRIPPED_TAGS.iter().any(|tag| element.is_tag(tag)),
        DomNode::Text(_) => true,
    });

    for (key, value) in node.attributes.iter_mut() {
        if key == IDENTITY_ATTR || key == FRAME_PATH_ATTR {
            continue;
        }
        if let Some((cut, _)) = value.char_indices().nth(MAX_ATTRIBUTE_LEN) {
            value.truncate(cut);
        }
    }

    for child in node.children.iter_mut() {
        if let DomNode::Element(element) = child {
            mild_strip(element);
        }
    }
}
