//! Identity tagging, frame flattening and locators.
//!
//! Every element of every reachable frame gets an identity attribute. The
//! frames are then serialized and spliced into one composite tree, from which
//! any identity can be turned back into a frame-scoped [`Locator`].

pub mod element;
pub mod locator;
pub mod snapshot;
pub mod strip;
pub mod tagger;

pub use element::{DomNode, ElementNode, FRAME_PATH_ATTR, IDENTITY_ATTR};
pub use locator::Locator;
pub use snapshot::{build_snapshot, PageSnapshot};
