//! The covenant: pointer to the current root-of-trust document.

use citadel_types::{EntityHash, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Covenant {
    /// Where the document lives.
    pub uri: String,
    /// Content hash of the document at `uri`.
    pub root_hash: EntityHash,
    /// Incremented with each update; zero before the first one.
    pub version: u64,
    pub updated_at: Option<Timestamp>,
}

impl Covenant {
    /// The covenant before any document has been published.
    pub fn genesis() -> Self {
        Self {
            uri: String::new(),
            root_hash: EntityHash::ZERO,
            version: 0,
            updated_at: None,
        }
    }

    pub fn is_published(&self) -> bool {
        self.version > 0
    }
}

impl Default for Covenant {
    fn default() -> Self {
        Self::genesis()
    }
}
