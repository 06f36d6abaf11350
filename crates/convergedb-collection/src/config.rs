//! Collection configuration: `serde`-deserializable with `#[serde(default)]`
//! so partial config documents still load.

use serde::{Deserialize, Serialize};

pub const DEFAULT_BUCKET_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Default bucket size used by `get_hashes`/`get_buckets` when the
    /// caller doesn't specify one.
    pub default_bucket_size: usize,
    /// When true, `merge` rejects incoming documents carrying a field name
    /// not present in the validator's schema. The CRDT layer itself is
    /// schema-agnostic; this is a Collection-level policy knob.
    pub reject_unknown_fields_on_merge: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            default_bucket_size: DEFAULT_BUCKET_SIZE,
            reject_unknown_fields_on_merge: false,
        }
    }
}
