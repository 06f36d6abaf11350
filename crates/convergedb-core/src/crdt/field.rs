//! Last-writer-wins field register.
//!
//! Each field carries a value and the HLC it was written at. Merge keeps the
//! field with the greater HLC (strict string comparison). Equal HLCs would
//! mean two replicas independently minted the same timestamp, which the HLC
//! nonce makes effectively impossible; in debug builds we assert the values
//! agree, in release we deterministically keep `self`.
//!
//! # Examples
//!
//! ```
//! use convergedb_core::{Field, Hlc, Value};
//!
//! let a = Field::new(Value::from("hello"), Hlc::new(1, 0, "aaaaaaaa".into()));
//! let b = Field::new(Value::from("world"), Hlc::new(2, 0, "bbbbbbbb".into()));
//! let merged = a.merge(&b);
//! assert_eq!(merged.value(), &Value::from("world"));
//! ```

use crate::hlc::Hlc;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A value together with its write version. The `hlc` is immutable once
/// assigned; replacing a field requires constructing a new `Field` with a
/// strictly greater `hlc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    value: Value,
    #[serde(rename = "_hlc")]
    hlc: Hlc,
}

impl Field {
    pub fn new(value: Value, hlc: Hlc) -> Self {
        Self { value, hlc }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn hlc(&self) -> &Hlc {
        &self.hlc
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// `merge(a, b) = if a.hlc > b.hlc then a else b`.
    pub fn merge(&self, other: &Self) -> Self {
        match self.hlc.cmp(&other.hlc) {
            std::cmp::Ordering::Greater => self.clone(),
            std::cmp::Ordering::Less => other.clone(),
            std::cmp::Ordering::Equal => {
                debug_assert_eq!(
                    self.value, other.value,
                    "two fields shared an HLC but disagreed on value; the HLC nonce should make this impossible"
                );
                self.clone()
            }
        }
    }
}
