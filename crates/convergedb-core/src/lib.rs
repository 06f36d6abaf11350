//! # convergedb-core
//!
//! Foundation crate for convergedb: the field-level CRDT document model, the
//! hybrid logical clock, the content-addressed hash subsystem, the error
//! taxonomy, and the `Storage`/`Validator` adapter traits. Every other crate
//! in the workspace depends on this one.

pub mod crdt;
pub mod errors;
pub mod hash;
pub mod hlc;
pub mod path;
pub mod traits;
pub mod value;

pub use crdt::{Document, Field};
pub use errors::{ConvergeError, ConvergeResult};
pub use hlc::{Hlc, HlcClock};
pub use traits::{Storage, ValidationIssue, ValidationOutcome, Validator};
pub use value::Value;
