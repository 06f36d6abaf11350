//! The two capability boundaries the core depends on: `Storage` and
//! `Validator`. Concrete storage back-ends and schema validation
//! libraries are external collaborators; the core only ever sees these
//! traits.

use crate::errors::{ConvergeResult, Issue};
use crate::value::Value;
use async_trait::async_trait;

/// Path-keyed blob store. All paths passed here are expected to already be
/// normalized by the caller (`convergedb-collection` normalizes before
/// calling through); adapters still re-validate defensively.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn read(&self, path: &str) -> ConvergeResult<Option<String>>;
    async fn write(&self, path: &str, content: &str) -> ConvergeResult<()>;
    async fn delete(&self, path: &str) -> ConvergeResult<()>;
    async fn exists(&self, path: &str) -> ConvergeResult<bool>;
    /// Immediate children of `directory`: filenames for files, directory
    /// names (not full paths) for nested contents.
    async fn list(&self, directory: &str) -> ConvergeResult<Vec<String>>;
}

/// The outcome of validating a candidate value against a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Ok(Value),
    Issues(Vec<Issue>),
}

/// Re-exported alias so call sites can write `ValidationIssue` without
/// reaching into `errors`.
pub use crate::errors::Issue as ValidationIssue;

/// Synchronous schema validation. The core rejects async validators
/// outright — this trait's `validate` method is a plain synchronous
/// function, so there is no way to hand the core a future by accident.
pub trait Validator: Send + Sync {
    fn validate(&self, schema_name: &str, input: &Value) -> ValidationOutcome;
}
