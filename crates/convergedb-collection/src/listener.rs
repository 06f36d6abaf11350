//! Change listener registration types: events fired by `insert`/`update`/
//! `merge` and handed to listeners registered via `Collection`.

use convergedb_core::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Merge,
}

#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub id: String,
    pub data: BTreeMap<String, Value>,
}

pub type ListenerFn = Arc<dyn Fn(ChangeEvent) + Send + Sync>;
