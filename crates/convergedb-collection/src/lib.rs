//! # convergedb-collection
//!
//! The Collection / Sync Engine: `get`/`all`/`where`/`insert`/
//! `update`/`create_many`/`update_many`, digest/bucket computation for
//! anti-entropy, and the CRDT `merge` operation. Built entirely on the
//! `Storage` and `Validator` traits from `convergedb-core` — no concrete
//! adapter is depended on here.

mod config;
mod engine;
mod listener;
mod ordering;
mod state;

pub use config::CollectionConfig;
pub use engine::{BatchOutcome, Collection, HashSummary};
pub use listener::{ChangeEvent, ChangeKind, ListenerFn};
pub use state::LifecycleState;
