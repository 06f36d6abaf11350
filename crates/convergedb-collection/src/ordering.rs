//! Canonical document order:
//! ascending `doc_hlc`, with `id` as tie-breaker. This order must be
//! identical on any two replicas whose document sets are pairwise equal —
//! it is the order digest/bucket hashing is computed over.

use convergedb_core::Document;

pub fn sorted(mut docs: Vec<Document>) -> Vec<Document> {
    docs.sort_by(|a, b| a.doc_hlc().cmp(b.doc_hlc()).then_with(|| a.id().cmp(b.id())));
    docs
}
