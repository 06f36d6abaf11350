//! CRDT documents: a map of named fields for one entity.

use super::field::Field;
use crate::hash;
use crate::hlc::{Hlc, HlcClock};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A document groups fields for one entity. `hash` is a deterministic
/// function of `fields`; `id` appears as one of the fields.
///
/// On disk a document is exactly `{id, _fields, _hash}`;
/// `doc_hlc` is derived (the max field HLC) and is never itself persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: String,
    #[serde(rename = "_fields")]
    fields: BTreeMap<String, Field>,
    #[serde(rename = "_hash")]
    hash: String,
    #[serde(skip, default)]
    doc_hlc: Hlc,
}

impl Document {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn doc_hlc(&self) -> &Hlc {
        &self.doc_hlc
    }

    pub fn fields(&self) -> &BTreeMap<String, Field> {
        &self.fields
    }

    pub fn get(&self, field_name: &str) -> Option<&Value> {
        self.fields.get(field_name).map(Field::value)
    }

    /// Flatten to a plain id + values map, e.g. what `Collection::get`
    /// returns to the caller.
    pub fn to_data(&self) -> BTreeMap<String, Value> {
        self.fields.iter().map(|(k, f)| (k.clone(), f.value().clone())).collect()
    }

    /// `make_document(hlc, id, data)`: assign the same HLC to every field
    /// derived from `data`, including the id field, then hash.
    pub fn make(hlc: Hlc, id: &str, data: BTreeMap<String, Value>) -> Self {
        let mut fields: BTreeMap<String, Field> = data
            .into_iter()
            .map(|(k, v)| (k, Field::new(v, hlc.clone())))
            .collect();
        fields.insert("id".to_string(), Field::new(Value::from(id), hlc.clone()));

        let mut doc = Self {
            id: id.to_string(),
            fields,
            hash: String::new(),
            doc_hlc: hlc,
        };
        doc.recompute();
        doc
    }

    /// `update_document(clock, doc, partial_changes)`: for every key in
    /// `partial_changes`, tick a fresh HLC and replace that field; unchanged
    /// fields retain their prior state. Recomputes `hash` and `doc_hlc`.
    pub fn apply_update(&self, clock: &HlcClock, partial_changes: &BTreeMap<String, Value>) -> Self {
        let mut fields = self.fields.clone();
        for (key, value) in partial_changes {
            let hlc = clock.tick();
            fields.insert(key.clone(), Field::new(value.clone(), hlc));
        }

        let mut doc = Self {
            id: self.id.clone(),
            fields,
            hash: String::new(),
            doc_hlc: self.doc_hlc.clone(),
        };
        doc.recompute();
        doc
    }

    /// `merge_document(local, remote)`: union of field names, field-wise
    /// merge, absent-field tolerant. Closed under union of field sets.
    pub fn merge(&self, remote: &Self) -> Self {
        let mut fields = BTreeMap::new();
        let all_keys: std::collections::BTreeSet<&String> =
            self.fields.keys().chain(remote.fields.keys()).collect();

        for key in all_keys {
            let merged_field = match (self.fields.get(key), remote.fields.get(key)) {
                (Some(a), Some(b)) => a.merge(b),
                (Some(a), None) => a.clone(),
                (None, Some(b)) => b.clone(),
                (None, None) => unreachable!("key came from one of the two field maps"),
            };
            fields.insert(key.clone(), merged_field);
        }

        let id = fields
            .get("id")
            .map(|f| match f.value() {
                Value::String(s) => s.clone(),
                other => other.canonical_string(),
            })
            .unwrap_or_else(|| self.id.clone());

        let mut doc = Self { id, fields, hash: String::new(), doc_hlc: Hlc::zero() };
        doc.recompute();
        doc
    }

    /// Serialize to the on-disk shape: `{id, _fields, _hash}`.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Deserialize from the on-disk shape, re-deriving `doc_hlc` and `hash`
    /// from `_fields` (the stored `_hash` is overwritten by the recomputed
    /// value, which doubles as an integrity check of `_fields`).
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        let mut doc: Self = serde_json::from_str(s)?;
        doc.recompute();
        Ok(doc)
    }

    /// Recompute `hash` from `fields` and `doc_hlc` as the max field HLC.
    fn recompute(&mut self) {
        let refs: Vec<(&str, &Value)> = self.fields.iter().map(|(k, f)| (k.as_str(), f.value())).collect();
        self.hash = hash::hash_object(refs);
        self.doc_hlc = self
            .fields
            .values()
            .map(Field::hlc)
            .max()
            .cloned()
            .unwrap_or_else(Hlc::zero);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> BTreeMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), Value::from(*v))).collect()
    }

    #[test]
    fn make_document_includes_id_field() {
        let hlc = Hlc::new(1, 0, "aaaaaaaa".into());
        let doc = Document::make(hlc, "u1", data(&[("name", "Alice")]));
        assert_eq!(doc.get("id"), Some(&Value::from("u1")));
        assert_eq!(doc.get("name"), Some(&Value::from("Alice")));
    }

    #[test]
    fn hash_is_independent_of_construction_order() {
        let hlc = Hlc::new(1, 0, "aaaaaaaa".into());
        let a = Document::make(hlc.clone(), "u1", data(&[("name", "Alice"), ("city", "NYC")]));
        let b = Document::make(hlc, "u1", data(&[("city", "NYC"), ("name", "Alice")]));
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn merge_is_commutative_associative_idempotent() {
        let hlc_a = Hlc::new(1, 0, "aaaaaaaa".into());
        let hlc_b = Hlc::new(2, 0, "bbbbbbbb".into());
        let hlc_c = Hlc::new(3, 0, "cccccccc".into());
        let a = Document::make(hlc_a, "u1", data(&[("name", "Alice")]));
        let b = Document::make(hlc_b, "u1", data(&[("age", "30")]));
        let c = Document::make(hlc_c, "u1", data(&[("city", "NYC")]));

        assert_eq!(a.merge(&b).hash(), b.merge(&a).hash());
        assert_eq!(a.merge(&a).hash(), a.hash());
        let left = a.merge(&b).merge(&c);
        let right = a.merge(&b.merge(&c));
        assert_eq!(left.hash(), right.hash());
    }

    #[test]
    fn merge_tolerates_absent_fields_on_either_side() {
        let hlc_a = Hlc::new(1, 0, "aaaaaaaa".into());
        let hlc_b = Hlc::new(2, 0, "bbbbbbbb".into());
        let a = Document::make(hlc_a, "u1", data(&[("name", "Alice")]));
        let b = Document::make(hlc_b, "u1", data(&[("age", "30")]));
        let merged = a.merge(&b);
        assert_eq!(merged.get("name"), Some(&Value::from("Alice")));
        assert_eq!(merged.get("age"), Some(&Value::from("30")));
    }

    #[test]
    fn doc_hlc_is_max_field_hlc() {
        let clock = HlcClock::from_persisted(Hlc::zero());
        let hlc = clock.tick();
        let doc = Document::make(hlc, "u1", data(&[("name", "Alice"), ("age", "30")]));
        let updated = doc.apply_update(&clock, &data(&[("name", "Bob")]));
        assert!(updated.doc_hlc() > doc.doc_hlc());
        assert_eq!(updated.get("age"), Some(&Value::from("30")));
        assert_eq!(updated.get("name"), Some(&Value::from("Bob")));
    }

    #[test]
    fn bidirectional_last_writer_wins_on_disjoint_fields() {
        // Two replicas start from the same document, then diverge on
        // different fields; merging in either direction converges.
        let base_hlc = Hlc::new(100, 0, "00000000".into());
        let base = Document::make(base_hlc, "u1", data(&[("name", "Alice"), ("age", "30")]));

        let clock_a = HlcClock::from_persisted(base.doc_hlc().clone());
        let replica_a = base.apply_update(&clock_a, &data(&[("name", "A-name")]));

        let clock_b = HlcClock::from_persisted(base.doc_hlc().clone());
        let replica_b = base.apply_update(&clock_b, &data(&[("age", "99")]));

        let merged_ab = replica_a.merge(&replica_b);
        let merged_ba = replica_b.merge(&replica_a);

        assert_eq!(merged_ab.hash(), merged_ba.hash());
        assert_eq!(merged_ab.get("name"), Some(&Value::from("A-name")));
        assert_eq!(merged_ab.get("age"), Some(&Value::from("99")));
    }
}
