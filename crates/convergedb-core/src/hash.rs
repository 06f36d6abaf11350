//! Deterministic, non-cryptographic hashing for values, documents, and
//! rolled-up ranges of documents.
//!
//! `hash` uses DJB2-style folding rendered in base-36. Collisions are not a
//! security concern here: anti-entropy only needs equal inputs to produce
//! equal outputs, not collision resistance.

use crate::value::Value;
use std::collections::BTreeMap;

const DJB2_SEED: u64 = 5381;

/// Fast, deterministic string hash, rendered in base-36.
pub fn hash(input: &str) -> String {
    let mut h: u64 = DJB2_SEED;
    for byte in input.bytes() {
        h = h.wrapping_mul(33) ^ (byte as u64);
    }
    to_base36(h)
}

fn to_base36(mut n: u64) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap()
}

/// Canonicalize a value (sorted keys, recursive) and hash its serialized
/// form.
pub fn hash_value(value: &Value) -> String {
    hash(&value.canonical_string())
}

/// Canonicalize and hash an object built from field-name -> value pairs,
/// e.g. a document's field map. Keys are sorted lexicographically via
/// `BTreeMap` regardless of the order they were inserted in.
pub fn hash_object<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let sorted: BTreeMap<&str, &Value> = fields.into_iter().collect();
    let canonical: Vec<(String, serde_json::Value)> = sorted
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_json()))
        .collect();
    let as_map: BTreeMap<String, serde_json::Value> = canonical.into_iter().collect();
    let serialized = serde_json::to_string(&as_map).unwrap_or_default();
    hash(&serialized)
}

/// Non-commutative combination of two hashes: `hash(a + ":" + b)`. Order
/// encodes position, which is what lets `accumulate` fold a sequence into a
/// single digest that differs from any reordering of the same inputs.
pub fn combine(a: &str, b: &str) -> String {
    hash(&format!("{a}:{b}"))
}

/// Left-fold `combine` over an ordered sequence of hashes, starting from the
/// empty accumulator. The empty sequence maps to the empty string.
pub fn accumulate<I, S>(hashes: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    hashes.into_iter().fold(String::new(), |acc, h| combine(&acc, h.as_ref()))
}

/// Partition an ordered sequence of hashes into chunks of `bucket_size`,
/// mapping each chunk's index to the `accumulate` of its slice.
pub fn bucket<S: AsRef<str>>(hashes: &[S], bucket_size: usize) -> BTreeMap<usize, String> {
    assert!(bucket_size > 0, "bucket_size must be positive");
    hashes
        .chunks(bucket_size)
        .enumerate()
        .map(|(i, chunk)| (i, accumulate(chunk.iter().map(|s| s.as_ref()))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash("hello"), hash("hello"));
    }

    #[test]
    fn combine_is_not_commutative_in_general() {
        let a = hash("x");
        let b = hash("y");
        assert_ne!(combine(&a, &b), combine(&b, &a));
    }

    #[test]
    fn accumulate_empty_is_empty_string() {
        let empty: Vec<String> = vec![];
        assert_eq!(accumulate(empty), "");
    }

    #[test]
    fn hash_object_is_independent_of_insertion_order() {
        let a: Vec<(&str, Value)> = vec![
            ("name", Value::from("Alice")),
            ("age", Value::from(30.0)),
        ];
        let mut b = a.clone();
        b.reverse();
        let a_refs: Vec<(&str, &Value)> = a.iter().map(|(k, v)| (*k, v)).collect();
        let b_refs: Vec<(&str, &Value)> = b.iter().map(|(k, v)| (*k, v)).collect();
        assert_eq!(hash_object(a_refs), hash_object(b_refs));
    }

    #[test]
    fn bucket_partitions_in_order() {
        let hashes: Vec<String> = (0..150).map(|i| hash(&i.to_string())).collect();
        let buckets = bucket(&hashes, 100);
        assert_eq!(buckets.len(), 2);
        assert!(buckets.contains_key(&0));
        assert!(buckets.contains_key(&1));
        assert_eq!(buckets[&0], accumulate(hashes[0..100].iter()));
        assert_eq!(buckets[&1], accumulate(hashes[100..150].iter()));
    }

    proptest! {
        #[test]
        fn hash_avalanches_minimally_differs(s in "[a-z]{1,20}") {
            let h1 = hash(&s);
            let h2 = hash(&format!("{s}x"));
            prop_assert_ne!(h1, h2);
        }
    }
}
