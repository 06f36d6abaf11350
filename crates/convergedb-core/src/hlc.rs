//! Hybrid Logical Clock: monotonic, causally-ordered version tags.
//!
//! Canonical form is a string of three zero-padded parts so that
//! lexicographic string comparison equals the intended total order:
//! `<physical ISO-8601 UTC ms>-<logical 6-digit counter>-<nonce>`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

const NONCE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const NONCE_LEN: usize = 8;

/// A single HLC timestamp: physical time, logical counter, and a random
/// nonce used purely to make independently-minted timestamps distinguishable
/// (it plays no role in ordering).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hlc {
    physical: u64,
    logical: u32,
    nonce: String,
}

impl Hlc {
    pub fn new(physical: u64, logical: u32, nonce: String) -> Self {
        Self { physical, logical, nonce }
    }

    /// The smallest possible HLC, useful as a sentinel "never written" value.
    pub fn zero() -> Self {
        Self { physical: 0, logical: 0, nonce: "0".repeat(NONCE_LEN) }
    }

    pub fn physical(&self) -> u64 {
        self.physical
    }

    pub fn logical(&self) -> u32 {
        self.logical
    }

    /// Render the canonical string form used for storage and for the
    /// lexicographic comparisons the rest of the system relies on.
    pub fn to_canonical_string(&self) -> String {
        format!("{:020}-{:06}-{}", self.physical, self.logical, self.nonce)
    }

    /// Parse the canonical string form back into an `Hlc`.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.splitn(3, '-');
        let physical: u64 = parts.next()?.parse().ok()?;
        let logical: u32 = parts.next()?.parse().ok()?;
        let nonce = parts.next()?.to_string();
        Some(Self { physical, logical, nonce })
    }
}

impl Default for Hlc {
    fn default() -> Self {
        Hlc::zero()
    }
}

impl std::fmt::Display for Hlc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl PartialOrd for Hlc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Hlc {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_canonical_string().cmp(&other.to_canonical_string())
    }
}

fn random_nonce() -> String {
    let mut rng = rand::thread_rng();
    (0..NONCE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..NONCE_ALPHABET.len());
            NONCE_ALPHABET[idx] as char
        })
        .collect()
}

fn wall_clock_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug)]
struct ClockState {
    last: Hlc,
}

/// A stateful HLC generator. One clock is owned by exactly one collection at
/// a time.
#[derive(Debug)]
pub struct HlcClock {
    state: Mutex<ClockState>,
}

impl HlcClock {
    /// Create a clock seeded from a persisted timestamp (or `Hlc::zero()` on
    /// first run for a collection).
    pub fn from_persisted(last: Hlc) -> Self {
        Self { state: Mutex::new(ClockState { last }) }
    }

    /// Returns the last issued timestamp without advancing the clock.
    pub fn current(&self) -> Hlc {
        self.state.lock().unwrap().last.clone()
    }

    /// Atomically produce the next timestamp. Cannot fail: if the system
    /// clock has not advanced past the last issued physical time (including
    /// the case where it has moved backward), physical time is pinned and
    /// the logical counter advances instead.
    pub fn tick(&self) -> Hlc {
        let mut state = self.state.lock().unwrap();
        let now = wall_clock_millis();
        let next = if now > state.last.physical {
            Hlc::new(now, 0, random_nonce())
        } else {
            Hlc::new(state.last.physical, state.last.logical + 1, random_nonce())
        };
        state.last = next.clone();
        next
    }

    /// Observe a remote timestamp: advance local state to the component-wise
    /// max. Idempotent for equal timestamps. The clock only actually ticks
    /// forward on the *next* `tick()` call.
    pub fn observe(&self, remote: &Hlc) {
        let mut state = self.state.lock().unwrap();
        if remote.physical > state.last.physical
            || (remote.physical == state.last.physical && remote.logical > state.last.logical)
        {
            state.last = remote.clone();
        }
    }
}
