//! Client identifiers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a client (TS6-style UID string).
///
/// Channel rosters key members by UID rather than nick, so a nick change
/// never touches channel state.
pub type Uid = String;

/// Allocates UIDs for clients registered on this server.
///
/// Format: SID (3 chars) + client counter (6 chars base36) = 9 chars total,
/// e.g. "001AAAAAA". Remote clients keep the UID their own server assigned.
pub struct UidGenerator {
    sid: String,
    counter: AtomicU64,
}

impl UidGenerator {
    /// Create a generator for the given server ID.
    pub fn new(sid: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Allocate the next UID.
    pub fn next(&self) -> Uid {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.sid, base36_encode_6(n))
    }
}

fn base36_encode_6(mut n: u64) -> String {
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut result = [b'A'; 6];

    for slot in result.iter_mut().rev() {
        *slot = CHARS[(n % 36) as usize];
        n /= 36;
    }

    String::from_utf8_lossy(&result).into_owned()
}
