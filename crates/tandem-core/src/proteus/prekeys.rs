//! Prekey id allocation.
//!
//! The engine produces all prekey material. This layer only decides which
//! ids to request, and must never hand out the id reserved for the
//! last-resort prekey.

use std::ops::Range;

/// A generated prekey, ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prekey {
    /// Prekey id
    pub id: u16,
    /// Prekey bundle, standard base64
    pub data: String,
}

/// Ids to generate for a request of `count` prekeys starting at `start`.
///
/// Wraps to `0..count` when `start + count` would exceed `last_prekey_id`,
/// otherwise `start..start + count`. The sum is computed in `u32` so a
/// request near the top of the id space cannot overflow.
pub fn prekey_range(start: u16, count: u16, last_prekey_id: u16) -> Range<u16> {
    if u32::from(start) + u32::from(count) > u32::from(last_prekey_id) {
        return 0..count;
    }
    start..start + count
}
