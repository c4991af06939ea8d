//! Tick stream fingerprint
//!
//! SHA-256 over the canonical text of each tick. Two runs with the same
//! candles, config and seed must produce the same digest.

use sha2::{Digest, Sha256};
use types::tick::Tick;

/// Hex digest of a tick sequence.
pub fn fingerprint<'a>(ticks: impl IntoIterator<Item = &'a Tick>) -> String {
    let mut hasher = Sha256::new();
    for tick in ticks {
        hasher.update(tick.candle_index.to_string().as_bytes());
        hasher.update(b"/");
        hasher.update(tick.tick_index.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(tick.price.to_bits().to_be_bytes());
        hasher.update(b":");
        hasher.update(tick.volume.to_string().as_bytes());
        hasher.update(b"@");
        hasher.update(tick.timestamp_offset.to_bits().to_be_bytes());
        hasher.update(b";");
    }
    format!("{:x}", hasher.finalize())
}
