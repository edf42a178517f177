//! Serialization of populated-ordinal sets.
//!
//! The in-memory representation is a [`roaring::RoaringBitmap`]; the wire
//! form appended to snapshot blobs is the framework's packed layout: a
//! var-long word count followed by that many big-endian 64-bit words, where
//! bit `i` of word `w` marks ordinal `w * 64 + i` populated.

use crate::varint::write_vlong;
use roaring::RoaringBitmap;
use std::io::{self, Write};

/// Append the packed form of `bits` to `w`.
///
/// The word count is the minimum covering the highest set bit; an empty set
/// serializes as a bare zero count.
pub fn serialize_bits_to<W: Write + ?Sized>(bits: &RoaringBitmap, w: &mut W) -> io::Result<()> {
    let num_words = match bits.max() {
        Some(max) => max as u64 / 64 + 1,
        None => 0,
    };
    write_vlong(w, num_words)?;
    let mut words = vec![0u64; num_words as usize];
    for ordinal in bits {
        words[(ordinal / 64) as usize] |= 1u64 << (ordinal % 64);
    }
    for word in &words {
        w.write_all(&word.to_be_bytes())?;
    }
    Ok(())
}
