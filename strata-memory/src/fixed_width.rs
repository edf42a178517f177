//! Bit-packed array of fixed-width elements.
//!
//! Backing store is a flat `Vec<u64>`; overall bit `w * 64 + i` is bit `i`
//! of word `w`, so elements may straddle a word boundary. Blob writers
//! stream the raw words out big-endian, which is why [`FixedWidthArray::word`]
//! is part of the public surface.
//!
//! Element widths are capped at 60 bits so any element spans at most two
//! words. The encoders never get near the cap: their widest field is a
//! key/value pair of two packed ordinals.

/// Scratch bit array sized once per encode and dropped after streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedWidthArray {
    words: Vec<u64>,
}

impl FixedWidthArray {
    /// Allocate a zeroed array large enough for `total_bits` bits.
    pub fn with_bit_capacity(total_bits: u64) -> Self {
        Self {
            words: vec![0u64; (total_bits.div_ceil(64)) as usize],
        }
    }

    /// Rehydrate from raw words (the inverse of streaming `word(0..n)` out).
    pub fn from_words(words: Vec<u64>) -> Self {
        Self { words }
    }

    /// Overwrite the `width`-bit element at `bit_offset` with `value`.
    ///
    /// This is a masked overwrite: previous contents of the element are
    /// discarded, bits outside it are untouched.
    #[inline]
    pub fn set_element(&mut self, bit_offset: u64, width: u32, value: u64) {
        debug_assert!(width <= 60);
        if width == 0 {
            // Zero-width fields occur when every staged value is zero; the
            // element carries no bits and nothing is stored.
            debug_assert_eq!(value, 0);
            return;
        }
        debug_assert!(value <= Self::element_mask(width));
        let mask = Self::element_mask(width);
        let word = (bit_offset >> 6) as usize;
        let bit = (bit_offset & 63) as u32;
        self.words[word] = (self.words[word] & !(mask << bit)) | (value << bit);
        if bit + width > 64 {
            // Straddle: the low `64 - bit` bits landed in `word`, the rest
            // overwrite the bottom of the next word.
            let done = 64 - bit;
            self.words[word + 1] = (self.words[word + 1] & !(mask >> done)) | (value >> done);
        }
    }

    /// Zero the `width`-bit element at `bit_offset`.
    #[inline]
    pub fn clear_element(&mut self, bit_offset: u64, width: u32) {
        self.set_element(bit_offset, width, 0);
    }

    #[inline]
    pub fn get_element(&self, bit_offset: u64, width: u32) -> u64 {
        debug_assert!(width <= 60);
        if width == 0 {
            return 0;
        }
        let word = (bit_offset >> 6) as usize;
        let bit = (bit_offset & 63) as u32;
        let mut value = self.words[word] >> bit;
        if bit + width > 64 {
            value |= self.words[word + 1] << (64 - bit);
        }
        value & Self::element_mask(width)
    }

    /// Raw backing word, or 0 past the end. Blob writers may emit one more
    /// word than a zero-bit array holds (an empty pointer block still frames
    /// as a single zero word), so reads past the end are well-defined.
    #[inline]
    pub fn word(&self, index: usize) -> u64 {
        self.words.get(index).copied().unwrap_or(0)
    }

    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    #[inline(always)]
    fn element_mask(width: u32) -> u64 {
        (1u64 << width) - 1
    }
}
