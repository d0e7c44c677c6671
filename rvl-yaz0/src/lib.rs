//! Rvl-Yaz0: LZSS compression codec for Revolution disc assets
//!
//! Yaz0 is the LZSS-family container used on GameCube/Wii discs to shrink
//! resource archives (the on-disc file extension is usually `.szs`). This
//! crate is a **pure codec** - it transforms byte buffers and performs no
//! file I/O; wrapping and unwrapping files is the caller's job.
//!
//! # Container Format
//!
//! ```text
//! 0x00: magic "Yaz0" (4 bytes)
//! 0x04: decompressed size (u32 BE)
//! 0x08: reserved (8 bytes, zero)
//! 0x10: compressed stream
//! ```
//!
//! The decompressed size is stored up front so a decoder can allocate the
//! destination exactly once before touching the stream.
//!
//! # Stream Format
//!
//! The stream is a sequence of chunks. Each chunk is one control byte
//! followed by 8 groups, one per control bit from MSB to LSB:
//!
//! - Bit set: the group is a single literal byte, copied to the output.
//! - Bit clear: the group is a 16-bit BE back-reference token. The low 12
//!   bits encode distance-1, the high 4 bits encode length-2. A high nibble
//!   of 0 means an extra length byte follows, encoding length-18.
//!
//! Back-references copy from the already-decoded output, so runs longer than
//! the distance self-extend (classic LZSS overlap).
//!
//! # Usage
//!
//! ```
//! use rvl_yaz0::{decode, encode, encode_fast};
//!
//! let data = b"pikmin pikmin pikmin pikmin".to_vec();
//! let packed = encode(&data);
//! assert_eq!(decode(&packed).unwrap(), data);
//!
//! // Literal-only fallback: larger output, trivially fast
//! let packed = encode_fast(&data);
//! assert_eq!(decode(&packed).unwrap(), data);
//! ```

mod decode;
mod encode;

pub use decode::{decode, decode_into, expanded_size, is_compressed};
pub use encode::{encode, encode_fast, worst_encoding_size};

// =============================================================================
// Constants
// =============================================================================

/// Container magic, offset 0
pub const YAZ0_MAGIC: [u8; 4] = *b"Yaz0";

/// Size of the container header (magic + size + reserved)
pub const YAZ0_HEADER_SIZE: usize = 16;

/// Longest back-reference run a token can encode (16 + 2 + 0xFF)
pub const YAZ0_MAX_RUN: usize = 0x111;

/// Largest back-reference distance a token can encode
pub const YAZ0_MAX_DISTANCE: usize = 0x1000;

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur during Yaz0 decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Yaz0Error {
    /// Buffer is too small to contain the 16-byte header
    TooSmall,
    /// Magic bytes are not "Yaz0"
    InvalidMagic,
    /// Stream ended mid-group, or a back-reference points before the
    /// start of the output
    Truncated,
    /// Caller-provided destination does not match the header's size field
    BadDestination { expected: u32, actual: usize },
}

impl core::fmt::Display for Yaz0Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Yaz0Error::TooSmall => write!(f, "buffer too small for Yaz0 header"),
            Yaz0Error::InvalidMagic => write!(f, "data is not Yaz0 compressed"),
            Yaz0Error::Truncated => write!(f, "truncated Yaz0 stream"),
            Yaz0Error::BadDestination { expected, actual } => write!(
                f,
                "destination holds {} bytes, header declares {}",
                actual, expected
            ),
        }
    }
}

impl std::error::Error for Yaz0Error {}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pseudo_random(len: usize) -> Vec<u8> {
        // xorshift keeps test data deterministic without pulling in rand
        let mut state = 0x2545F491u32;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state & 0xFF) as u8
            })
            .collect()
    }

    #[test]
    fn test_roundtrip_empty() {
        let empty: Vec<u8> = vec![];
        assert_eq!(decode(&encode_fast(&empty)).unwrap(), empty);
        assert_eq!(decode(&encode(&empty)).unwrap(), empty);
    }

    #[test]
    fn test_roundtrip_single_repeated_byte() {
        for len in [1, 7, 8, 9, 255, 4096, 10_000] {
            let data = vec![0xABu8; len];
            assert_eq!(decode(&encode_fast(&data)).unwrap(), data, "fast, len {}", len);
            assert_eq!(decode(&encode(&data)).unwrap(), data, "greedy, len {}", len);
        }
    }

    #[test]
    fn test_roundtrip_random() {
        let data = pseudo_random(30_000);
        assert_eq!(decode(&encode_fast(&data)).unwrap(), data);
        assert_eq!(decode(&encode(&data)).unwrap(), data);
    }

    #[test]
    fn test_roundtrip_text() {
        let data = b"the quick brown fox jumps over the lazy dog. \
                     the quick brown fox jumps over the lazy dog."
            .to_vec();
        let packed = encode(&data);
        assert!(packed.len() < encode_fast(&data).len());
        assert_eq!(decode(&packed).unwrap(), data);
    }

    #[test]
    fn test_compression_on_repetitive_data() {
        let data = vec![0u8; 0x10000];
        let packed = encode(&data);
        // 64 KiB of zeros should collapse to a few hundred bytes of tokens
        assert!(
            packed.len() < data.len() / 50,
            "greedy encoder produced {} bytes for 64 KiB of zeros",
            packed.len()
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            Yaz0Error::InvalidMagic.to_string(),
            "data is not Yaz0 compressed"
        );
        assert_eq!(Yaz0Error::Truncated.to_string(), "truncated Yaz0 stream");
    }
}
