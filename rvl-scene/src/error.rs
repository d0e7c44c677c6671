//! Scene archive error taxonomy
//!
//! Every failure carries the byte offset where it was detected when one
//! exists; front-ends are expected to surface the message verbatim so a
//! bad archive can be chased down in a hex dump.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    /// Bad magic or an impossible header
    #[error("corrupt archive at offset {offset:#x}: {reason}")]
    CorruptArchive { offset: usize, reason: String },

    /// A declared span exceeds the buffer
    #[error(
        "archive truncated at offset {offset:#x}: needed {needed} bytes, {available} available"
    )]
    TruncatedArchive {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A typed read ran off the end of the buffer
    #[error("unexpected end of data at offset {offset:#x}")]
    UnexpectedEof { offset: usize },

    /// Dictionary descent exceeded the node count - the prev/next links
    /// of an externally supplied directory form a cycle
    #[error("corrupt dictionary: descent did not terminate after {steps} steps")]
    CorruptDictionary { steps: usize },

    /// The in-memory scene uses a construct the binary format cannot express
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// A count or offset would overflow its serialized field width
    #[error("section '{section}' too large: {count} entries (max {max})")]
    SectionTooLarge {
        section: &'static str,
        count: usize,
        max: usize,
    },

    /// Cross-section link failure (e.g. a material naming an absent texture)
    #[error("{from} references missing {to}")]
    MissingReference { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, SceneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            SceneError::UnexpectedEof { offset: 0x40 }.to_string(),
            "unexpected end of data at offset 0x40"
        );
        assert_eq!(
            SceneError::MissingReference {
                from: "material 'mat_0'".into(),
                to: "texture 'grass'".into()
            }
            .to_string(),
            "material 'mat_0' references missing texture 'grass'"
        );
        assert_eq!(
            SceneError::SectionTooLarge {
                section: "vertex_data",
                count: 70000,
                max: 65535
            }
            .to_string(),
            "section 'vertex_data' too large: 70000 entries (max 65535)"
        );
    }
}
