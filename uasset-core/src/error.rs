use thiserror::Error;

/// Fatal decode failures. The first error aborts the whole decode,
/// there is no partial document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid uasset: package file tag {tag:#010X} matches neither byte order")]
    InvalidMagic { tag: u32 },

    #[error("unsupported legacy file version {legacy_file_version}")]
    UnsupportedVersion { legacy_file_version: i32 },

    #[error("asset unversioned")]
    Unversioned,

    #[error("asset too old: UE4 file version {file_version_ue4}")]
    AssetTooOld { file_version_ue4: i32 },

    #[error("asset compressed: compressed chunks are not supported")]
    CompressedUnsupported,

    #[error("AdditionalPackagesToCook has items")]
    AdditionalPackagesUnsupported,

    #[error("ChunkIDs has items")]
    ChunkIdArrayUnsupported,

    #[error("unsupported metadata block ({context}): value encoding is unknown")]
    UnsupportedMetadataBlock { context: &'static str },

    /// Only raised under [`BoundsPolicy::Strict`](crate::cursor::BoundsPolicy).
    /// The permissive default reads zeros past the end of the buffer instead.
    #[error("read of {wanted} bytes at offset {offset} past end of buffer (len {len})")]
    Truncated {
        offset: usize,
        wanted: usize,
        len: usize,
    },
}
