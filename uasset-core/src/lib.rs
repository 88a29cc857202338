//! Read-only decoder for Unreal Engine `.uasset` package files.
//!
//! Decodes the on-disk container into a fully-typed [`PackageDocument`]
//! (summary, name table, imports, exports, depends, soft references,
//! thumbnails, asset registry tags) and, in audit mode, records a byte-exact
//! trail of every primitive read for hex-inspector tooling.
//!
//! The decoder stops at structural metadata: per-object property payloads,
//! compression and encryption are out of scope.
//!
//! ```no_run
//! use uasset_core::{decode_package, DecodeOptions};
//!
//! let bytes = std::fs::read("Example.uasset")?;
//! let doc = decode_package(bytes, &DecodeOptions::default())?;
//! println!("{} exports, saved by {}", doc.exports.len(), doc.summary.saved_by_engine_version);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audit;
pub mod cursor;
pub mod decoder;
pub mod document;
pub mod error;
mod sections;
pub mod version;

pub use audit::AuditEntry;
pub use cursor::BoundsPolicy;
pub use decoder::{decode_package, DecodeOptions};
pub use document::{PackageDocument, PackageSummary};
pub use error::DecodeError;
