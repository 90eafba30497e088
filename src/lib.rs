//! initfs-rs: unpack and repack InitFS containers
//!
//! An InitFS container is a tagged binary tree holding a list of file
//! records. This library provides:
//! - A typed tree model (`Entry`/`Flag`) independent of the byte encoding
//! - Extraction into a plain directory plus a `META.TXT` repack manifest
//! - Rebuilding a container from such a directory, in manifest order
//! - A pluggable archive codec with support for the keyed platform variant
//!
//! # Example
//!
//! ```no_run
//! use initfs_rs::Container;
//!
//! // Unpack an archive
//! let container = Container::load("initfs_Win32")?;
//! container.extract("initfs_Win32.d")?;
//!
//! // ...edit files in place, then repack
//! let edited = Container::load("initfs_Win32.d")?;
//! edited.save("initfs_Win32")?;
//! # Ok::<(), initfs_rs::error::InitFsError>(())
//! ```

// Core modules
pub mod archive;
pub mod config;
pub mod container;
pub mod error;
pub mod file;
pub mod manifest;
pub mod model;
pub mod project;

// Re-export commonly used types
pub use archive::{ArchiveGateway, KeyMaterial, SurfaceCodec, KEY_LENGTH};
pub use config::Config;
pub use container::Container;
pub use error::{InitFsError, Result};
pub use file::{file_entry, FileRecord, FileSummary};
pub use manifest::{Manifest, ManifestFormat, MANIFEST_V1};
pub use model::{find_flag, Entry, Flag, FlagData, FlagFormat};
pub use project::Projector;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Ensure core types are accessible
        let _keys = KeyMaterial::blank();
        let _entry = file_entry("a.txt".to_string(), None, Vec::new());
        assert_eq!(MANIFEST_V1.file_name, Config::default().manifest_name);
    }
}
