mod codec;
mod format;
mod reader;
mod writer;

pub use codec::SurfaceCodec;
pub use format::{
    read_varint, write_varint, KeyMaterial, PlatformHeader, KEY_LENGTH, KEY_OFFSET, KEY_XOR,
    MAX_DEPTH, PLATFORM_HEADER_SIZE, PLATFORM_MAGIC,
};
pub use reader::decode_body;
pub use writer::encode_body;

use crate::error::Result;
use crate::model::Entry;
use std::io::{Read, Seek};
use std::path::Path;

/// Binary layer turning archive files into trees and back
///
/// Key material is always [`KEY_LENGTH`] bytes long, whichever variant is
/// in use.
pub trait ArchiveGateway {
    /// Whether `reader` starts with the platform header; the stream position
    /// is left where it was
    fn has_platform_header<R: Read + Seek>(&self, reader: &mut R) -> Result<bool>;

    /// Key material stored in the platform header
    fn read_key_material<R: Read + Seek>(&self, reader: &mut R) -> Result<KeyMaterial>;

    /// Key material of the variant without a platform header
    fn blank_key_material(&self) -> KeyMaterial {
        KeyMaterial::blank()
    }

    /// Parse the archive at `path` into its root entry
    fn decode_tree(&self, path: &Path, platform: bool) -> Result<Entry>;

    /// Write `tree` to `path`; `keys` are only used by the platform variant
    fn encode_tree(
        &self,
        path: &Path,
        platform: bool,
        keys: &KeyMaterial,
        tree: &Entry,
    ) -> Result<()>;
}
