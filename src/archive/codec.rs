use crate::archive::format::{KeyMaterial, PlatformHeader, PLATFORM_HEADER_SIZE, PLATFORM_MAGIC};
use crate::archive::reader::decode_body;
use crate::archive::writer::encode_body;
use crate::archive::ArchiveGateway;
use crate::error::{InitFsError, Result};
use crate::model::Entry;
use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::debug;

/// Default archive codec
///
/// The platform variant is a [`PlatformHeader`] followed by a body
/// obfuscated with the header's key material. The other variant is the
/// plain body alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceCodec;

impl SurfaceCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveGateway for SurfaceCodec {
    fn has_platform_header<R: Read + Seek>(&self, reader: &mut R) -> Result<bool> {
        let start = reader.stream_position()?;

        let mut magic = Vec::with_capacity(PLATFORM_MAGIC.len());
        reader
            .by_ref()
            .take(PLATFORM_MAGIC.len() as u64)
            .read_to_end(&mut magic)?;

        reader.seek(SeekFrom::Start(start))?;
        Ok(magic == PLATFORM_MAGIC)
    }

    fn read_key_material<R: Read + Seek>(&self, reader: &mut R) -> Result<KeyMaterial> {
        reader.seek(SeekFrom::Start(0))?;
        Ok(PlatformHeader::read_from(reader)?.keys)
    }

    fn decode_tree(&self, path: &Path, platform: bool) -> Result<Entry> {
        let data = std::fs::read(path)?;

        if !platform {
            return decode_body(&data);
        }

        if data.len() < PLATFORM_HEADER_SIZE {
            return Err(InitFsError::InvalidFormat(format!(
                "{} bytes is too short for a platform header",
                data.len()
            )));
        }
        let header = PlatformHeader::read_from(&data[..PLATFORM_HEADER_SIZE])?;
        let mut body = data[PLATFORM_HEADER_SIZE..].to_vec();
        header.keys.apply(&mut body);

        debug!(body_len = body.len(), "decoded platform body");
        decode_body(&body)
    }

    fn encode_tree(
        &self,
        path: &Path,
        platform: bool,
        keys: &KeyMaterial,
        tree: &Entry,
    ) -> Result<()> {
        let mut body = encode_body(tree)?;

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        if platform {
            PlatformHeader::new(keys.clone()).write_to(&mut writer)?;
            keys.apply(&mut body);
        }
        writer.write_all(&body)?;
        writer.flush()?;

        debug!(path = %path.display(), body_len = body.len(), platform, "encoded archive");
        Ok(())
    }
}
