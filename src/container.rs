use crate::archive::{ArchiveGateway, KeyMaterial, SurfaceCodec};
use crate::error::{InitFsError, Result};
use crate::file::{collect_records, FileRecord, FileSummary};
use crate::model::Entry;
use crate::project::Projector;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// One InitFS archive: identity, key material and file entries
///
/// Each load builds a fresh, independent container. When the platform flag
/// is false the key material is always the blank value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    name: String,
    platform: bool,
    keys: KeyMaterial,
    entries: Vec<Entry>,
}

impl Container {
    /// Assemble a container; keys are replaced by the blank value unless
    /// `platform` is set
    pub fn new(name: String, platform: bool, keys: KeyMaterial, entries: Vec<Entry>) -> Self {
        let keys = if platform {
            keys
        } else {
            if !keys.is_blank() {
                debug!("discarding key material for non-platform container");
            }
            KeyMaterial::blank()
        };

        Self {
            name,
            platform,
            keys,
            entries,
        }
    }

    /// Load from an archive file or an unpacked directory
    pub fn load<P: AsRef<Path>>(source: P) -> Result<Self> {
        Self::load_with(&SurfaceCodec, &Projector::default(), source)
    }

    /// Load with an explicit gateway and projector
    pub fn load_with<G, P>(gateway: &G, projector: &Projector, source: P) -> Result<Self>
    where
        G: ArchiveGateway,
        P: AsRef<Path>,
    {
        let source = source.as_ref();
        if source.is_file() {
            Self::from_archive_with(gateway, source)
        } else if source.is_dir() {
            projector.read_directory(source)
        } else {
            Err(InitFsError::InvalidSource(source.to_path_buf()))
        }
    }

    pub fn from_archive<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_archive_with(&SurfaceCodec, path)
    }

    /// Decode an archive file; the container is named after the file
    pub fn from_archive_with<G: ArchiveGateway, P: AsRef<Path>>(
        gateway: &G,
        path: P,
    ) -> Result<Self> {
        let path = path.as_ref();

        let mut file = File::open(path)?;
        let platform = gateway.has_platform_header(&mut file)?;
        let keys = if platform {
            gateway.read_key_material(&mut file)?
        } else {
            gateway.blank_key_material()
        };
        drop(file);

        let entries = match gateway.decode_tree(path, platform)? {
            Entry::RecordList(entries) => entries,
            Entry::FlagTree(_) => {
                return Err(InitFsError::InvalidFormat(
                    "root entry is not a record list".to_string(),
                ))
            }
        };

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        info!(
            name = %name,
            platform,
            entries = entries.len(),
            "loaded archive"
        );
        Ok(Self::new(name, platform, keys, entries))
    }

    pub fn from_directory<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Projector::default().read_directory(dir.as_ref())
    }

    /// Encode into an archive file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_with(&SurfaceCodec, path)
    }

    pub fn save_with<G: ArchiveGateway, P: AsRef<Path>>(&self, gateway: &G, path: P) -> Result<()> {
        let path = path.as_ref();
        gateway.encode_tree(path, self.platform, &self.keys, &self.root())?;

        info!(
            name = %self.name,
            platform = self.platform,
            entries = self.entries.len(),
            path = %path.display(),
            "saved archive"
        );
        Ok(())
    }

    /// Project into `dir` as files plus manifest
    pub fn extract<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        Projector::default().extract(self, dir.as_ref())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_platform(&self) -> bool {
        self.platform
    }

    pub fn keys(&self) -> &KeyMaterial {
        &self.keys
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The record list written to an archive
    pub fn root(&self) -> Entry {
        Entry::RecordList(self.entries.clone())
    }

    /// File records in archive order, skipping entries without one
    pub fn records(&self) -> Result<Vec<FileRecord<'_>>> {
        collect_records(&self.entries, false)
    }

    pub fn summaries(&self) -> Result<Vec<FileSummary>> {
        Ok(self.records()?.iter().map(FileRecord::summary).collect())
    }

    /// File listing as pretty-printed JSON
    pub fn listing_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.summaries()?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::KEY_LENGTH;
    use crate::file::file_entry;
    use tempfile::TempDir;

    #[test]
    fn test_non_platform_keys_are_blank() {
        let keys = KeyMaterial::from_slice(&[1u8; KEY_LENGTH]).unwrap();
        let c = Container::new("x".into(), false, keys.clone(), vec![]);
        assert_eq!(c.keys(), &KeyMaterial::blank());

        let c = Container::new("x".into(), true, keys.clone(), vec![]);
        assert_eq!(c.keys(), &keys);
    }

    #[test]
    fn test_load_invalid_source() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(matches!(
            Container::load(&missing),
            Err(InitFsError::InvalidSource(_))
        ));
    }

    #[test]
    fn test_archive_named_after_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("initfs_Linux");
        let c = Container::new(
            "anything".into(),
            false,
            KeyMaterial::blank(),
            vec![file_entry("a.txt".into(), None, b"a".to_vec())],
        );
        c.save(&path).unwrap();

        let loaded = Container::load(&path).unwrap();
        assert_eq!(loaded.name(), "initfs_Linux");
        assert!(!loaded.is_platform());
        assert_eq!(loaded.entries(), c.entries());
    }

    #[test]
    fn test_rejects_flag_tree_root() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad");
        SurfaceCodec
            .encode_tree(&path, false, &KeyMaterial::blank(), &Entry::FlagTree(vec![]))
            .unwrap();

        assert!(matches!(
            Container::from_archive(&path),
            Err(InitFsError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_summaries_skip_non_file_entries() {
        let c = Container::new(
            "x".into(),
            false,
            KeyMaterial::blank(),
            vec![
                Entry::RecordList(vec![]),
                file_entry("a.txt".into(), Some("fs".into()), b"abc".to_vec()),
            ],
        );
        let summaries = c.summaries().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].path, "a.txt");
        assert_eq!(summaries[0].fs.as_deref(), Some("fs"));
        assert_eq!(summaries[0].size, 3);

        let json: serde_json::Value = serde_json::from_str(&c.listing_json().unwrap()).unwrap();
        assert_eq!(json[0]["path"], "a.txt");
        assert_eq!(json[0]["size"], 3);
    }
}
