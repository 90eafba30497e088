//! Directory projection
//!
//! Maps a [`Container`] onto a plain directory tree plus manifest and back.
//!
//! Extraction is all-or-nothing with respect to validation: every file record
//! is checked before the first byte is written. Required fields must be
//! present, each path must stay below the target and be claimed only once,
//! and manifest values must fit on one line. The manifest is removed up front
//! and rewritten last through a temporary file, so it only exists once every
//! payload has been written.

use crate::config::Config;
use crate::container::Container;
use crate::error::{InitFsError, Result};
use crate::file::{collect_records, file_entry, safe_relative_path};
use crate::manifest::{check_line_value, Manifest, ManifestHeader, MANIFEST_V1};
use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct Projector {
    config: Config,
}

impl Projector {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Write every file record of `container` below `dir`, then the manifest
    pub fn extract(&self, container: &Container, dir: &Path) -> Result<()> {
        let records = collect_records(container.entries(), self.config.strict)?;
        let manifest_rel = PathBuf::from(&self.config.manifest_name);
        check_line_value("container name", container.name())?;

        let mut manifest = Manifest::new(ManifestHeader {
            name: container.name().to_string(),
            platform: container.is_platform(),
            keys: container.keys().clone(),
        });
        let mut seen = HashSet::with_capacity(records.len());
        let mut targets = Vec::with_capacity(records.len());
        for record in &records {
            let relative = safe_relative_path(record.name)?;
            if relative
                .as_os_str()
                .eq_ignore_ascii_case(manifest_rel.as_os_str())
            {
                return Err(InitFsError::UnsafePath(format!(
                    "{} collides with the manifest",
                    record.name
                )));
            }
            if !seen.insert(relative.clone()) {
                return Err(InitFsError::UnsafePath(format!(
                    "{} resolves to a path already written by another record",
                    record.name
                )));
            }
            if let Some(fs) = record.fs {
                check_line_value("fs", fs)?;
            }
            manifest.push(record.name, record.fs);
            targets.push((relative, record.payload));
        }

        fs::create_dir_all(dir)?;
        let manifest_path = dir.join(&manifest_rel);
        match fs::remove_file(&manifest_path) {
            Ok(()) => debug!(path = %manifest_path.display(), "removed previous manifest"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        for (relative, payload) in &targets {
            let path = dir.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, payload)?;
            debug!(path = %relative.display(), size = payload.len(), "wrote file");
        }

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(manifest.encode(&MANIFEST_V1).as_bytes())?;
        tmp.flush()?;
        tmp.persist(&manifest_path)?;

        info!(
            name = container.name(),
            files = targets.len(),
            dir = %dir.display(),
            "extracted container"
        );
        Ok(())
    }

    /// Rebuild a container from a directory written by [`Projector::extract`]
    ///
    /// Entries follow manifest order exactly.
    pub fn read_directory(&self, dir: &Path) -> Result<Container> {
        let manifest_path = dir.join(&self.config.manifest_name);
        if !manifest_path.is_file() {
            return Err(InitFsError::NotAnArchiveDirectory(dir.to_path_buf()));
        }

        let text = fs::read_to_string(&manifest_path)?;
        let manifest = Manifest::decode(&text, &MANIFEST_V1)?;

        let mut entries = Vec::with_capacity(manifest.records.len());
        for record in manifest.records {
            let relative = safe_relative_path(&record.path)?;
            let payload = fs::read(dir.join(&relative))?;
            debug!(path = %relative.display(), size = payload.len(), "read file");
            entries.push(file_entry(record.path, record.fs, payload));
        }

        let header = manifest.header;
        info!(
            name = %header.name,
            platform = header.platform,
            files = entries.len(),
            "loaded unpacked directory"
        );
        Ok(Container::new(header.name, header.platform, header.keys, entries))
    }
}
