//! File records carried by an InitFS container
//!
//! Each top-level entry that represents a file is a flag tree holding one
//! `$file` flag, whose children are `fs` (optional text), `name` (text, a
//! relative path) and `payload` (bytes).

use crate::error::{InitFsError, Result};
use crate::model::{find_bytes, find_text, Entry, Flag};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Component, PathBuf};
use tracing::debug;

pub const FILE_FLAG: &str = "$file";
pub const FS_FLAG: &str = "fs";
pub const NAME_FLAG: &str = "name";
pub const PAYLOAD_FLAG: &str = "payload";

/// Borrowed view of one `$file` record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRecord<'a> {
    pub name: &'a str,
    /// `None` when the flag is absent or empty
    pub fs: Option<&'a str>,
    pub payload: &'a [u8],
}

/// Listing row for a file record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fs: Option<String>,
    pub size: u64,
    pub sha256: String,
}

impl<'a> FileRecord<'a> {
    /// Read a record from the children of a `$file` flag
    ///
    /// An absent or empty `name`, or an absent `payload`, is an error. A flag
    /// with the right name but the wrong format counts as absent.
    pub fn from_flags(flags: &'a [Flag]) -> Result<Self> {
        let fs = find_text(flags, FS_FLAG).filter(|fs| !fs.is_empty());
        let name = find_text(flags, NAME_FLAG)
            .filter(|name| !name.is_empty())
            .ok_or(InitFsError::MissingField(NAME_FLAG))?;
        let payload = find_bytes(flags, PAYLOAD_FLAG).ok_or(InitFsError::MissingField(PAYLOAD_FLAG))?;

        Ok(Self { name, fs, payload })
    }

    /// Build the owned entry for this record
    pub fn to_entry(&self) -> Entry {
        file_entry(
            self.name.to_string(),
            self.fs.map(str::to_string),
            self.payload.to_vec(),
        )
    }

    pub fn summary(&self) -> FileSummary {
        FileSummary {
            path: self.name.to_string(),
            fs: self.fs.map(str::to_string),
            size: self.payload.len() as u64,
            sha256: hex::encode(Sha256::digest(self.payload)),
        }
    }
}

/// Synthesize a file entry: `FlagTree[$file FlagTree[fs?, name, payload]]`
///
/// An empty `fs` is dropped, so `Some("")` and `None` build the same entry.
pub fn file_entry(name: String, fs: Option<String>, payload: Vec<u8>) -> Entry {
    let mut children = Vec::with_capacity(3);
    if let Some(fs) = fs.filter(|fs| !fs.is_empty()) {
        children.push(Flag::text(FS_FLAG, fs));
    }
    children.push(Flag::text(NAME_FLAG, name));
    children.push(Flag::bytes(PAYLOAD_FLAG, payload));

    Entry::FlagTree(vec![Flag::tree(FILE_FLAG, children)])
}

/// Collect every file record from a top-level entry list, in order
///
/// Entries that are not flag trees, and flag trees without a `$file` flag
/// tree, are skipped unless `strict` is set, in which case they fail with
/// [`InitFsError::UnexpectedEntry`]. Every `$file` flag of an entry is
/// returned, so one entry may contribute several records.
pub fn collect_records(entries: &[Entry], strict: bool) -> Result<Vec<FileRecord<'_>>> {
    let mut records = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let before = records.len();

        if let Entry::FlagTree(flags) = entry {
            for flag in flags.iter().filter(|flag| flag.name == FILE_FLAG) {
                if let Some(children) = flag.data.as_tree() {
                    records.push(FileRecord::from_flags(children)?);
                }
            }
        }

        if records.len() == before {
            if strict {
                return Err(InitFsError::UnexpectedEntry(index));
            }
            debug!(index, "skipping entry without a file record");
        }
    }

    Ok(records)
}

/// Map an archive file name to a relative path below the extraction root
///
/// Both `/` and `\` separate segments. Absolute names, drive prefixes,
/// `..` segments and line breaks are rejected.
pub fn safe_relative_path(name: &str) -> Result<PathBuf> {
    let unsafe_path = || InitFsError::UnsafePath(name.to_string());

    if name.contains(['\n', '\r']) || name.starts_with(['/', '\\']) {
        return Err(unsafe_path());
    }

    let mut path = PathBuf::new();
    for (i, segment) in name.split(['/', '\\']).enumerate() {
        match segment {
            "" | "." => continue,
            ".." => return Err(unsafe_path()),
            _ if i == 0 && segment.ends_with(':') => return Err(unsafe_path()),
            _ => path.push(segment),
        }
    }

    if path.as_os_str().is_empty()
        || !path.components().all(|c| matches!(c, Component::Normal(_)))
    {
        return Err(unsafe_path());
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FlagData;

    #[test]
    fn test_record_from_flags() {
        let flags = vec![
            Flag::text("fs", "compressed"),
            Flag::text("name", "data.bin"),
            Flag::bytes("payload", vec![7, 7]),
        ];
        let record = FileRecord::from_flags(&flags).unwrap();
        assert_eq!(record.name, "data.bin");
        assert_eq!(record.fs, Some("compressed"));
        assert_eq!(record.payload, &[7, 7]);
    }

    #[test]
    fn test_missing_name_and_payload() {
        let no_name = vec![Flag::bytes("payload", vec![])];
        assert!(matches!(
            FileRecord::from_flags(&no_name),
            Err(InitFsError::MissingField("name"))
        ));

        let empty_name = vec![Flag::text("name", ""), Flag::bytes("payload", vec![])];
        assert!(matches!(
            FileRecord::from_flags(&empty_name),
            Err(InitFsError::MissingField("name"))
        ));

        let no_payload = vec![Flag::text("name", "a.txt")];
        assert!(matches!(
            FileRecord::from_flags(&no_payload),
            Err(InitFsError::MissingField("payload"))
        ));

        // payload present but stored as text
        let wrong_shape = vec![Flag::text("name", "a.txt"), Flag::text("payload", "oops")];
        assert!(matches!(
            FileRecord::from_flags(&wrong_shape),
            Err(InitFsError::MissingField("payload"))
        ));
    }

    #[test]
    fn test_empty_fs_is_dropped() {
        let with_empty = file_entry("a".into(), Some(String::new()), vec![1]);
        let without = file_entry("a".into(), None, vec![1]);
        assert_eq!(with_empty, without);

        let flags = with_empty.as_flags().unwrap();
        let children = flags[0].data.as_tree().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].data, FlagData::Text("a".into()));
    }

    #[test]
    fn test_to_entry_roundtrip() {
        let entry = file_entry("x/y.dds".into(), Some("fs0".into()), vec![1, 2]);
        let records = collect_records(std::slice::from_ref(&entry), true).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].to_entry(), entry);
    }

    #[test]
    fn test_collect_records_tolerance() {
        let entries = vec![
            Entry::RecordList(vec![]),
            file_entry("a".into(), None, vec![]),
            Entry::FlagTree(vec![Flag::text("other", "value")]),
            Entry::FlagTree(vec![Flag::text("$file", "not a tree")]),
            file_entry("b".into(), None, vec![]),
        ];

        let records = collect_records(&entries, false).unwrap();
        let names: Vec<_> = records.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["a", "b"]);

        assert!(matches!(
            collect_records(&entries, true),
            Err(InitFsError::UnexpectedEntry(0))
        ));
    }

    #[test]
    fn test_multiple_file_flags_in_one_entry() {
        let record = |name: &str| {
            Flag::tree(
                "$file",
                vec![Flag::text("name", name), Flag::bytes("payload", vec![])],
            )
        };
        let entries = vec![Entry::FlagTree(vec![record("one"), record("two")])];
        let records = collect_records(&entries, true).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name, "two");
    }

    #[test]
    fn test_summary_digest() {
        let flags = vec![Flag::text("name", "empty.bin"), Flag::bytes("payload", vec![])];
        let summary = FileRecord::from_flags(&flags).unwrap().summary();
        assert_eq!(summary.size, 0);
        assert_eq!(
            summary.sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert!(summary.fs.is_none());
    }

    #[test]
    fn test_safe_relative_path() {
        assert_eq!(
            safe_relative_path("textures/a.dds").unwrap(),
            PathBuf::from("textures").join("a.dds")
        );
        assert_eq!(
            safe_relative_path("scripts\\init.lua").unwrap(),
            PathBuf::from("scripts").join("init.lua")
        );
        assert_eq!(safe_relative_path("./a//b").unwrap(), PathBuf::from("a").join("b"));

        for bad in ["", "/etc/passwd", "\\evil", "../up", "a/../../b", "C:/x", "a\nb", "."] {
            assert!(
                matches!(safe_relative_path(bad), Err(InitFsError::UnsafePath(_))),
                "accepted {bad:?}"
            );
        }
    }
}
