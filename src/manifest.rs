//! Repack manifest
//!
//! An unpacked directory carries a small text file (`META.TXT`) that records
//! everything needed to rebuild the container: its name, the platform
//! variant, the key material and the ordered file listing.
//!
//! # Layout
//!
//! ```text
//! <heading line 1>
//! <heading line 2>
//!
//! <container name>
//! True|False
//! <base64 key material>
//!
//! <relative path 1>
//! [<fs value 1>]
//!
//! <relative path 2>
//! ...
//! ```
//!
//! Heading lines are boilerplate and only need to be present. Each file
//! record is a path line, an optional `fs` line, and a blank separator
//! before the next record. There is no trailing newline.

use crate::archive::KeyMaterial;
use crate::error::{InitFsError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// Fixed parts of a manifest layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestFormat {
    /// Boilerplate lines written above the container header
    pub heading: [&'static str; 2],
    /// Default file name inside an unpacked directory
    pub file_name: &'static str,
}

impl ManifestFormat {
    /// Lines preceding the container header: the heading plus one blank line
    pub const fn preamble_lines(&self) -> usize {
        self.heading.len() + 1
    }
}

/// Manifest layout version 1
pub const MANIFEST_V1: ManifestFormat = ManifestFormat {
    heading: [
        "# Unpacked InitFS archive, read back when repacking.",
        "# DO NOT DELETE IF YOU WANT TO REPACK",
    ],
    file_name: "META.TXT",
};

/// Container identity recorded in the manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestHeader {
    pub name: String,
    pub platform: bool,
    pub keys: KeyMaterial,
}

/// One file listing: relative path plus optional `fs` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRecord {
    pub path: String,
    pub fs: Option<String>,
}

/// Parsed manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub header: ManifestHeader,
    pub records: Vec<ManifestRecord>,
}

impl Manifest {
    pub fn new(header: ManifestHeader) -> Self {
        Self {
            header,
            records: Vec::new(),
        }
    }

    /// Append a file listing; an empty `fs` is stored as `None`
    pub fn push(&mut self, path: impl Into<String>, fs: Option<&str>) {
        self.records.push(ManifestRecord {
            path: path.into(),
            fs: fs.filter(|fs| !fs.is_empty()).map(str::to_string),
        });
    }

    /// Render the manifest text using `format`
    pub fn encode(&self, format: &ManifestFormat) -> String {
        let mut out = String::new();
        for line in format.heading {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');

        out.push_str(&self.header.name);
        out.push('\n');
        out.push_str(if self.header.platform { "True" } else { "False" });
        out.push('\n');
        out.push_str(&BASE64.encode(self.header.keys.as_bytes()));

        for record in &self.records {
            out.push_str("\n\n");
            out.push_str(&record.path);
            if let Some(fs) = record.fs.as_deref().filter(|fs| !fs.is_empty()) {
                out.push('\n');
                out.push_str(fs);
            }
        }

        out
    }

    /// Parse manifest text laid out per `format`
    ///
    /// When the platform flag is `False` the key line is not decoded and the
    /// blank key is used.
    pub fn decode(text: &str, format: &ManifestFormat) -> Result<Self> {
        let mut cursor = LineCursor::new(text);

        cursor.skip_fixed(format.preamble_lines(), "manifest heading")?;

        let name = cursor.read_required("container name")?.to_string();
        let platform_line = cursor.read_required("platform flag")?;
        let platform = parse_bool(platform_line).ok_or_else(|| {
            InitFsError::MalformedManifest(format!(
                "line {}: expected True or False, found {:?}",
                cursor.line_number() - 1,
                platform_line
            ))
        })?;
        let key_line = cursor.read_required("key material")?;
        let keys = if platform {
            decode_keys(key_line, cursor.line_number() - 1)?
        } else {
            KeyMaterial::blank()
        };
        cursor.skip_blank()?;

        let mut records = Vec::new();
        while !cursor.is_exhausted() {
            let path = cursor.read_non_blank("file path")?.to_string();
            let fs = cursor.read_optional().map(str::to_string);
            records.push(ManifestRecord { path, fs });
            cursor.skip_blank()?;
        }

        Ok(Self {
            header: ManifestHeader {
                name,
                platform,
                keys,
            },
            records,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn decode_keys(line: &str, line_number: usize) -> Result<KeyMaterial> {
    let bytes = BASE64.decode(line.trim()).map_err(|e| {
        InitFsError::MalformedManifest(format!("line {line_number}: invalid base64 key material: {e}"))
    })?;
    KeyMaterial::from_slice(&bytes).map_err(|e| {
        InitFsError::MalformedManifest(format!("line {line_number}: {e}"))
    })
}

/// Check that `value` survives a write and read as a single manifest line
///
/// Any `\n` or `\r` would either split the line or be stripped on decode.
pub fn check_line_value(field: &'static str, value: &str) -> Result<()> {
    if value.contains(['\n', '\r']) {
        return Err(InitFsError::UnencodableValue {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Positional reader over manifest lines
///
/// Line endings are `\n` or `\r\n`. A blank line is an empty line.
#[derive(Debug, Clone)]
pub struct LineCursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> LineCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
            pos: 0,
        }
    }

    /// 1-based number of the next line to be read
    pub fn line_number(&self) -> usize {
        self.pos + 1
    }

    /// Skip `count` lines without inspecting them; all must be present
    pub fn skip_fixed(&mut self, count: usize, what: &str) -> Result<()> {
        if self.lines.len() - self.pos < count {
            return Err(InitFsError::MalformedManifest(format!(
                "{what} needs {count} lines, found {}",
                self.lines.len() - self.pos
            )));
        }
        self.pos += count;
        Ok(())
    }

    /// Read the next line, which must exist but may be blank
    pub fn read_required(&mut self, what: &str) -> Result<&'a str> {
        let line = self.lines.get(self.pos).copied().ok_or_else(|| {
            InitFsError::MalformedManifest(format!(
                "line {}: missing {what}",
                self.line_number()
            ))
        })?;
        self.pos += 1;
        Ok(line)
    }

    /// Read the next line, which must exist and be non-blank
    pub fn read_non_blank(&mut self, what: &str) -> Result<&'a str> {
        let line_number = self.line_number();
        let line = self.read_required(what)?;
        if line.is_empty() {
            return Err(InitFsError::MalformedManifest(format!(
                "line {line_number}: expected {what}, found a blank line"
            )));
        }
        Ok(line)
    }

    /// Consume the next line only if it exists and is non-blank
    pub fn read_optional(&mut self) -> Option<&'a str> {
        let line = self.lines.get(self.pos).copied().filter(|line| !line.is_empty())?;
        self.pos += 1;
        Some(line)
    }

    /// Consume a blank separator; the end of input also counts as one
    pub fn skip_blank(&mut self) -> Result<()> {
        match self.lines.get(self.pos) {
            None => Ok(()),
            Some(line) if line.is_empty() => {
                self.pos += 1;
                Ok(())
            }
            Some(line) => Err(InitFsError::MalformedManifest(format!(
                "line {}: expected a blank separator, found {:?}",
                self.line_number(),
                line
            ))),
        }
    }

    /// True when no non-blank line remains
    pub fn is_exhausted(&self) -> bool {
        self.lines[self.pos..].iter().all(|line| line.is_empty())
    }
}
