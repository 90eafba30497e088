//! Tagged value model
//!
//! Archive contents are a recursive tree, independent of any byte encoding:
//!
//! ```text
//! Entry::RecordList ─┬─ Entry::FlagTree ── Flag "$file" (FlagTree)
//!                    │                      ├─ Flag "fs"      (Text, optional)
//!                    │                      ├─ Flag "name"    (Text)
//!                    │                      └─ Flag "payload" (Bytes)
//!                    └─ Entry::FlagTree ── ...
//! ```
//!
//! The shape of every node is carried by its enum variant, so a payload can
//! never disagree with its format tag. Trees are built bottom-up and are not
//! mutated afterwards.

/// A node holding either a list of entries or a list of flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    RecordList(Vec<Entry>),
    FlagTree(Vec<Flag>),
}

/// A named value inside a flag tree
///
/// Names are not unique among siblings; lookups return the first match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    pub name: String,
    pub data: FlagData,
}

/// Typed payload of a [`Flag`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagData {
    Text(String),
    Bytes(Vec<u8>),
    FlagTree(Vec<Flag>),
}

/// Format tag of a [`FlagData`] value, used in diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagFormat {
    Text,
    Bytes,
    FlagTree,
}

impl Entry {
    /// Child flags when this entry is a flag tree
    pub fn as_flags(&self) -> Option<&[Flag]> {
        match self {
            Entry::FlagTree(flags) => Some(flags),
            Entry::RecordList(_) => None,
        }
    }

    /// Child entries when this entry is a record list
    pub fn as_records(&self) -> Option<&[Entry]> {
        match self {
            Entry::RecordList(entries) => Some(entries),
            Entry::FlagTree(_) => None,
        }
    }
}

impl Flag {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: FlagData::Text(value.into()),
        }
    }

    pub fn bytes(name: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data: FlagData::Bytes(value),
        }
    }

    pub fn tree(name: impl Into<String>, children: Vec<Flag>) -> Self {
        Self {
            name: name.into(),
            data: FlagData::FlagTree(children),
        }
    }

    pub fn format(&self) -> FlagFormat {
        self.data.format()
    }
}

impl FlagData {
    pub fn format(&self) -> FlagFormat {
        match self {
            FlagData::Text(_) => FlagFormat::Text,
            FlagData::Bytes(_) => FlagFormat::Bytes,
            FlagData::FlagTree(_) => FlagFormat::FlagTree,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FlagData::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FlagData::Bytes(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&[Flag]> {
        match self {
            FlagData::FlagTree(children) => Some(children),
            _ => None,
        }
    }
}

/// First flag among `flags` whose name equals `name`
///
/// The format of the returned flag is not checked; use the typed lookups
/// below when a specific shape is required.
pub fn find_flag<'a>(flags: &'a [Flag], name: &str) -> Option<&'a Flag> {
    flags.iter().find(|flag| flag.name == name)
}

/// Text of the first flag named `name`, or `None` if it is absent or not text
pub fn find_text<'a>(flags: &'a [Flag], name: &str) -> Option<&'a str> {
    find_flag(flags, name).and_then(|flag| flag.data.as_text())
}

/// Bytes of the first flag named `name`, or `None` if it is absent or not bytes
pub fn find_bytes<'a>(flags: &'a [Flag], name: &str) -> Option<&'a [u8]> {
    find_flag(flags, name).and_then(|flag| flag.data.as_bytes())
}

/// Children of the first flag named `name`, or `None` if it is absent or not a tree
pub fn find_tree<'a>(flags: &'a [Flag], name: &str) -> Option<&'a [Flag]> {
    find_flag(flags, name).and_then(|flag| flag.data.as_tree())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Flag> {
        vec![
            Flag::text("name", "first"),
            Flag::bytes("payload", vec![1, 2, 3]),
            Flag::text("name", "second"),
            Flag::tree("$file", vec![Flag::text("fs", "x")]),
        ]
    }

    #[test]
    fn test_find_flag_returns_first_match() {
        let flags = sample();
        let found = find_flag(&flags, "name").unwrap();
        assert_eq!(found.data, FlagData::Text("first".to_string()));
        assert!(find_flag(&flags, "missing").is_none());
    }

    #[test]
    fn test_typed_lookup_rejects_wrong_shape() {
        let flags = sample();
        assert_eq!(find_text(&flags, "name"), Some("first"));
        assert_eq!(find_bytes(&flags, "payload"), Some(&[1u8, 2, 3][..]));

        // Right name, wrong format is reported as absent
        assert!(find_bytes(&flags, "name").is_none());
        assert!(find_text(&flags, "payload").is_none());
        assert!(find_text(&flags, "$file").is_none());
        assert_eq!(find_tree(&flags, "$file").map(|c| c.len()), Some(1));
    }

    #[test]
    fn test_format_tags() {
        assert_eq!(Flag::text("a", "b").format(), FlagFormat::Text);
        assert_eq!(Flag::bytes("a", vec![]).format(), FlagFormat::Bytes);
        assert_eq!(Flag::tree("a", vec![]).format(), FlagFormat::FlagTree);
    }

    #[test]
    fn test_entry_shape_accessors() {
        let tree = Entry::FlagTree(sample());
        let list = Entry::RecordList(vec![tree.clone()]);

        assert!(tree.as_records().is_none());
        assert_eq!(tree.as_flags().map(|f| f.len()), Some(4));
        assert!(list.as_flags().is_none());
        assert_eq!(list.as_records(), Some(&[tree][..]));
    }

    #[test]
    fn test_structural_equality() {
        let a = Entry::FlagTree(vec![Flag::tree("$file", vec![Flag::bytes("payload", vec![9])])]);
        let b = Entry::FlagTree(vec![Flag::tree("$file", vec![Flag::bytes("payload", vec![9])])]);
        let c = Entry::FlagTree(vec![Flag::tree("$file", vec![Flag::bytes("payload", vec![8])])]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
