use crate::archive::format::{
    read_varint, FLAG_ANONYMOUS, MAX_DEPTH, TYPE_BLOB, TYPE_END, TYPE_LIST, TYPE_MASK,
    TYPE_OBJECT, TYPE_STRING,
};
use crate::error::{InitFsError, Result};
use crate::model::{Entry, Flag, FlagData};
use tracing::debug;

/// Decode a plain (already de-obfuscated) archive body into its root entry
///
/// Bytes following the root entry are ignored.
pub fn decode_body(data: &[u8]) -> Result<Entry> {
    let mut reader = TreeReader::new(data);
    let root = reader.read_entry(0)?;

    if reader.position() < data.len() {
        debug!(
            trailing = data.len() - reader.position(),
            "ignoring bytes after root entry"
        );
    }

    Ok(root)
}

/// Cursor over an encoded tree
pub struct TreeReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TreeReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Read an anonymous list or object node
    pub fn read_entry(&mut self, depth: usize) -> Result<Entry> {
        let offset = self.pos;
        let type_byte = self.read_u8()?;
        if type_byte & FLAG_ANONYMOUS == 0 {
            return Err(InitFsError::InvalidFormat(format!(
                "entry at offset {offset} carries a name"
            )));
        }

        match type_byte & TYPE_MASK {
            TYPE_LIST => Ok(Entry::RecordList(
                self.read_container(depth, Self::read_entry)?,
            )),
            TYPE_OBJECT => Ok(Entry::FlagTree(self.read_container(depth, Self::read_flag)?)),
            other => Err(InitFsError::UnsupportedType(other)),
        }
    }

    /// Read a named string, blob or object node
    pub fn read_flag(&mut self, depth: usize) -> Result<Flag> {
        let offset = self.pos;
        let type_byte = self.read_u8()?;
        if type_byte & FLAG_ANONYMOUS != 0 {
            return Err(InitFsError::InvalidFormat(format!(
                "flag at offset {offset} has no name"
            )));
        }

        let name = self.read_cstring()?;
        let data = match type_byte & TYPE_MASK {
            TYPE_STRING => FlagData::Text(self.read_string()?),
            TYPE_BLOB => {
                let len = self.read_len()?;
                FlagData::Bytes(self.take(len)?.to_vec())
            }
            TYPE_OBJECT => FlagData::FlagTree(self.read_container(depth, Self::read_flag)?),
            other => return Err(InitFsError::UnsupportedType(other)),
        };

        Ok(Flag { name, data })
    }

    /// Read a size-prefixed, zero-terminated run of children
    fn read_container<T>(
        &mut self,
        depth: usize,
        mut read_child: impl FnMut(&mut Self, usize) -> Result<T>,
    ) -> Result<Vec<T>> {
        if depth >= MAX_DEPTH {
            return Err(InitFsError::InvalidFormat(format!(
                "nesting deeper than {MAX_DEPTH} levels"
            )));
        }

        let size = self.read_len()?;
        if size > self.remaining() {
            return Err(InitFsError::InvalidFormat(format!(
                "container at offset {} declares {size} bytes, {} available",
                self.pos,
                self.remaining()
            )));
        }
        let end = self.pos + size;

        let mut children = Vec::new();
        loop {
            if self.pos >= end {
                return Err(InitFsError::InvalidFormat(format!(
                    "container ending at offset {end} is not terminated"
                )));
            }
            if self.data[self.pos] == TYPE_END {
                self.pos += 1;
                break;
            }
            children.push(read_child(self, depth + 1)?);
        }

        if self.pos != end {
            return Err(InitFsError::InvalidFormat(format!(
                "container size mismatch: expected end at {end}, got {}",
                self.pos
            )));
        }

        Ok(children)
    }

    /// Length-prefixed string whose length counts a trailing NUL
    ///
    /// The length is at least one; even an empty string carries its NUL.
    fn read_string(&mut self) -> Result<String> {
        let offset = self.pos;
        let len = self.read_len()?;
        let bytes = match self.take(len)? {
            [text @ .., 0] => text,
            [] => {
                return Err(InitFsError::InvalidFormat(format!(
                    "string at offset {offset} has zero length"
                )))
            }
            _ => {
                return Err(InitFsError::InvalidFormat(format!(
                    "string at offset {offset} is not NUL-terminated"
                )))
            }
        };
        utf8(bytes, offset)
    }

    fn read_cstring(&mut self) -> Result<String> {
        let offset = self.pos;
        let len = self.data[self.pos..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| {
                InitFsError::InvalidFormat(format!("unterminated name at offset {offset}"))
            })?;
        let bytes = self.take(len)?;
        self.pos += 1;
        utf8(bytes, offset)
    }

    fn read_len(&mut self) -> Result<usize> {
        let (value, consumed) = read_varint(&self.data[self.pos..])?;
        self.pos += consumed;
        usize::try_from(value)
            .map_err(|_| InitFsError::InvalidFormat(format!("length {value} out of range")))
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(InitFsError::InvalidFormat(format!(
                "unexpected end of data at offset {} (need {len} bytes, {} left)",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

fn utf8(bytes: &[u8], offset: usize) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| InitFsError::InvalidFormat(format!("invalid UTF-8 at offset {offset}: {e}")))
}
