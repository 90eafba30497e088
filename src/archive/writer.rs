use crate::archive::format::{
    write_varint, FLAG_ANONYMOUS, TYPE_BLOB, TYPE_END, TYPE_LIST, TYPE_OBJECT, TYPE_STRING,
};
use crate::error::{InitFsError, Result};
use crate::model::{Entry, Flag, FlagData};

/// Encode a tree into a plain archive body
pub fn encode_body(root: &Entry) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_entry(&mut out, root)?;
    Ok(out)
}

fn write_entry(out: &mut Vec<u8>, entry: &Entry) -> Result<()> {
    match entry {
        Entry::RecordList(entries) => {
            out.push(TYPE_LIST | FLAG_ANONYMOUS);
            write_container(out, |body| {
                entries.iter().try_for_each(|entry| write_entry(body, entry))
            })
        }
        Entry::FlagTree(flags) => {
            out.push(TYPE_OBJECT | FLAG_ANONYMOUS);
            write_container(out, |body| flags.iter().try_for_each(|flag| write_flag(body, flag)))
        }
    }
}

fn write_flag(out: &mut Vec<u8>, flag: &Flag) -> Result<()> {
    if flag.name.as_bytes().contains(&0) {
        return Err(InitFsError::InvalidFormat(format!(
            "flag name {:?} contains a NUL byte",
            flag.name
        )));
    }

    let type_code = match &flag.data {
        FlagData::Text(_) => TYPE_STRING,
        FlagData::Bytes(_) => TYPE_BLOB,
        FlagData::FlagTree(_) => TYPE_OBJECT,
    };
    out.push(type_code);
    out.extend_from_slice(flag.name.as_bytes());
    out.push(0);

    match &flag.data {
        FlagData::Text(text) => {
            write_varint(out, text.len() as u64 + 1);
            out.extend_from_slice(text.as_bytes());
            out.push(0);
            Ok(())
        }
        FlagData::Bytes(bytes) => {
            write_varint(out, bytes.len() as u64);
            out.extend_from_slice(bytes);
            Ok(())
        }
        FlagData::FlagTree(children) => write_container(out, |body| {
            children.iter().try_for_each(|flag| write_flag(body, flag))
        }),
    }
}

/// Write `size` followed by the children and the terminator
fn write_container(
    out: &mut Vec<u8>,
    fill: impl FnOnce(&mut Vec<u8>) -> Result<()>,
) -> Result<()> {
    let mut body = Vec::new();
    fill(&mut body)?;
    body.push(TYPE_END);

    write_varint(out, body.len() as u64);
    out.extend_from_slice(&body);
    Ok(())
}
