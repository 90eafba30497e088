use crate::error::{InitFsError, Result};
use std::io::{Read, Write};

/// Magic at the start of a platform-variant archive
pub const PLATFORM_MAGIC: [u8; 4] = [0x00, 0xD1, 0xCE, 0x01];

/// Total size of the platform header, magic included
pub const PLATFORM_HEADER_SIZE: usize = 0x22C;

/// Offset of the key material inside the platform header
pub const KEY_OFFSET: usize = 0x128;

/// Length of the key material in bytes, identical for both variants
pub const KEY_LENGTH: usize = 257;

/// Constant folded into every key byte when obfuscating the body
pub const KEY_XOR: u8 = 0x7B;

/// Deepest nesting accepted when decoding
pub const MAX_DEPTH: usize = 64;

// Type byte layout: low five bits carry the type, the top bit marks an
// anonymous (unnamed) node.
pub const TYPE_MASK: u8 = 0x1F;
pub const FLAG_ANONYMOUS: u8 = 0x80;

pub const TYPE_END: u8 = 0x00;
pub const TYPE_LIST: u8 = 0x01;
pub const TYPE_OBJECT: u8 = 0x02;
pub const TYPE_STRING: u8 = 0x07;
pub const TYPE_BLOB: u8 = 0x13;

/// Fixed-length key material of a container
///
/// Only the platform variant stores real keys; the other variant always
/// carries [`KeyMaterial::blank`].
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial([u8; KEY_LENGTH]);

impl KeyMaterial {
    /// The all-zero placeholder used by the non-platform variant
    pub fn blank() -> Self {
        Self([0u8; KEY_LENGTH])
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let keys: [u8; KEY_LENGTH] =
            bytes
                .try_into()
                .map_err(|_| InitFsError::InvalidKeyLength {
                    expected: KEY_LENGTH,
                    actual: bytes.len(),
                })?;
        Ok(Self(keys))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// XOR a whole archive body in place
    pub fn apply(&self, data: &mut [u8]) {
        for (i, byte) in data.iter_mut().enumerate() {
            *byte ^= self.0[i % KEY_LENGTH] ^ KEY_XOR;
        }
    }
}

impl Default for KeyMaterial {
    fn default() -> Self {
        Self::blank()
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_blank() {
            write!(f, "KeyMaterial(blank)")
        } else {
            write!(f, "KeyMaterial({}..)", hex::encode(&self.0[..8]))
        }
    }
}

/// Header of the platform variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformHeader {
    pub keys: KeyMaterial,
}

impl PlatformHeader {
    pub fn new(keys: KeyMaterial) -> Self {
        Self { keys }
    }

    /// Write the full header, zero-filling everything except magic and keys
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let mut buf = [0u8; PLATFORM_HEADER_SIZE];
        buf[..PLATFORM_MAGIC.len()].copy_from_slice(&PLATFORM_MAGIC);
        buf[KEY_OFFSET..KEY_OFFSET + KEY_LENGTH].copy_from_slice(self.keys.as_bytes());
        writer.write_all(&buf)?;
        Ok(())
    }

    /// Read the full header, magic included
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = [0u8; PLATFORM_HEADER_SIZE];
        reader.read_exact(&mut buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                InitFsError::InvalidFormat("truncated platform header".to_string())
            }
            _ => InitFsError::Io(e),
        })?;

        if buf[..PLATFORM_MAGIC.len()] != PLATFORM_MAGIC {
            return Err(InitFsError::InvalidFormat(
                "missing platform header magic".to_string(),
            ));
        }

        let keys = KeyMaterial::from_slice(&buf[KEY_OFFSET..KEY_OFFSET + KEY_LENGTH])?;
        Ok(Self { keys })
    }
}

/// Append `value` as an unsigned LEB128 integer
pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Read an unsigned LEB128 integer from the front of `data`
///
/// Returns the value and the number of bytes consumed.
pub fn read_varint(data: &[u8]) -> Result<(u64, usize)> {
    let mut value = 0u64;
    for (i, &byte) in data.iter().enumerate().take(10) {
        let bits = u64::from(byte & 0x7F);
        if i == 9 && bits > 1 {
            return Err(InitFsError::InvalidFormat("varint overflows u64".to_string()));
        }
        value |= bits << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(InitFsError::InvalidFormat("truncated varint".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let mut raw = [0u8; KEY_LENGTH];
        raw[0] = 0xAA;
        raw[KEY_LENGTH - 1] = 0xBB;
        let header = PlatformHeader::new(KeyMaterial::from_slice(&raw).unwrap());

        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();

        assert_eq!(buf.len(), PLATFORM_HEADER_SIZE);
        assert_eq!(&buf[..4], &PLATFORM_MAGIC);
        assert_eq!(buf[KEY_OFFSET], 0xAA);
        assert_eq!(buf[KEY_OFFSET + KEY_LENGTH - 1], 0xBB);
        assert!(buf[KEY_OFFSET + KEY_LENGTH..].iter().all(|&b| b == 0));

        let parsed = PlatformHeader::read_from(&buf[..]).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_header_rejects_truncation_and_bad_magic() {
        let mut buf = Vec::new();
        PlatformHeader::new(KeyMaterial::blank()).write_to(&mut buf).unwrap();

        assert!(matches!(
            PlatformHeader::read_from(&buf[..100]),
            Err(InitFsError::InvalidFormat(_))
        ));

        buf[1] = 0;
        assert!(matches!(
            PlatformHeader::read_from(&buf[..]),
            Err(InitFsError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_key_material_length() {
        assert!(KeyMaterial::blank().is_blank());
        assert_eq!(KeyMaterial::blank().as_bytes().len(), KEY_LENGTH);
        assert!(matches!(
            KeyMaterial::from_slice(&[1, 2, 3]),
            Err(InitFsError::InvalidKeyLength { expected: KEY_LENGTH, actual: 3 })
        ));
    }

    #[test]
    fn test_key_apply_is_involution() {
        let keys = KeyMaterial::from_slice(&[0x11u8; KEY_LENGTH]).unwrap();
        let original: Vec<u8> = (0..600u32).map(|i| i as u8).collect();

        let mut data = original.clone();
        keys.apply(&mut data);
        assert_ne!(data, original);
        assert_eq!(data[0], 0x11 ^ KEY_XOR);
        keys.apply(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn test_varint() {
        for value in [0u64, 1, 127, 128, 300, 16_384, u32::MAX as u64, u64::MAX] {
            let mut buf = Vec::new();
            write_varint(&mut buf, value);
            assert_eq!(read_varint(&buf).unwrap(), (value, buf.len()));
        }

        let mut buf = Vec::new();
        write_varint(&mut buf, 300);
        assert_eq!(buf, vec![0xAC, 0x02]);

        assert!(read_varint(&[0x80, 0x80]).is_err());
        assert!(read_varint(&[0xFF; 11]).is_err());
    }
}
