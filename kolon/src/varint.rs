//! VarUInt (LEB128-style) length encoding used for strings, arrays, maps.
use bytes::{Buf, BufMut};

use crate::Error;

/// Max bytes a VarUInt may occupy: 10 bytes cover a full `u64` at 7 bits/byte.
const MAX_BYTES: usize = 10;

/// Read a VarUInt from `buf`, advancing the cursor.
///
/// Fails with [`Error::unexpected_eof`] if `buf` runs out before a
/// terminating byte, and with [`Error::encoding`] if more than
/// [`MAX_BYTES`] continuation bytes are seen.
pub fn read_varuint(buf: &mut impl Buf) -> Result<u64, Error> {
    let mut value = 0u64;
    for i in 0..MAX_BYTES {
        if !buf.has_remaining() {
            return Err(Error::unexpected_eof());
        }
        let byte = buf.get_u8();
        value |= ((byte & 0x7f) as u64) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(Error::encoding("VarUInt exceeds 10 bytes"))
}

/// Write `value` as a VarUInt into `buf`.
pub fn write_varuint(buf: &mut impl BufMut, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(byte);
            return;
        }
        buf.put_u8(byte | 0x80);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn roundtrip(v: u64) {
        let mut buf = BytesMut::new();
        write_varuint(&mut buf, v);
        let mut slice = &buf[..];
        assert_eq!(read_varuint(&mut slice).unwrap(), v);
        assert!(!slice.has_remaining());
    }

    #[test]
    fn boundaries() {
        for v in [0, 1, 127, 128, 16383, 16384, u64::MAX >> 1, u64::MAX] {
            roundtrip(v);
        }
    }

    #[test]
    fn truncated_is_eof() {
        let mut buf = BytesMut::new();
        write_varuint(&mut buf, 16384);
        let mut slice = &buf[..1];
        assert!(read_varuint(&mut slice).is_err());
    }
}
