//! Binary decoder (component D): turns wire bytes into [`Value`]s, driven by
//! a [`TypeDescriptor`].
use bytes::Buf;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use num_bigint::{BigInt, BigUint, Sign};
use std::net::{Ipv4Addr, Ipv6Addr};
use uuid::Uuid;

use crate::{
    Error,
    types::TypeDescriptor,
    value::Value,
    varint::read_varuint,
};

fn need(buf: &impl Buf, n: usize) -> Result<(), Error> {
    match buf.remaining() >= n {
        true => Ok(()),
        false => Err(Error::unexpected_eof()),
    }
}

/// Decode one value of type `ty` from `buf`, advancing the cursor past it.
///
/// On any error the cursor position is unspecified; callers that need to
/// retry (streaming mode) must decode against a cloned snapshot of the
/// buffer and only commit the advance on success.
pub fn decode_value(buf: &mut impl Buf, ty: &TypeDescriptor) -> Result<Value, Error> {
    match ty {
        TypeDescriptor::Bool => {
            need(buf, 1)?;
            Ok(Value::Bool(buf.get_u8() != 0))
        }
        TypeDescriptor::UInt8 => {
            need(buf, 1)?;
            Ok(Value::UInt8(buf.get_u8()))
        }
        TypeDescriptor::UInt16 => {
            need(buf, 2)?;
            Ok(Value::UInt16(buf.get_u16_le()))
        }
        TypeDescriptor::UInt32 => {
            need(buf, 4)?;
            Ok(Value::UInt32(buf.get_u32_le()))
        }
        TypeDescriptor::UInt64 => {
            need(buf, 8)?;
            Ok(Value::UInt64(buf.get_u64_le()))
        }
        TypeDescriptor::UInt128 => {
            need(buf, 16)?;
            Ok(Value::UInt128(buf.get_u128_le()))
        }
        TypeDescriptor::UInt256 => {
            need(buf, 32)?;
            let mut bytes = [0u8; 32];
            buf.copy_to_slice(&mut bytes);
            Ok(Value::UInt256(BigUint::from_bytes_le(&bytes)))
        }
        TypeDescriptor::Int8 => {
            need(buf, 1)?;
            Ok(Value::Int8(buf.get_i8()))
        }
        TypeDescriptor::Int16 => {
            need(buf, 2)?;
            Ok(Value::Int16(buf.get_i16_le()))
        }
        TypeDescriptor::Int32 => {
            need(buf, 4)?;
            Ok(Value::Int32(buf.get_i32_le()))
        }
        TypeDescriptor::Int64 => {
            need(buf, 8)?;
            Ok(Value::Int64(buf.get_i64_le()))
        }
        TypeDescriptor::Int128 => {
            need(buf, 16)?;
            Ok(Value::Int128(buf.get_i128_le()))
        }
        TypeDescriptor::Int256 => {
            need(buf, 32)?;
            let mut bytes = [0u8; 32];
            buf.copy_to_slice(&mut bytes);
            Ok(Value::Int256(bigint_from_le_bytes(&bytes)))
        }
        TypeDescriptor::Float32 => {
            need(buf, 4)?;
            Ok(Value::Float32(buf.get_f32_le()))
        }
        TypeDescriptor::Float64 => {
            need(buf, 8)?;
            Ok(Value::Float64(buf.get_f64_le()))
        }
        TypeDescriptor::Decimal { precision, scale } => {
            let width = TypeDescriptor::decimal_width(*precision);
            need(buf, width)?;
            let mut bytes = vec![0u8; width];
            buf.copy_to_slice(&mut bytes);
            let ticks = bigint_from_le_bytes(&bytes);
            Ok(Value::Decimal(bigdecimal::BigDecimal::new(ticks, *scale as i64)))
        }
        TypeDescriptor::String => {
            let len = read_varuint(buf)? as usize;
            need(buf, len)?;
            let mut bytes = vec![0u8; len];
            buf.copy_to_slice(&mut bytes);
            String::from_utf8(bytes)
                .map(Value::String)
                .map_err(|e| Error::encoding(format!("invalid UTF-8 in String: {e}")))
        }
        TypeDescriptor::FixedString(n) => {
            need(buf, *n)?;
            let mut bytes = vec![0u8; *n];
            buf.copy_to_slice(&mut bytes);
            while bytes.last() == Some(&0) {
                bytes.pop();
            }
            String::from_utf8(bytes)
                .map(Value::String)
                .map_err(|e| Error::encoding(format!("invalid UTF-8 in FixedString: {e}")))
        }
        TypeDescriptor::Enum8(values) => {
            need(buf, 1)?;
            let tag = buf.get_i8() as i16;
            lookup_enum(values, tag)
        }
        TypeDescriptor::Enum16(values) => {
            need(buf, 2)?;
            let tag = buf.get_i16_le();
            lookup_enum(values, tag)
        }
        TypeDescriptor::Date => {
            need(buf, 2)?;
            Ok(Value::Date(epoch_plus_days(buf.get_u16_le() as i64)))
        }
        TypeDescriptor::Date32 => {
            need(buf, 4)?;
            Ok(Value::Date32(epoch_plus_days(buf.get_i32_le() as i64)))
        }
        TypeDescriptor::DateTime(tz) => {
            need(buf, 4)?;
            let secs = buf.get_u32_le() as i64;
            let utc = DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| {
                Error::out_of_range("DateTime seconds out of range")
            })?;
            Ok(Value::DateTime(attach_tz(utc, tz.as_deref())?))
        }
        TypeDescriptor::DateTime64(precision, tz) => {
            need(buf, 8)?;
            let ticks = buf.get_i64_le();
            let scale = 10i64.pow(*precision as u32);
            let secs = ticks.div_euclid(scale);
            let sub = ticks.rem_euclid(scale);
            let nanos = if *precision <= 9 {
                sub * 10i64.pow(9 - *precision as u32)
            } else {
                0
            };
            let utc = DateTime::<Utc>::from_timestamp(secs, nanos as u32).ok_or_else(|| {
                Error::out_of_range("DateTime64 ticks out of range")
            })?;
            Ok(Value::DateTime64(attach_tz(utc, tz.as_deref())?))
        }
        TypeDescriptor::Uuid => {
            need(buf, 16)?;
            let hi = buf.get_u64_le();
            let lo = buf.get_u64_le();
            let combined = ((hi as u128) << 64) | lo as u128;
            Ok(Value::Uuid(Uuid::from_u128(combined)))
        }
        TypeDescriptor::Ipv4 => {
            need(buf, 4)?;
            Ok(Value::Ipv4(Ipv4Addr::from(buf.get_u32_le())))
        }
        TypeDescriptor::Ipv6 => {
            need(buf, 16)?;
            let mut bytes = [0u8; 16];
            buf.copy_to_slice(&mut bytes);
            Ok(Value::Ipv6(Ipv6Addr::from(bytes)))
        }
        TypeDescriptor::Array(inner) => {
            let len = read_varuint(buf)? as usize;
            let mut values = Vec::with_capacity(len);
            for _ in 0..len {
                values.push(decode_value(buf, inner)?);
            }
            Ok(Value::Array(values))
        }
        TypeDescriptor::Tuple(elems) => {
            let mut values = Vec::with_capacity(elems.len());
            for elem in elems {
                values.push(decode_value(buf, &elem.ty)?);
            }
            Ok(Value::Tuple(values))
        }
        TypeDescriptor::Map(k, v) => {
            let len = read_varuint(buf)? as usize;
            let mut pairs = Vec::with_capacity(len);
            for _ in 0..len {
                let key = decode_value(buf, k)?;
                let value = decode_value(buf, v)?;
                pairs.push((key, value));
            }
            Ok(Value::Map(pairs))
        }
        TypeDescriptor::Nullable(inner) => {
            need(buf, 1)?;
            match buf.get_u8() {
                1 => Ok(Value::Null),
                _ => decode_value(buf, inner),
            }
        }
        TypeDescriptor::LowCardinality(inner) => decode_value(buf, inner),
        TypeDescriptor::Json => {
            let Value::String(text) = decode_value(buf, &TypeDescriptor::String)? else {
                unreachable!()
            };
            serde_json::from_str(&text)
                .map(Value::Json)
                .map_err(|e| Error::encoding(format!("invalid JSON: {e}")))
        }
    }
}

fn lookup_enum(values: &[crate::types::EnumValue], tag: i16) -> Result<Value, Error> {
    values
        .iter()
        .find(|v| v.value == tag)
        .map(|v| Value::Enum(v.name.clone()))
        .ok_or_else(|| Error::encoding(format!("unmapped enum tag {tag}")))
}

fn epoch_plus_days(days: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap() + chrono::Duration::days(days)
}

fn attach_tz(utc: DateTime<Utc>, tz: Option<&str>) -> Result<DateTime<Tz>, Error> {
    match tz {
        None => Ok(utc.with_timezone(&Tz::UTC)),
        Some(name) => {
            let tz: Tz = name
                .parse()
                .map_err(|_| Error::malformed_type(format!("unknown timezone {name:?}")))?;
            Ok(utc.with_timezone(&tz))
        }
    }
}

fn bigint_from_le_bytes(bytes: &[u8]) -> BigInt {
    let negative = bytes.last().is_some_and(|b| b & 0x80 != 0);
    if !negative {
        return BigInt::from_biguint(Sign::Plus, BigUint::from_bytes_le(bytes));
    }
    let mag = BigUint::from_bytes_le(bytes);
    let modulus = BigUint::from(1u8) << (bytes.len() * 8);
    -BigInt::from_biguint(Sign::Plus, modulus - mag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TupleElement;

    #[test]
    fn decode_uint8_and_string() {
        let mut buf: &[u8] = &[0x05, 0x03, b'b', b'o', b'b'];
        assert_eq!(decode_value(&mut buf, &TypeDescriptor::UInt8).unwrap(), Value::UInt8(5));
        assert_eq!(
            decode_value(&mut buf, &TypeDescriptor::String).unwrap(),
            Value::String("bob".into())
        );
    }

    #[test]
    fn fixed_string_strips_trailing_nul() {
        let mut buf: &[u8] = b"ab\0\0";
        assert_eq!(
            decode_value(&mut buf, &TypeDescriptor::FixedString(4)).unwrap(),
            Value::String("ab".into())
        );
    }

    #[test]
    fn nullable_skips_no_bytes_for_null() {
        let mut buf: &[u8] = &[0x01];
        let ty = TypeDescriptor::Nullable(Box::new(TypeDescriptor::Int32));
        assert_eq!(decode_value(&mut buf, &ty).unwrap(), Value::Null);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn uuid_two_halves_little_endian() {
        // integer value 1: low half = 1, high half = 0.
        let mut buf: &[u8] = &[0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0];
        match decode_value(&mut buf, &TypeDescriptor::Uuid).unwrap() {
            Value::Uuid(u) => assert_eq!(u.as_u128(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn low_cardinality_flattens_to_inner() {
        let mut buf: &[u8] = &[0x00, 0x7B, 0x00, 0x00, 0x00];
        let ty = TypeDescriptor::LowCardinality(Box::new(TypeDescriptor::Nullable(Box::new(
            TypeDescriptor::Int32,
        ))));
        assert_eq!(decode_value(&mut buf, &ty).unwrap(), Value::Int32(123));
    }

    #[test]
    fn tuple_decodes_each_element() {
        let mut buf: &[u8] = &[0x01, 0x02, 0x00];
        let ty = TypeDescriptor::Tuple(vec![
            TupleElement { name: None, ty: TypeDescriptor::UInt8 },
            TupleElement { name: None, ty: TypeDescriptor::UInt16 },
        ]);
        assert_eq!(
            decode_value(&mut buf, &ty).unwrap(),
            Value::Tuple(vec![Value::UInt8(1), Value::UInt16(2)])
        );
    }

    #[test]
    fn short_buffer_is_unexpected_eof() {
        let mut buf: &[u8] = &[0x01];
        assert!(decode_value(&mut buf, &TypeDescriptor::UInt32).is_err());
    }
}
