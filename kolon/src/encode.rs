//! Binary encoder (component E): writes a [`Value`] into the insert payload
//! format, driven by the target column's [`TypeDescriptor`].
use bigdecimal::BigDecimal;
use bytes::BufMut;
use num_bigint::BigInt;

use crate::{Error, types::TypeDescriptor, value::Value, varint::write_varuint};

/// Encode `value` as `ty` into `buf`.
pub fn encode_value(buf: &mut impl BufMut, ty: &TypeDescriptor, value: &Value) -> Result<(), Error> {
    if let TypeDescriptor::LowCardinality(inner) = ty {
        return encode_value(buf, inner, value);
    }

    if let TypeDescriptor::Nullable(inner) = ty {
        return match value {
            Value::Null => {
                buf.put_u8(1);
                Ok(())
            }
            other => {
                buf.put_u8(0);
                encode_value(buf, inner, other)
            }
        };
    }

    if matches!(value, Value::Null) {
        return Err(Error::null_in_non_nullable());
    }

    match ty {
        TypeDescriptor::Nullable(_) | TypeDescriptor::LowCardinality(_) => unreachable!(),
        TypeDescriptor::Bool => {
            buf.put_u8(as_bool(value)? as u8);
            Ok(())
        }
        TypeDescriptor::UInt8 => {
            buf.put_u8(checked_range(as_i128(value)?, 0, u8::MAX as i128)? as u8);
            Ok(())
        }
        TypeDescriptor::UInt16 => {
            buf.put_u16_le(checked_range(as_i128(value)?, 0, u16::MAX as i128)? as u16);
            Ok(())
        }
        TypeDescriptor::UInt32 => {
            buf.put_u32_le(checked_range(as_i128(value)?, 0, u32::MAX as i128)? as u32);
            Ok(())
        }
        TypeDescriptor::UInt64 => {
            buf.put_u64_le(checked_range(as_i128(value)?, 0, u64::MAX as i128)? as u64);
            Ok(())
        }
        TypeDescriptor::UInt128 => {
            buf.put_u128_le(checked_range(as_i128(value)?, 0, i128::MAX)? as u128);
            Ok(())
        }
        TypeDescriptor::UInt256 => {
            let v = as_biguint(value)?;
            let mut bytes = v.to_bytes_le();
            bytes.resize(32, 0);
            buf.put_slice(&bytes);
            Ok(())
        }
        TypeDescriptor::Int8 => {
            buf.put_i8(checked_range(as_i128(value)?, i8::MIN as i128, i8::MAX as i128)? as i8);
            Ok(())
        }
        TypeDescriptor::Int16 => {
            buf.put_i16_le(checked_range(as_i128(value)?, i16::MIN as i128, i16::MAX as i128)? as i16);
            Ok(())
        }
        TypeDescriptor::Int32 => {
            buf.put_i32_le(checked_range(as_i128(value)?, i32::MIN as i128, i32::MAX as i128)? as i32);
            Ok(())
        }
        TypeDescriptor::Int64 => {
            buf.put_i64_le(checked_range(as_i128(value)?, i64::MIN as i128, i64::MAX as i128)? as i64);
            Ok(())
        }
        TypeDescriptor::Int128 => {
            buf.put_i128_le(checked_range(as_i128(value)?, i128::MIN, i128::MAX)?);
            Ok(())
        }
        TypeDescriptor::Int256 => {
            let v = as_bigint(value)?;
            buf.put_slice(&bigint_to_le_bytes(&v, 32));
            Ok(())
        }
        TypeDescriptor::Float32 => {
            buf.put_f32_le(as_f64(value)? as f32);
            Ok(())
        }
        TypeDescriptor::Float64 => {
            buf.put_f64_le(as_f64(value)?);
            Ok(())
        }
        TypeDescriptor::Decimal { precision, scale } => {
            let width = TypeDescriptor::decimal_width(*precision);
            let dec = as_decimal(value)?;
            let (digits, cur_scale) = dec.into_bigint_and_exponent();
            let scaled = if cur_scale == *scale as i64 {
                digits
            } else if cur_scale < *scale as i64 {
                digits * BigInt::from(10).pow((*scale as i64 - cur_scale) as u32)
            } else {
                let divisor = BigInt::from(10).pow((cur_scale - *scale as i64) as u32);
                let (q, r) = (&digits / &divisor, &digits % &divisor);
                if r != BigInt::from(0) {
                    return Err(Error::precision_loss("decimal value has more fractional digits than the column scale"));
                }
                q
            };
            buf.put_slice(&bigint_to_le_bytes(&scaled, width));
            Ok(())
        }
        TypeDescriptor::String => {
            let s = as_string(value)?;
            write_varuint(buf, s.len() as u64);
            buf.put_slice(s.as_bytes());
            Ok(())
        }
        TypeDescriptor::FixedString(n) => {
            let s = as_string(value)?;
            if s.len() > *n {
                return Err(Error::out_of_range(format!("string of {} bytes does not fit FixedString({n})", s.len())));
            }
            buf.put_slice(s.as_bytes());
            buf.put_bytes(0, n - s.len());
            Ok(())
        }
        TypeDescriptor::Enum8(values) => {
            let tag = lookup_enum_tag(values, value)?;
            buf.put_i8(tag as i8);
            Ok(())
        }
        TypeDescriptor::Enum16(values) => {
            let tag = lookup_enum_tag(values, value)?;
            buf.put_i16_le(tag);
            Ok(())
        }
        TypeDescriptor::Date => {
            buf.put_u16_le(days_since_epoch(value)? as u16);
            Ok(())
        }
        TypeDescriptor::Date32 => {
            buf.put_i32_le(days_since_epoch(value)? as i32);
            Ok(())
        }
        TypeDescriptor::DateTime(_) => {
            let dt = as_datetime(value)?;
            buf.put_u32_le(dt.timestamp() as u32);
            Ok(())
        }
        TypeDescriptor::DateTime64(precision, _) => {
            let dt = as_datetime(value)?;
            let scale = 10i64.pow(*precision as u32);
            let ticks = dt.timestamp() * scale
                + (dt.timestamp_subsec_nanos() as i64) / 10i64.pow(9 - (*precision).min(9) as u32);
            buf.put_i64_le(ticks);
            Ok(())
        }
        TypeDescriptor::Uuid => {
            let u = as_uuid(value)?;
            let n = u.as_u128();
            buf.put_u64_le((n >> 64) as u64);
            buf.put_u64_le(n as u64);
            Ok(())
        }
        TypeDescriptor::Ipv4 => {
            let Value::Ipv4(ip) = value else {
                return Err(Error::out_of_range("expected an IPv4 address"));
            };
            buf.put_u32_le((*ip).into());
            Ok(())
        }
        TypeDescriptor::Ipv6 => {
            let Value::Ipv6(ip) = value else {
                return Err(Error::out_of_range("expected an IPv6 address"));
            };
            buf.put_slice(&ip.octets());
            Ok(())
        }
        TypeDescriptor::Array(inner) => {
            let Value::Array(items) = value else {
                return Err(Error::out_of_range("expected an array"));
            };
            write_varuint(buf, items.len() as u64);
            for item in items {
                encode_value(buf, inner, item)?;
            }
            Ok(())
        }
        TypeDescriptor::Tuple(elems) => {
            let Value::Tuple(items) = value else {
                return Err(Error::out_of_range("expected a tuple"));
            };
            if items.len() != elems.len() {
                return Err(Error::out_of_range(format!(
                    "tuple has {} elements, column expects {}",
                    items.len(),
                    elems.len()
                )));
            }
            for (item, elem) in items.iter().zip(elems) {
                encode_value(buf, &elem.ty, item)?;
            }
            Ok(())
        }
        TypeDescriptor::Map(k, v) => {
            let Value::Map(pairs) = value else {
                return Err(Error::out_of_range("expected a map"));
            };
            write_varuint(buf, pairs.len() as u64);
            for (key, val) in pairs {
                encode_value(buf, k, key)?;
                encode_value(buf, v, val)?;
            }
            Ok(())
        }
        TypeDescriptor::Json => {
            let text = match value {
                Value::Json(v) => serde_json::to_string(v).map_err(|e| Error::encoding(e.to_string()))?,
                Value::String(s) => s.clone(),
                other => return Err(Error::out_of_range(format!("cannot encode {other:?} as JSON"))),
            };
            write_varuint(buf, text.len() as u64);
            buf.put_slice(text.as_bytes());
            Ok(())
        }
    }
}

fn as_bool(value: &Value) -> Result<bool, Error> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => as_i128(other).map(|v| v != 0),
    }
}

fn as_i128(value: &Value) -> Result<i128, Error> {
    Ok(match value {
        Value::Bool(b) => *b as i128,
        Value::UInt8(v) => *v as i128,
        Value::UInt16(v) => *v as i128,
        Value::UInt32(v) => *v as i128,
        Value::UInt64(v) => *v as i128,
        Value::UInt128(v) => *v as i128,
        Value::Int8(v) => *v as i128,
        Value::Int16(v) => *v as i128,
        Value::Int32(v) => *v as i128,
        Value::Int64(v) => *v as i128,
        Value::Int128(v) => *v,
        other => return Err(Error::out_of_range(format!("expected an integer, got {other:?}"))),
    })
}

fn as_f64(value: &Value) -> Result<f64, Error> {
    match value {
        Value::Float32(v) => Ok(*v as f64),
        Value::Float64(v) => Ok(*v),
        other => as_i128(other).map(|v| v as f64),
    }
}

fn as_biguint(value: &Value) -> Result<num_bigint::BigUint, Error> {
    match value {
        Value::UInt256(v) => Ok(v.clone()),
        other => as_i128(other).and_then(|v| {
            num_bigint::BigUint::try_from(v).map_err(|_| Error::out_of_range("value is negative"))
        }),
    }
}

fn as_bigint(value: &Value) -> Result<BigInt, Error> {
    match value {
        Value::Int256(v) => Ok(v.clone()),
        other => as_i128(other).map(BigInt::from),
    }
}

fn as_decimal(value: &Value) -> Result<BigDecimal, Error> {
    match value {
        Value::Decimal(d) => Ok(d.clone()),
        other => as_i128(other).map(BigDecimal::from),
    }
}

fn as_string(value: &Value) -> Result<String, Error> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Enum(s) => Ok(s.clone()),
        other => Err(Error::out_of_range(format!("expected a string, got {other:?}"))),
    }
}

fn as_uuid(value: &Value) -> Result<uuid::Uuid, Error> {
    match value {
        Value::Uuid(u) => Ok(*u),
        other => Err(Error::out_of_range(format!("expected a UUID, got {other:?}"))),
    }
}

fn as_datetime(value: &Value) -> Result<chrono::DateTime<chrono_tz::Tz>, Error> {
    match value {
        Value::DateTime(dt) | Value::DateTime64(dt) => Ok(*dt),
        other => Err(Error::out_of_range(format!("expected a datetime, got {other:?}"))),
    }
}

fn days_since_epoch(value: &Value) -> Result<i64, Error> {
    let date = match value {
        Value::Date(d) | Value::Date32(d) => *d,
        other => return Err(Error::out_of_range(format!("expected a date, got {other:?}"))),
    };
    let epoch = chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    Ok((date - epoch).num_days())
}

fn lookup_enum_tag(values: &[crate::types::EnumValue], value: &Value) -> Result<i16, Error> {
    let name = as_string(value)?;
    values
        .iter()
        .find(|v| v.name == name)
        .map(|v| v.value)
        .ok_or_else(|| Error::out_of_range(format!("{name:?} is not a member of this enum")))
}

fn checked_range(v: i128, min: i128, max: i128) -> Result<i128, Error> {
    if v < min || v > max {
        return Err(Error::out_of_range(format!("{v} does not fit the target column type")));
    }
    Ok(v)
}

fn bigint_to_le_bytes(v: &BigInt, width: usize) -> Vec<u8> {
    let (sign, mut mag) = v.to_bytes_le();
    mag.resize(width, 0);
    if sign == num_bigint::Sign::Minus {
        // two's complement
        for b in &mut mag {
            *b = !*b;
        }
        let mut carry = 1u16;
        for b in &mut mag {
            let sum = *b as u16 + carry;
            *b = sum as u8;
            carry = sum >> 8;
        }
    }
    mag
}

/// Encode `rows` as a `RowBinary` payload (no names/types header, matching
/// `FORMAT RowBinary`): each row's columns encoded in schema order, rows
/// concatenated directly.
pub(crate) fn encode_rows(
    columns: &[std::sync::Arc<TypeDescriptor>],
    rows: &[Vec<Value>],
) -> Result<bytes::Bytes, Error> {
    let mut buf = bytes::BytesMut::new();
    for row in rows {
        if row.len() != columns.len() {
            return Err(Error::encoding(format!(
                "row has {} values, expected {}",
                row.len(),
                columns.len()
            )));
        }
        for (ty, value) in columns.iter().zip(row) {
            encode_value(&mut buf, ty, value)?;
        }
    }
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_value;

    fn roundtrip(ty: &TypeDescriptor, value: Value) {
        let mut buf = Vec::new();
        encode_value(&mut buf, ty, &value).unwrap();
        let mut slice = &buf[..];
        assert_eq!(decode_value(&mut slice, ty).unwrap(), value);
    }

    #[test]
    fn uint8_roundtrip() {
        roundtrip(&TypeDescriptor::UInt8, Value::UInt8(200));
    }

    #[test]
    fn out_of_range_rejected() {
        let mut buf = Vec::new();
        assert!(encode_value(&mut buf, &TypeDescriptor::UInt8, &Value::Int32(-1)).is_err());
        assert!(encode_value(&mut buf, &TypeDescriptor::UInt8, &Value::Int32(1000)).is_err());
    }

    #[test]
    fn null_requires_nullable() {
        let mut buf = Vec::new();
        assert!(encode_value(&mut buf, &TypeDescriptor::UInt8, &Value::Null).is_err());
        let mut buf = Vec::new();
        assert!(encode_value(&mut buf, &TypeDescriptor::Nullable(Box::new(TypeDescriptor::UInt8)), &Value::Null).is_ok());
    }

    #[test]
    fn fixed_string_too_long_fails() {
        let mut buf = Vec::new();
        let err = encode_value(&mut buf, &TypeDescriptor::FixedString(2), &Value::String("abc".into()));
        assert!(err.is_err());
    }

    #[test]
    fn string_roundtrip() {
        roundtrip(&TypeDescriptor::String, Value::String("hello".into()));
    }

    #[test]
    fn array_roundtrip() {
        roundtrip(
            &TypeDescriptor::Array(Box::new(TypeDescriptor::UInt16)),
            Value::Array(vec![Value::UInt16(1), Value::UInt16(2), Value::UInt16(3)]),
        );
    }
}
