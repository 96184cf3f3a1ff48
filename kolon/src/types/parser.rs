//! Recursive-descent parser for type expressions.
use crate::Error;

use super::{EnumValue, TupleElement, TypeDescriptor};

/// Parse a single type expression, e.g. `Array(Nullable(UInt8))`.
pub(super) fn parse_type(input: &str) -> Result<TypeDescriptor, Error> {
    let (name, args) = split_name_args(input.trim())?;

    match name {
        "Bool" => expect_no_args(name, args, TypeDescriptor::Bool),
        "UInt8" => expect_no_args(name, args, TypeDescriptor::UInt8),
        "UInt16" => expect_no_args(name, args, TypeDescriptor::UInt16),
        "UInt32" => expect_no_args(name, args, TypeDescriptor::UInt32),
        "UInt64" => expect_no_args(name, args, TypeDescriptor::UInt64),
        "UInt128" => expect_no_args(name, args, TypeDescriptor::UInt128),
        "UInt256" => expect_no_args(name, args, TypeDescriptor::UInt256),
        "Int8" => expect_no_args(name, args, TypeDescriptor::Int8),
        "Int16" => expect_no_args(name, args, TypeDescriptor::Int16),
        "Int32" => expect_no_args(name, args, TypeDescriptor::Int32),
        "Int64" => expect_no_args(name, args, TypeDescriptor::Int64),
        "Int128" => expect_no_args(name, args, TypeDescriptor::Int128),
        "Int256" => expect_no_args(name, args, TypeDescriptor::Int256),
        "Float32" => expect_no_args(name, args, TypeDescriptor::Float32),
        "Float64" => expect_no_args(name, args, TypeDescriptor::Float64),
        "String" => expect_no_args(name, args, TypeDescriptor::String),
        "Date" => expect_no_args(name, args, TypeDescriptor::Date),
        "Date32" => expect_no_args(name, args, TypeDescriptor::Date32),
        "UUID" => expect_no_args(name, args, TypeDescriptor::Uuid),
        "IPv4" => expect_no_args(name, args, TypeDescriptor::Ipv4),
        "IPv6" => expect_no_args(name, args, TypeDescriptor::Ipv6),
        "JSON" | "Object" => expect_no_args(name, args, TypeDescriptor::Json),

        "FixedString" => {
            let args = require_args(name, args)?;
            Ok(TypeDescriptor::FixedString(parse_uint(args.trim())? as usize))
        }

        "Decimal" => {
            let args = require_args(name, args)?;
            let parts = split_top_level(args, b',');
            match parts.as_slice() {
                [p, s] => Ok(TypeDescriptor::Decimal {
                    precision: parse_uint(p.trim())? as u16,
                    scale: parse_uint(s.trim())? as u16,
                }),
                _ => Err(Error::malformed_type("Decimal expects (precision, scale)")),
            }
        }
        "Decimal32" | "Decimal64" | "Decimal128" | "Decimal256" => {
            let args = require_args(name, args)?;
            let precision = match name {
                "Decimal32" => 9,
                "Decimal64" => 18,
                "Decimal128" => 38,
                _ => 76,
            };
            Ok(TypeDescriptor::Decimal {
                precision,
                scale: parse_uint(args.trim())? as u16,
            })
        }

        "Enum8" => Ok(TypeDescriptor::Enum8(parse_enum_values(require_args(name, args)?)?)),
        "Enum16" => Ok(TypeDescriptor::Enum16(parse_enum_values(require_args(name, args)?)?)),

        "DateTime" => match args {
            None => Ok(TypeDescriptor::DateTime(None)),
            Some(args) => Ok(TypeDescriptor::DateTime(Some(parse_quoted(args.trim())?))),
        },

        "DateTime64" => {
            let args = require_args(name, args)?;
            let parts = split_top_level(args, b',');
            match parts.as_slice() {
                [p] => Ok(TypeDescriptor::DateTime64(parse_uint(p.trim())? as u8, None)),
                [p, tz] => Ok(TypeDescriptor::DateTime64(
                    parse_uint(p.trim())? as u8,
                    Some(parse_quoted(tz.trim())?),
                )),
                _ => Err(Error::malformed_type("DateTime64 expects (precision[, timezone])")),
            }
        }

        "Array" => {
            let args = require_args(name, args)?;
            Ok(TypeDescriptor::Array(Box::new(parse_type(args)?)))
        }

        "Nullable" => {
            let args = require_args(name, args)?;
            let inner = parse_type(args)?;
            if matches!(inner, TypeDescriptor::Nullable(_)) {
                return Err(Error::malformed_type("Nullable cannot nest directly"));
            }
            Ok(TypeDescriptor::Nullable(Box::new(inner)))
        }

        "LowCardinality" => {
            let args = require_args(name, args)?;
            Ok(TypeDescriptor::LowCardinality(Box::new(parse_type(args)?)))
        }

        "Map" => {
            let args = require_args(name, args)?;
            let parts = split_top_level(args, b',');
            match parts.as_slice() {
                [k, v] => Ok(TypeDescriptor::Map(
                    Box::new(parse_type(k)?),
                    Box::new(parse_type(v)?),
                )),
                _ => Err(Error::malformed_type("Map expects (key, value)")),
            }
        }

        "Tuple" => {
            let args = require_args(name, args)?;
            let elems = split_top_level(args, b',')
                .into_iter()
                .map(parse_tuple_element)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(TypeDescriptor::Tuple(elems))
        }

        other => Err(Error::unknown_type(other)),
    }
}

/// Split `Name(inner)` into `("Name", Some("inner"))`, or `("Name", None)`
/// if there are no parentheses.
fn split_name_args(input: &str) -> Result<(&str, Option<&str>), Error> {
    match input.find('(') {
        None => Ok((input.trim(), None)),
        Some(idx) => {
            let name = input[..idx].trim();
            if !input.ends_with(')') {
                return Err(Error::malformed_type("unbalanced parentheses"));
            }
            Ok((name, Some(&input[idx + 1..input.len() - 1])))
        }
    }
}

fn expect_no_args(
    name: &str,
    args: Option<&str>,
    ty: TypeDescriptor,
) -> Result<TypeDescriptor, Error> {
    match args {
        None => Ok(ty),
        Some(_) => Err(Error::malformed_type(format!("{name} takes no arguments"))),
    }
}

fn require_args<'a>(name: &str, args: Option<&'a str>) -> Result<&'a str, Error> {
    args.ok_or_else(|| Error::malformed_type(format!("{name} requires arguments")))
}

fn parse_tuple_element(elem: &str) -> Result<TupleElement, Error> {
    let elem = elem.trim();
    if let Some(idx) = find_top_level_byte(elem, b' ') {
        let (name, rest) = elem.split_at(idx);
        let rest = rest.trim_start();
        if is_ident(name) && !rest.is_empty() {
            return Ok(TupleElement {
                name: Some(name.to_string()),
                ty: parse_type(rest)?,
            });
        }
    }
    Ok(TupleElement { name: None, ty: parse_type(elem)? })
}

fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_uint(s: &str) -> Result<u64, Error> {
    s.parse().map_err(|_| Error::malformed_type(format!("expected integer, got {s:?}")))
}

/// Strip surrounding single quotes from a literal, e.g. `'Europe/Moscow'`.
fn parse_quoted(s: &str) -> Result<String, Error> {
    let s = s.trim();
    match s.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(inner) => Ok(inner.replace("\\'", "'").replace("\\\\", "\\")),
        None => Err(Error::malformed_type(format!("expected quoted literal, got {s:?}"))),
    }
}

fn parse_enum_values(args: &str) -> Result<Vec<EnumValue>, Error> {
    split_top_level(args, b',')
        .into_iter()
        .map(|pair| {
            let idx = pair
                .find('=')
                .ok_or_else(|| Error::malformed_type("enum pair requires '='"))?;
            let (name, value) = pair.split_at(idx);
            let name = parse_quoted(name.trim())?;
            let value = value[1..]
                .trim()
                .parse::<i16>()
                .map_err(|_| Error::malformed_type("enum value is not an integer"))?;
            Ok(EnumValue { name, value })
        })
        .collect()
}

/// Split `s` at top-level occurrences of `sep`, honoring nested parens and
/// single-quoted literals.
fn split_top_level(s: &str, sep: u8) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut start = 0;

    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\'' => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => depth -= 1,
            b if b == sep && !in_quote && depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim());
    parts
}

fn find_top_level_byte(s: &str, needle: u8) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut in_quote = false;

    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\'' => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => depth -= 1,
            b if b == needle && !in_quote && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_numeric() {
        assert_eq!(parse_type("UInt8").unwrap(), TypeDescriptor::UInt8);
        assert_eq!(parse_type(" Float64 ").unwrap(), TypeDescriptor::Float64);
    }

    #[test]
    fn nested_nullable_array() {
        let ty = parse_type("Nullable(Map(String, Array(Decimal(10,2))))").unwrap();
        match ty {
            TypeDescriptor::Nullable(inner) => match *inner {
                TypeDescriptor::Map(k, v) => {
                    assert_eq!(*k, TypeDescriptor::String);
                    match *v {
                        TypeDescriptor::Array(elem) => assert_eq!(
                            *elem,
                            TypeDescriptor::Decimal { precision: 10, scale: 2 }
                        ),
                        other => panic!("unexpected {other:?}"),
                    }
                }
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_double_nullable() {
        assert!(parse_type("Nullable(Nullable(UInt8))").is_err());
    }

    #[test]
    fn unknown_type_fails() {
        assert!(parse_type("NotAType").is_err());
    }

    #[test]
    fn datetime64_with_timezone() {
        let ty = parse_type("DateTime64(3, 'UTC')").unwrap();
        assert_eq!(ty, TypeDescriptor::DateTime64(3, Some("UTC".into())));
    }

    #[test]
    fn enum_values_with_commas_in_quotes() {
        let ty = parse_type("Enum8('a, b' = 1, 'c' = 2)").unwrap();
        match ty {
            TypeDescriptor::Enum8(values) => {
                assert_eq!(values[0].name, "a, b");
                assert_eq!(values[0].value, 1);
                assert_eq!(values[1].name, "c");
                assert_eq!(values[1].value, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn named_tuple_elements() {
        let ty = parse_type("Tuple(x UInt8, String)").unwrap();
        match ty {
            TypeDescriptor::Tuple(elems) => {
                assert_eq!(elems[0].name.as_deref(), Some("x"));
                assert_eq!(elems[0].ty, TypeDescriptor::UInt8);
                assert_eq!(elems[1].name, None);
                assert_eq!(elems[1].ty, TypeDescriptor::String);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
