//! Parameter interpolation: rendering a [`Value`] as the database-literal
//! string ClickHouse expects for a `param_<name>` query-string value.
use std::fmt::Write;

use crate::value::Value;

/// Render `value` as a ClickHouse parameter literal.
///
/// Strings are single-quoted with `'` and `\` backslash-escaped; nested
/// containers reuse the same rendering recursively.
pub(crate) fn render(value: &Value) -> String {
    let mut out = String::new();
    render_into(value, &mut out);
    out
}

fn render_into(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("NULL"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::UInt8(v) => write_int(out, *v),
        Value::UInt16(v) => write_int(out, *v),
        Value::UInt32(v) => write_int(out, *v),
        Value::UInt64(v) => write_int(out, *v),
        Value::UInt128(v) => write_int(out, *v),
        Value::UInt256(v) => { let _ = write!(out, "{v}"); }
        Value::Int8(v) => write_int(out, *v),
        Value::Int16(v) => write_int(out, *v),
        Value::Int32(v) => write_int(out, *v),
        Value::Int64(v) => write_int(out, *v),
        Value::Int128(v) => write_int(out, *v),
        Value::Int256(v) => { let _ = write!(out, "{v}"); }
        Value::Float32(v) => { let _ = write!(out, "{v}"); }
        Value::Float64(v) => { let _ = write!(out, "{v}"); }
        Value::Decimal(v) => { let _ = write!(out, "{v}"); }
        Value::String(s) => render_quoted(s, out),
        Value::Enum(s) => render_quoted(s, out),
        Value::Date(d) | Value::Date32(d) => { let _ = write!(out, "'{}'", d.format("%Y-%m-%d")); }
        Value::DateTime(dt) | Value::DateTime64(dt) => {
            let _ = write!(out, "'{}'", dt.format("%Y-%m-%d %H:%M:%S%.f"));
        }
        Value::Uuid(u) => { let _ = write!(out, "'{u}'"); }
        Value::Ipv4(ip) => { let _ = write!(out, "'{ip}'"); }
        Value::Ipv6(ip) => { let _ = write!(out, "'{ip}'"); }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render_into(item, out);
            }
            out.push(']');
        }
        Value::Tuple(items) => {
            out.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render_into(item, out);
            }
            out.push(')');
        }
        Value::Map(pairs) => {
            out.push('{');
            for (i, (k, v)) in pairs.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render_map_key(k, out);
                out.push(':');
                render_into(v, out);
            }
            out.push('}');
        }
        Value::Json(j) => render_quoted(&j.to_string(), out),
    }
}

fn write_int(out: &mut String, v: impl itoa::Integer) {
    let mut buf = itoa::Buffer::new();
    out.push_str(buf.format(v));
}

fn render_quoted(s: &str, out: &mut String) {
    out.push('\'');
    for c in s.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
}

/// Map keys are always single-quoted, even non-string ones.
fn render_map_key(key: &Value, out: &mut String) {
    match key {
        Value::String(s) | Value::Enum(s) => render_quoted(s, out),
        other => {
            let rendered = render(other);
            let _ = write!(out, "'{rendered}'");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn null_and_bool() {
        assert_eq!(render(&Value::Null), "NULL");
        assert_eq!(render(&Value::Bool(true)), "true");
    }

    #[test]
    fn string_escaping() {
        assert_eq!(render(&Value::String("a'b\\c".into())), "'a\\'b\\\\c'");
    }

    #[test]
    fn array_and_tuple() {
        let arr = Value::Array(vec![Value::UInt32(1), Value::UInt32(2)]);
        assert_eq!(render(&arr), "[1,2]");
        let tup = Value::Tuple(vec![Value::UInt32(1), Value::String("x".into())]);
        assert_eq!(render(&tup), "(1,'x')");
    }

    #[test]
    fn date_renders_iso8601() {
        let d = Value::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(render(&d), "'2024-01-02'");
    }

    #[test]
    fn map_renders_quoted_keys() {
        let m = Value::Map(vec![(Value::String("k".into()), Value::UInt8(1))]);
        assert_eq!(render(&m), "{'k':1}");
    }
}
