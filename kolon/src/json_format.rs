//! `JSONCompactEachRow` textual encoding, used for the rows of an external
//! table shipped alongside a query.
use serde_json::value::Value as Json;

use crate::value::Value;

/// Encode `rows` as `JSONCompactEachRow`: one JSON array per row,
/// newline-separated.
pub(crate) fn encode_jsoncompacteachrow(rows: &[Vec<Value>]) -> String {
    let mut out = String::new();
    for row in rows {
        let arr = Json::Array(row.iter().map(value_to_json).collect());
        out.push_str(&arr.to_string());
        out.push('\n');
    }
    out
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::UInt8(v) => Json::from(*v),
        Value::UInt16(v) => Json::from(*v),
        Value::UInt32(v) => Json::from(*v),
        Value::UInt64(v) => Json::from(*v),
        Value::UInt128(v) => Json::String(v.to_string()),
        Value::UInt256(v) => Json::String(v.to_string()),
        Value::Int8(v) => Json::from(*v),
        Value::Int16(v) => Json::from(*v),
        Value::Int32(v) => Json::from(*v),
        Value::Int64(v) => Json::from(*v),
        Value::Int128(v) => Json::String(v.to_string()),
        Value::Int256(v) => Json::String(v.to_string()),
        Value::Float32(v) => Json::from(*v),
        Value::Float64(v) => Json::from(*v),
        // ClickHouse expects decimal literals quoted like other big numbers
        // when sent through JSONCompactEachRow; output_format_json_quote_decimals
        // on the response side mirrors this on the way out.
        Value::Decimal(v) => Json::String(v.to_string()),
        Value::String(s) => Json::String(s.clone()),
        Value::Enum(s) => Json::String(s.clone()),
        Value::Date(d) | Value::Date32(d) => Json::String(d.format("%Y-%m-%d").to_string()),
        Value::DateTime(dt) | Value::DateTime64(dt) => {
            Json::String(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string())
        }
        Value::Uuid(u) => Json::String(u.to_string()),
        Value::Ipv4(ip) => Json::String(ip.to_string()),
        Value::Ipv6(ip) => Json::String(ip.to_string()),
        Value::Array(items) | Value::Tuple(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Map(pairs) => Json::Object(
            pairs
                .iter()
                .map(|(k, v)| (map_key_string(k), value_to_json(v)))
                .collect(),
        ),
        Value::Json(j) => j.clone(),
    }
}

fn map_key_string(key: &Value) -> String {
    match key {
        Value::String(s) | Value::Enum(s) => s.clone(),
        other => value_to_json(other).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_one_line_per_row() {
        let rows = vec![
            vec![Value::UInt32(1), Value::String("a".into())],
            vec![Value::UInt32(2), Value::String("b".into())],
        ];
        let out = encode_jsoncompacteachrow(&rows);
        let mut lines = out.lines();
        assert_eq!(lines.next().unwrap(), r#"[1,"a"]"#);
        assert_eq!(lines.next().unwrap(), r#"[2,"b"]"#);
        assert!(lines.next().is_none());
    }

    #[test]
    fn big_integers_are_quoted() {
        let rows = vec![vec![Value::Int128(170141183460469231731687303715884105727)]];
        let out = encode_jsoncompacteachrow(&rows);
        assert_eq!(out.trim_end(), r#"["170141183460469231731687303715884105727"]"#);
    }
}
