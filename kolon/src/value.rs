//! A type-erased host value.
//!
//! Returned from [`crate::Client::fetch_rows`]/[`crate::Client::stream_rows`]
//! when the caller does not bind a concrete [`FromRow`][crate::FromRow] type,
//! and walked by the `JSONCompactEachRow` renderer for external-table rows.
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use num_bigint::{BigInt, BigUint};
use std::net::{Ipv4Addr, Ipv6Addr};
use uuid::Uuid;

/// A decoded (or to-be-encoded) column value, erased of its Rust type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    UInt128(u128),
    UInt256(BigUint),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Int128(i128),
    Int256(BigInt),
    Float32(f32),
    Float64(f64),
    Decimal(BigDecimal),
    String(String),
    /// An `Enum8`/`Enum16` value, resolved to its label.
    Enum(String),
    Date(NaiveDate),
    Date32(NaiveDate),
    /// Timezone-aware instant. A naive `DateTime`/`DateTime64` (no declared
    /// timezone) is attached to UTC.
    DateTime(DateTime<Tz>),
    DateTime64(DateTime<Tz>),
    Uuid(Uuid),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
    /// Insertion-ordered key/value pairs; not deduplicated.
    Map(Vec<(Value, Value)>),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}
