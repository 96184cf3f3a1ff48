//! Row, column, and schema types.
//!
//! - [`Schema`]
//! - [`Row`] (eager)
//! - [`LazyRow`]
//! - [`RowView`] (either, as returned by the fetch paths)
//! - [`Column`]
//! - [`FromRow`]
//! - [`Decode`]
//!
//! - [`Index`]
//! - [`DecodeError`]
use bytes::{Buf, Bytes};
use std::{borrow::Cow, fmt, str::Utf8Error, sync::Arc};

use crate::{
    common::{ByteStr, unit_error},
    decode::decode_value,
    types::TypeDescriptor,
    value::Value,
};

/// A column's name and parsed type, shared immutably across every row of a
/// result set.
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    pub name: ByteStr,
    pub ty: Arc<TypeDescriptor>,
}

/// Column names and types of a result set, shared by every row it produces.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Arc<[ColumnSchema]>,
}

impl Schema {
    pub(crate) fn new(columns: Vec<ColumnSchema>) -> Self {
        Self { columns: columns.into() }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| &*c.name == name)
    }
}

/// An eagerly-decoded row: every field is decoded at construction time.
#[derive(Debug, Clone)]
pub struct Row {
    schema: Schema,
    values: Vec<Value>,
}

impl Row {
    pub(crate) fn new(schema: Schema, values: Vec<Value>) -> Self {
        Self { schema, values }
    }

    pub(crate) fn decode_from(schema: Schema, buf: &mut impl Buf) -> Result<Self, crate::Error> {
        let mut values = Vec::with_capacity(schema.len());
        for col in schema.columns() {
            values.push(decode_value(buf, &col.ty)?);
        }
        Ok(Self::new(schema, values))
    }

    /// Returns `true` if row contains no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Try get and decode column.
    pub fn try_get<I: Index, R: Decode>(&self, idx: I) -> Result<R, DecodeError> {
        let i = idx.position(&self.schema)?;
        let name = self.schema.columns()[i].name.clone();
        let value = self.values[i].clone();
        R::decode(Column { name, value })
    }

    /// Try decode type using [`FromRow`] implementation.
    pub fn decode<D: FromRow>(self) -> Result<D, DecodeError> {
        D::from_row(self)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl IntoIterator for Row {
    type Item = Result<Column, DecodeError>;
    type IntoIter = IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { schema: self.schema, values: self.values.into_iter(), idx: 0 }
    }
}

/// [`IntoIterator`] implementation for [`Row`].
pub struct IntoIter {
    schema: Schema,
    values: std::vec::IntoIter<Value>,
    idx: usize,
}

impl IntoIter {
    /// Same as [`Iterator::next`] but returns [`Result`] instead.
    pub fn try_next(&mut self) -> Result<Column, DecodeError> {
        match self.next() {
            Some(ok) => ok,
            None => Err(DecodeError::IndexOutOfBounds(self.idx)),
        }
    }
}

impl Iterator for IntoIter {
    type Item = Result<Column, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.schema.columns().get(self.idx)?.name.clone();
        let value = self.values.next()?;
        self.idx += 1;
        Some(Ok(Column { name, value }))
    }
}

/// A row that retains its raw bytes and decodes fields on first access,
/// memoizing the result.
pub struct LazyRow {
    schema: Schema,
    bytes: Bytes,
    /// `offsets[i]` is the byte offset where column `i` starts, once known.
    offsets: Vec<Option<usize>>,
    cache: Vec<Option<Value>>,
}

impl LazyRow {
    pub(crate) fn new(schema: Schema, bytes: Bytes) -> Self {
        let len = schema.len();
        let mut offsets = vec![None; len];
        if len > 0 {
            offsets[0] = Some(0);
        }
        Self { schema, bytes, offsets, cache: vec![None; len] }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.schema.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schema.is_empty()
    }

    fn offset_of(&mut self, idx: usize) -> Result<usize, DecodeError> {
        if let Some(offset) = self.offsets[idx] {
            return Ok(offset);
        }
        let known = (0..idx).rev().find_map(|i| self.offsets[i].map(|o| (i, o)));
        let (mut i, mut offset) = known.unwrap_or((0, self.offsets[0].unwrap_or(0)));
        while i < idx {
            let mut cursor = &self.bytes[offset..];
            let before = cursor.remaining();
            decode_value(&mut cursor, &self.schema.columns()[i].ty)
                .map_err(|_| DecodeError::IndexOutOfBounds(idx))?;
            let consumed = before - cursor.remaining();
            offset += consumed;
            i += 1;
            self.offsets[i] = Some(offset);
        }
        Ok(offset)
    }

    /// Decode and memoize the value at `idx`, reusing a cached decode on
    /// repeated access.
    pub fn get(&mut self, idx: usize) -> Result<&Value, DecodeError> {
        if idx >= self.len() {
            return Err(DecodeError::IndexOutOfBounds(idx));
        }
        if self.cache[idx].is_none() {
            let offset = self.offset_of(idx)?;
            let mut cursor = &self.bytes[offset..];
            let value = decode_value(&mut cursor, &self.schema.columns()[idx].ty)
                .map_err(|_| DecodeError::IndexOutOfBounds(idx))?;
            self.cache[idx] = Some(value);
        }
        Ok(self.cache[idx].as_ref().unwrap())
    }

    /// Decode and memoize the value of column `name`.
    pub fn get_named(&mut self, name: &str) -> Result<&Value, DecodeError> {
        let idx = self
            .schema
            .position(name)
            .ok_or_else(|| DecodeError::ColumnNotFound(Cow::Owned(name.to_string())))?;
        self.get(idx)
    }

    /// Force decoding of every remaining field, producing an eager [`Row`].
    pub fn into_eager(mut self) -> Result<Row, DecodeError> {
        for i in 0..self.len() {
            self.get(i)?;
        }
        let values = self.cache.into_iter().map(|v| v.expect("decoded above")).collect();
        Ok(Row::new(self.schema, values))
    }
}

/// Either an eagerly- or lazily-decoded row, as returned by the buffered and
/// streaming fetch paths depending on [`Config::lazy_decode`][crate::config::Config::lazy_decode].
pub enum RowView {
    Eager(Row),
    Lazy(LazyRow),
}

impl RowView {
    pub fn schema(&self) -> &Schema {
        match self {
            Self::Eager(row) => row.schema(),
            Self::Lazy(row) => row.schema(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Eager(row) => row.len(),
            Self::Lazy(row) => row.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Eager(row) => row.is_empty(),
            Self::Lazy(row) => row.is_empty(),
        }
    }

    /// Try get and decode column, decoding it on demand when backed by a
    /// [`LazyRow`].
    pub fn try_get<I: Index, R: Decode>(&mut self, idx: I) -> Result<R, DecodeError> {
        match self {
            Self::Eager(row) => row.try_get(idx),
            Self::Lazy(row) => {
                let i = idx.position(row.schema())?;
                let name = row.schema().columns()[i].name.clone();
                let value = row.get(i)?.clone();
                R::decode(Column { name, value })
            }
        }
    }

    /// Force decoding of every remaining field, producing an eager [`Row`].
    pub fn into_eager(self) -> Result<Row, DecodeError> {
        match self {
            Self::Eager(row) => Ok(row),
            Self::Lazy(row) => row.into_eager(),
        }
    }

    /// Try decode type using [`FromRow`] implementation.
    pub fn decode<D: FromRow>(self) -> Result<D, DecodeError> {
        self.into_eager()?.decode()
    }
}

/// A single decoded column value paired with its name.
#[derive(Debug, Clone)]
pub struct Column {
    name: ByteStr,
    value: Value,
}

impl Column {
    /// Returns the column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return `true` if value is NULL.
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Borrow the inner [`Value`].
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consume self into the inner [`Value`].
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Try decode type using [`Decode`] implementation.
    pub fn decode<D: Decode>(self) -> Result<D, DecodeError> {
        D::decode(self)
    }
}

/// Query result with its rows affected (insert/DDL).
#[derive(Debug)]
pub struct RowResult {
    pub rows_affected: u64,
}

// ===== Traits =====

/// Type that can be constructed from a row.
pub trait FromRow: Sized {
    /// Construct self from row.
    fn from_row(row: Row) -> Result<Self, DecodeError>;
}

impl FromRow for Row {
    fn from_row(row: Row) -> Result<Self, DecodeError> {
        Ok(row)
    }
}

impl FromRow for () {
    fn from_row(_: Row) -> Result<Self, DecodeError> {
        Ok(())
    }
}

macro_rules! from_row_tuple {
    ($($t:ident $i:literal),*) => {
        impl<$($t),*> FromRow for ($($t),*,)
        where
            $($t: Decode),*
        {
            fn from_row(row: Row) -> Result<Self, DecodeError> {
                Ok((
                    $(row.try_get($i)?),*,
                ))
            }
        }
    };
}

from_row_tuple!(T0 0);
from_row_tuple!(T0 0, T1 1);
from_row_tuple!(T0 0, T1 1, T2 2);
from_row_tuple!(T0 0, T1 1, T2 2, T3 3);

/// A type that can be constructed from [`Column`].
pub trait Decode: Sized {
    /// Try decode self from column.
    fn decode(column: Column) -> Result<Self, DecodeError>;
}

impl Decode for Column {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        Ok(column)
    }
}

impl Decode for Value {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        Ok(column.value)
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        match column.is_null() {
            true => Ok(None),
            false => column.decode().map(Some),
        }
    }
}

impl Decode for () {
    fn decode(_: Column) -> Result<Self, DecodeError> {
        Ok(())
    }
}

macro_rules! decode_numeric {
    ($ty:ty, $variant:ident) => {
        impl Decode for $ty {
            fn decode(column: Column) -> Result<Self, DecodeError> {
                match column.value {
                    Value::$variant(v) => Ok(v),
                    _ => Err(DecodeError::TypeMismatch(stringify!($ty), stringify!($variant))),
                }
            }
        }
    };
}

decode_numeric!(bool, Bool);
decode_numeric!(u8, UInt8);
decode_numeric!(u16, UInt16);
decode_numeric!(u32, UInt32);
decode_numeric!(u64, UInt64);
decode_numeric!(u128, UInt128);
decode_numeric!(i8, Int8);
decode_numeric!(i16, Int16);
decode_numeric!(i32, Int32);
decode_numeric!(i64, Int64);
decode_numeric!(i128, Int128);
decode_numeric!(f32, Float32);
decode_numeric!(f64, Float64);
decode_numeric!(bigdecimal::BigDecimal, Decimal);
decode_numeric!(num_bigint::BigUint, UInt256);
decode_numeric!(num_bigint::BigInt, Int256);
decode_numeric!(uuid::Uuid, Uuid);
decode_numeric!(std::net::Ipv4Addr, Ipv4);
decode_numeric!(std::net::Ipv6Addr, Ipv6);
decode_numeric!(serde_json::Value, Json);

impl Decode for String {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        match column.value {
            Value::String(s) | Value::Enum(s) => Ok(s),
            _ => Err(DecodeError::TypeMismatch("String", "value")),
        }
    }
}

impl Decode for chrono::NaiveDate {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        match column.value {
            Value::Date(d) | Value::Date32(d) => Ok(d),
            _ => Err(DecodeError::TypeMismatch("NaiveDate", "value")),
        }
    }
}

impl Decode for chrono::DateTime<chrono_tz::Tz> {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        match column.value {
            Value::DateTime(dt) | Value::DateTime64(dt) => Ok(dt),
            _ => Err(DecodeError::TypeMismatch("DateTime", "value")),
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(column: Column) -> Result<Self, DecodeError> {
        match column.value {
            Value::Array(items) => items
                .into_iter()
                .map(|v| T::decode(Column { name: ByteStr::from_static(""), value: v }))
                .collect(),
            _ => Err(DecodeError::TypeMismatch("Vec<T>", "value")),
        }
    }
}

/// Type that can be used for indexing a row.
pub trait Index: Sized + sealed::Sealed {
    /// Resolve self to a column position within `schema`.
    fn position(self, schema: &Schema) -> Result<usize, DecodeError>;
}

impl Index for usize {
    fn position(self, schema: &Schema) -> Result<usize, DecodeError> {
        match self < schema.len() {
            true => Ok(self),
            false => Err(DecodeError::IndexOutOfBounds(self)),
        }
    }
}

impl Index for &str {
    fn position(self, schema: &Schema) -> Result<usize, DecodeError> {
        schema
            .position(self)
            .ok_or_else(|| DecodeError::ColumnNotFound(Cow::Owned(self.to_string())))
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for usize {}
    impl Sealed for &str {}
}

unit_error! {
    /// An error when `fetchone`/`fetchval` find no row.
    pub struct RowNotFound("row not found");
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for DecodeError {
            fn from($pat: $ty) -> Self {
                $body
            }
        }
    };
}

/// An error when decoding a row or column value.
pub enum DecodeError {
    /// Invalid UTF-8 in a string-like value.
    Utf8(Utf8Error),
    /// Column requested not found.
    ColumnNotFound(Cow<'static, str>),
    /// Index requested is out of bounds.
    IndexOutOfBounds(usize),
    /// Rust type requested does not match the decoded value's shape.
    TypeMismatch(&'static str, &'static str),
    /// Value is NULL.
    Null,
    /// Failed to deserialize using `serde_json`.
    Json(serde_json::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to decode value, ")?;
        match self {
            Self::Utf8(e) => write!(f, "{e}"),
            Self::ColumnNotFound(name) => write!(f, "column not found: {name:?}"),
            Self::IndexOutOfBounds(u) => write!(f, "index out of bounds: {u:?}"),
            Self::TypeMismatch(want, got) => write!(f, "expected {want}, found {got}"),
            Self::Null => write!(f, "unexpected NULL value"),
            Self::Json(e) => write!(f, "{e}"),
        }
    }
}

from!(<Utf8Error>e => Self::Utf8(e));
from!(<serde_json::Error>e => Self::Json(e));

impl std::error::Error for DecodeError {}

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
