//! Type-expression parsing: [`TypeDescriptor`], the tree the decoder/encoder
//! are driven by.
mod cache;
mod parser;

pub use cache::parse;

/// One element of a [`TypeDescriptor::Tuple`].
///
/// The name is optional metadata the parser retains for named tuple
/// elements (`Tuple(x UInt8, y String)`); the decoder ignores it.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleElement {
    pub name: Option<String>,
    pub ty: TypeDescriptor,
}

/// An `(label, value)` pair of an `Enum8`/`Enum16` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub name: String,
    pub value: i16,
}

/// A parsed type expression, e.g. `Nullable(Map(String, Array(Decimal(10,2))))`.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Bool,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    UInt256,
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    Int256,
    Float32,
    Float64,
    Decimal { precision: u16, scale: u16 },
    String,
    FixedString(usize),
    Enum8(Vec<EnumValue>),
    Enum16(Vec<EnumValue>),
    Date,
    Date32,
    DateTime(Option<String>),
    DateTime64(u8, Option<String>),
    Uuid,
    Ipv4,
    Ipv6,
    Array(Box<TypeDescriptor>),
    Tuple(Vec<TupleElement>),
    Map(Box<TypeDescriptor>, Box<TypeDescriptor>),
    Nullable(Box<TypeDescriptor>),
    LowCardinality(Box<TypeDescriptor>),
    Json,
}

impl TypeDescriptor {
    /// Strip `LowCardinality`: on the wire in `RowBinaryWithNamesAndTypes`
    /// it behaves identically to its inner type.
    pub fn resolved(&self) -> &TypeDescriptor {
        match self {
            Self::LowCardinality(inner) => inner.resolved(),
            other => other,
        }
    }

    /// `true` if a NULL is legal for this descriptor.
    pub fn is_nullable(&self) -> bool {
        matches!(self.resolved(), Self::Nullable(_))
    }

    /// Backing integer width, in bytes, for a `Decimal(P, _)` of the given
    /// precision.
    pub fn decimal_width(precision: u16) -> usize {
        match precision {
            0..=9 => 4,
            10..=18 => 8,
            19..=38 => 16,
            _ => 32,
        }
    }
}

impl std::fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool => write!(f, "Bool"),
            Self::UInt8 => write!(f, "UInt8"),
            Self::UInt16 => write!(f, "UInt16"),
            Self::UInt32 => write!(f, "UInt32"),
            Self::UInt64 => write!(f, "UInt64"),
            Self::UInt128 => write!(f, "UInt128"),
            Self::UInt256 => write!(f, "UInt256"),
            Self::Int8 => write!(f, "Int8"),
            Self::Int16 => write!(f, "Int16"),
            Self::Int32 => write!(f, "Int32"),
            Self::Int64 => write!(f, "Int64"),
            Self::Int128 => write!(f, "Int128"),
            Self::Int256 => write!(f, "Int256"),
            Self::Float32 => write!(f, "Float32"),
            Self::Float64 => write!(f, "Float64"),
            Self::Decimal { precision, scale } => write!(f, "Decimal({precision}, {scale})"),
            Self::String => write!(f, "String"),
            Self::FixedString(n) => write!(f, "FixedString({n})"),
            Self::Enum8(values) => fmt_enum(f, "Enum8", values),
            Self::Enum16(values) => fmt_enum(f, "Enum16", values),
            Self::Date => write!(f, "Date"),
            Self::Date32 => write!(f, "Date32"),
            Self::DateTime(None) => write!(f, "DateTime"),
            Self::DateTime(Some(tz)) => write!(f, "DateTime('{tz}')"),
            Self::DateTime64(p, None) => write!(f, "DateTime64({p})"),
            Self::DateTime64(p, Some(tz)) => write!(f, "DateTime64({p}, '{tz}')"),
            Self::Uuid => write!(f, "UUID"),
            Self::Ipv4 => write!(f, "IPv4"),
            Self::Ipv6 => write!(f, "IPv6"),
            Self::Array(inner) => write!(f, "Array({inner})"),
            Self::Tuple(elems) => {
                write!(f, "Tuple(")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match &elem.name {
                        Some(name) => write!(f, "{name} {}", elem.ty)?,
                        None => write!(f, "{}", elem.ty)?,
                    }
                }
                write!(f, ")")
            }
            Self::Map(k, v) => write!(f, "Map({k}, {v})"),
            Self::Nullable(inner) => write!(f, "Nullable({inner})"),
            Self::LowCardinality(inner) => write!(f, "LowCardinality({inner})"),
            Self::Json => write!(f, "JSON"),
        }
    }
}

fn fmt_enum(f: &mut std::fmt::Formatter<'_>, name: &str, values: &[EnumValue]) -> std::fmt::Result {
    write!(f, "{name}(")?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "'{}' = {}", v.name, v.value)?;
    }
    write!(f, ")")
}
