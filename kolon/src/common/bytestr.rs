use bytes::Bytes;
use std::{fmt, ops::Deref, str::Utf8Error};

/// Cheaply cloneable, immutable UTF-8 string backed by [`Bytes`].
///
/// Used for small pieces of text lifted directly out of a response buffer
/// (column names, config fields) without forcing a `String` allocation.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ByteStr(Bytes);

impl ByteStr {
    /// Validate `bytes` as UTF-8 and wrap it.
    pub fn from_utf8(bytes: Bytes) -> Result<Self, Utf8Error> {
        std::str::from_utf8(&bytes)?;
        Ok(Self(bytes))
    }

    /// Copy a borrowed string into an owned, reference-counted buffer.
    pub fn copy_from_str(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }

    /// Wrap a `'static` string without copying.
    pub fn from_static(s: &'static str) -> Self {
        Self(Bytes::from_static(s.as_bytes()))
    }

    /// Returns the string slice.
    pub fn as_str(&self) -> &str {
        // SAFETY: validated as UTF-8 at construction, `Bytes` never mutates in place.
        unsafe { std::str::from_utf8_unchecked(&self.0) }
    }

    /// Slice `self` by a sub-slice of its own string, sharing the same
    /// backing allocation (see [`Bytes::slice_ref`]).
    pub fn slice_ref(&self, subset: &str) -> Self {
        Self(self.0.slice_ref(subset.as_bytes()))
    }
}

impl Deref for ByteStr {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for ByteStr {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<String> for ByteStr {
    fn from(s: String) -> Self {
        Self(Bytes::from(s.into_bytes()))
    }
}

impl From<&str> for ByteStr {
    fn from(s: &str) -> Self {
        Self::copy_from_str(s)
    }
}

impl fmt::Display for ByteStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ByteStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}
