//! External tables: in-memory data shipped alongside a query, consumed via
//! ClickHouse's external-data HTTP mechanism (one multipart part per table,
//! formatted as `JSONCompactEachRow`).
use crate::value::Value;

/// One in-memory table bound to a query by name.
///
/// Constructed by the caller and consumed once: [`crate::Client`] reads
/// `columns`/`rows` when assembling the request and does not retain it.
pub struct ExternalTable {
    pub(crate) name: String,
    pub(crate) columns: Vec<(String, String)>,
    pub(crate) rows: Vec<Vec<Value>>,
}

impl ExternalTable {
    /// Start building an external table named `name`, with `columns` given
    /// as `(name, type expression)` pairs.
    pub fn new(name: impl Into<String>, columns: Vec<(String, String)>) -> Self {
        Self { name: name.into(), columns, rows: Vec::new() }
    }

    /// Append one row. Caller is responsible for matching `columns`' arity
    /// and order; no type-checking is performed here.
    pub fn push_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    pub(crate) fn structure(&self) -> String {
        self.columns
            .iter()
            .map(|(name, ty)| format!("{name} {ty}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Render this table's rows as `JSONCompactEachRow`: one JSON array per
    /// row, newline-separated.
    pub(crate) fn to_jsoncompacteachrow(&self) -> String {
        crate::json_format::encode_jsoncompacteachrow(&self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_joins_name_and_type() {
        let t = ExternalTable::new("ids", vec![("id".into(), "UInt32".into())]);
        assert_eq!(t.structure(), "id UInt32");
    }
}
