//! Query-string assembly for ClickHouse's HTTP interface.
use crate::{external_table::ExternalTable, params, value::Value};

/// Build the request URL: base URL plus every query-string key the session
/// needs to attach (§4.6): `database`, `output_format_json_quote_decimals`,
/// optional `enable_http_compression`, `param_<name>` per bound parameter,
/// freeform `settings`, and per external table `<name>_format`/`<name>_structure`.
pub(super) fn build_url(
    base: &url::Url,
    database: &str,
    enable_compression: bool,
    query: Option<&str>,
    bound_params: &[(String, Value)],
    settings: &[(String, String)],
    external_tables: &[ExternalTable],
) -> url::Url {
    let mut url = base.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("database", database);
        pairs.append_pair("output_format_json_quote_decimals", "1");
        if enable_compression {
            pairs.append_pair("enable_http_compression", "1");
        }
        if let Some(q) = query {
            pairs.append_pair("query", q);
        }
        for (name, value) in bound_params {
            pairs.append_pair(&format!("param_{name}"), &params::render(value));
        }
        for (key, value) in settings {
            pairs.append_pair(key, value);
        }
        for table in external_tables {
            pairs.append_pair(&format!("{}_format", table.name), "JSONCompactEachRow");
            pairs.append_pair(&format!("{}_structure", table.name), &table.structure());
        }
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_database_and_format_flag() {
        let base = url::Url::parse("http://localhost:8123/").unwrap();
        let url = build_url(&base, "default", false, None, &[], &[], &[]);
        let query = url.query().unwrap();
        assert!(query.contains("database=default"));
        assert!(query.contains("output_format_json_quote_decimals=1"));
        assert!(!query.contains("enable_http_compression"));
    }

    #[test]
    fn bound_params_are_prefixed() {
        let base = url::Url::parse("http://localhost:8123/").unwrap();
        let bound = vec![("id".to_string(), Value::UInt32(7))];
        let url = build_url(&base, "default", false, None, &bound, &[], &[]);
        assert!(url.query().unwrap().contains("param_id=7"));
    }
}
