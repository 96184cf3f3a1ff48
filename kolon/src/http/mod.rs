//! HTTP session (component H): owns the pooled [`reqwest::Client`], builds
//! request URLs, attaches auth headers, negotiates gzip, and exposes the
//! primitive operations the facade drives (`ping`, query, insert).
mod query_string;

use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::{
    Error,
    common::{ByteStr, verbose},
    config::Config,
    external_table::ExternalTable,
    row::RowResult,
    value::Value,
};

pub(crate) struct Session {
    client: reqwest::Client,
    base_url: url::Url,
    user: ByteStr,
    password: ByteStr,
    database: ByteStr,
    enable_compression: bool,
    pub(crate) lazy_decode: bool,
}

impl Session {
    pub(crate) fn new(config: &Config) -> Result<Self, Error> {
        let client = config.build_http()?;
        let base_url = url::Url::parse(&config.url)
            .map_err(|e| Error::encoding(format!("invalid base url: {e}")))?;

        Ok(Self {
            client,
            base_url,
            user: config.user.clone(),
            password: config.password.clone(),
            database: config.database.clone(),
            enable_compression: config.enable_compression,
            lazy_decode: config.lazy_decode,
        })
    }

    /// Attaches auth headers. Response decompression is negotiated by
    /// `reqwest` itself (`Client::gzip`, set in [`Config::build_http`]) —
    /// setting `Accept-Encoding` by hand here would disable `reqwest`'s own
    /// automatic decompression of the response body.
    fn decorate(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("X-ClickHouse-User", self.user.as_str())
            .header("X-ClickHouse-Key", self.password.as_str())
    }

    /// gzip-compress `body`, for use on request bodies `reqwest` does not
    /// compress on its own (it only negotiates response decompression).
    fn compress(&self, body: Bytes) -> Result<Bytes, Error> {
        use std::io::Write;
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&body).map_err(|e| Error::encoding(e.to_string()))?;
        let compressed =
            encoder.finish().map_err(|e| Error::encoding(e.to_string()))?;
        Ok(Bytes::from(compressed))
    }

    /// `GET /ping`.
    pub(crate) async fn get_ping(&self) -> Result<(), Error> {
        let mut url = self.base_url.clone();
        url.set_path("ping");
        verbose!("GET {url}");
        let resp = self.decorate(self.client.get(url)).send().await?;
        check_status(resp).await.map(drop)
    }

    fn query_url(
        &self,
        sql: Option<&str>,
        bound_params: &[(String, Value)],
        settings: &[(String, String)],
        external_tables: &[ExternalTable],
    ) -> url::Url {
        query_string::build_url(
            &self.base_url,
            &self.database,
            self.enable_compression,
            sql,
            bound_params,
            settings,
            external_tables,
        )
    }

    fn build_query_request(
        &self,
        sql: &str,
        bound_params: &[(String, Value)],
        settings: &[(String, String)],
        external_tables: &[ExternalTable],
    ) -> reqwest::RequestBuilder {
        verbose!("{sql}");
        if external_tables.is_empty() {
            let url = self.query_url(None, bound_params, settings, external_tables);
            return self.decorate(self.client.post(url)).body(sql.to_string());
        }

        let url = self.query_url(Some(sql), bound_params, settings, external_tables);
        let mut form = reqwest::multipart::Form::new();
        for table in external_tables {
            let part = reqwest::multipart::Part::text(table.to_jsoncompacteachrow())
                .mime_str("application/octet-stream")
                .expect("static mime type is valid");
            form = form.part(table.name.clone(), part);
        }
        self.decorate(self.client.post(url)).multipart(form)
    }

    /// Run `sql` and return the full response body.
    ///
    /// Used by the buffered fetch paths.
    pub(crate) async fn post_query_buffered(
        &self,
        sql: &str,
        bound_params: &[(String, Value)],
        settings: &[(String, String)],
        external_tables: &[ExternalTable],
    ) -> Result<Bytes, Error> {
        let resp = self
            .build_query_request(sql, bound_params, settings, external_tables)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.bytes().await?)
    }

    /// Run `sql` and return the response body as a chunk stream.
    ///
    /// Used by the streaming fetch paths.
    pub(crate) async fn post_query_stream(
        &self,
        sql: &str,
        bound_params: &[(String, Value)],
        settings: &[(String, String)],
        external_tables: &[ExternalTable],
    ) -> Result<BoxStream<'static, Result<Bytes, reqwest::Error>>, Error> {
        let resp = self
            .build_query_request(sql, bound_params, settings, external_tables)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(Box::pin(resp.bytes_stream()))
    }

    /// `INSERT INTO table (cols) FORMAT RowBinary` with `body` as the raw
    /// `RowBinary` payload.
    pub(crate) async fn post_insert(
        &self,
        table: &str,
        column_names: Option<&[String]>,
        body: Bytes,
    ) -> Result<RowResult, Error> {
        let cols = match column_names {
            Some(names) if !names.is_empty() => format!(" ({})", names.join(", ")),
            _ => String::new(),
        };
        let sql = format!("INSERT INTO {table}{cols} FORMAT RowBinary");
        verbose!("{sql}, {} bytes", body.len());

        let url = self.query_url(Some(&sql), &[], &[], &[]);
        let mut builder = self.decorate(self.client.post(url));
        let body = match self.enable_compression {
            true => {
                builder = builder.header(reqwest::header::CONTENT_ENCODING, "gzip");
                self.compress(body)?
            }
            false => body,
        };
        let resp = builder.body(body).send().await?;
        let resp = check_status(resp).await?;
        Ok(RowResult { rows_affected: rows_affected_from_headers(&resp) })
    }

    /// Run a statement (DDL, `INSERT ... VALUES`, etc.) whose body is not a
    /// `RowBinaryWithNamesAndTypes` result set.
    pub(crate) async fn post_execute(
        &self,
        sql: &str,
        bound_params: &[(String, Value)],
        settings: &[(String, String)],
    ) -> Result<RowResult, Error> {
        let resp = self.build_query_request(sql, bound_params, settings, &[]).send().await?;
        let resp = check_status(resp).await?;
        let result = RowResult { rows_affected: rows_affected_from_headers(&resp) };
        resp.bytes().await?;
        Ok(result)
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(Error::server(status, body))
}

/// Parse ClickHouse's optional `X-ClickHouse-Summary` response header for a
/// written-row count. Absent or malformed headers read as zero.
fn rows_affected_from_headers(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get("X-ClickHouse-Summary")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| serde_json::from_str::<serde_json::Value>(s).ok())
        .and_then(|j| j.get("written_rows").and_then(|n| n.as_str()).and_then(|s| s.parse().ok()))
        .unwrap_or(0)
}
