//! The user-facing facade: [`Client`].
use futures_core::Stream;
use futures_util::StreamExt;

use crate::{
    Error,
    config::Config,
    external_table::ExternalTable,
    http::Session,
    row::{Decode, FromRow, RowResult, RowView},
    stream::{self, RowStream},
    value::Value,
};

/// An async ClickHouse HTTP client.
///
/// Holds one pooled [`reqwest::Client`][reqwest::Client] (via [`Session`])
/// shared across every call; cheap to clone is not implemented since
/// `Client` itself is meant to be held behind an `Arc` by callers that need
/// to share it across tasks.
pub struct Client {
    session: Session,
}

impl Client {
    /// Build a client from `config`.
    pub fn new(config: Config) -> Result<Self, Error> {
        Ok(Self { session: Session::new(&config)? })
    }

    /// Connect using [`Config::from_env`].
    pub fn from_env() -> Result<Self, Error> {
        Self::new(Config::from_env())
    }

    /// `GET /ping`.
    pub async fn ping(&self) -> Result<(), Error> {
        self.session.get_ping().await
    }

    /// Run a statement that does not return a result set.
    pub async fn execute(&self, sql: &str) -> Result<RowResult, Error> {
        self.execute_with(sql, &[], &[]).await
    }

    /// [`Client::execute`] with bound parameters and raw settings.
    pub async fn execute_with(
        &self,
        sql: &str,
        params: &[(String, Value)],
        settings: &[(String, String)],
    ) -> Result<RowResult, Error> {
        check_sql(sql)?;
        self.session.post_execute(sql, params, settings).await
    }

    /// Run `sql`, decode every row into `R`, and return them all at once.
    pub async fn fetch<R: FromRow>(&self, sql: &str) -> Result<Vec<R>, Error> {
        self.fetch_with(sql, &[], &[], &[]).await
    }

    /// [`Client::fetch`] with bound parameters, settings, and external tables.
    pub async fn fetch_with<R: FromRow>(
        &self,
        sql: &str,
        params: &[(String, Value)],
        settings: &[(String, String)],
        external_tables: &[ExternalTable],
    ) -> Result<Vec<R>, Error> {
        let rows = self.fetch_rows_with(sql, params, settings, external_tables).await?;
        rows.into_iter().map(|row| row.decode::<R>().map_err(Error::from)).collect()
    }

    /// Run `sql` and return every row, without committing to a concrete
    /// Rust type.
    ///
    /// Yields lazily-decoded rows when [`Config::lazy_decode`] is set.
    pub async fn fetch_rows(&self, sql: &str) -> Result<Vec<RowView>, Error> {
        self.fetch_rows_with(sql, &[], &[], &[]).await
    }

    /// [`Client::fetch_rows`] with bound parameters, settings, and external
    /// tables.
    pub async fn fetch_rows_with(
        &self,
        sql: &str,
        params: &[(String, Value)],
        settings: &[(String, String)],
        external_tables: &[ExternalTable],
    ) -> Result<Vec<RowView>, Error> {
        check_sql(sql)?;
        let body = self.session.post_query_buffered(sql, params, settings, external_tables).await?;
        let (_schema, rows) = stream::decode_buffered_rows(body, self.session.lazy_decode)?;
        Ok(rows)
    }

    /// Run `sql` and decode the single returned row into `R`.
    ///
    /// Fails with [`Error::row_not_found`] if the result set is empty.
    pub async fn fetchone<R: FromRow>(&self, sql: &str) -> Result<R, Error> {
        let mut rows = self.fetch::<R>(sql).await?;
        match rows.is_empty() {
            true => Err(Error::row_not_found()),
            false => Ok(rows.remove(0)),
        }
    }

    /// Run `sql` and decode the single column of the single returned row.
    ///
    /// Fails with [`Error::row_not_found`] if the result set is empty.
    pub async fn fetchval<R: Decode>(&self, sql: &str) -> Result<R, Error> {
        let mut rows = self.fetch_rows(sql).await?;
        match rows.is_empty() {
            true => Err(Error::row_not_found()),
            false => {
                let mut row = rows.remove(0);
                row.try_get(0usize).map_err(Error::from)
            }
        }
    }

    /// Run `sql`, decoding rows into `R` as they arrive rather than
    /// buffering the whole response first.
    pub async fn stream<R: FromRow + Unpin>(
        &self,
        sql: &str,
    ) -> Result<impl Stream<Item = Result<R, Error>>, Error> {
        self.stream_with(sql, &[], &[], &[]).await
    }

    /// [`Client::stream`] with bound parameters, settings, and external
    /// tables.
    pub async fn stream_with<R: FromRow + Unpin>(
        &self,
        sql: &str,
        params: &[(String, Value)],
        settings: &[(String, String)],
        external_tables: &[ExternalTable],
    ) -> Result<impl Stream<Item = Result<R, Error>>, Error> {
        let rows = self.stream_rows_with(sql, params, settings, external_tables).await?;
        Ok(rows.map(|row| row.and_then(|row| row.decode::<R>().map_err(Error::from))))
    }

    /// Same as [`Client::stream`] but without committing to a concrete Rust
    /// type.
    pub async fn stream_rows(&self, sql: &str) -> Result<RowStream, Error> {
        self.stream_rows_with(sql, &[], &[], &[]).await
    }

    /// [`Client::stream_rows`] with bound parameters, settings, and external
    /// tables.
    pub async fn stream_rows_with(
        &self,
        sql: &str,
        params: &[(String, Value)],
        settings: &[(String, String)],
        external_tables: &[ExternalTable],
    ) -> Result<RowStream, Error> {
        check_sql(sql)?;
        let body = self.session.post_query_stream(sql, params, settings, external_tables).await?;
        Ok(RowStream::new(body, self.session.lazy_decode))
    }

    /// Insert `rows` into `table`.
    ///
    /// `columns` names each column being inserted along with its type
    /// expression, in the order values appear within each row of `rows`.
    pub async fn insert(
        &self,
        table: &str,
        columns: &[(String, String)],
        rows: Vec<Vec<Value>>,
    ) -> Result<RowResult, Error> {
        let parsed = columns
            .iter()
            .map(|(_, ty)| crate::types::parse(ty))
            .collect::<Result<Vec<_>, Error>>()?;
        let body = crate::encode::encode_rows(&parsed, &rows)?;
        let names: Vec<String> = columns.iter().map(|(name, _)| name.clone()).collect();
        self.session.post_insert(table, Some(&names), body).await
    }
}

fn check_sql(sql: &str) -> Result<(), Error> {
    match sql.trim().is_empty() {
        true => Err(Error::empty_query()),
        false => Ok(()),
    }
}
