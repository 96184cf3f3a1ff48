//! Asynchronous ClickHouse HTTP client.
//!
//! # Examples
//!
//! ```no_run
//! use kolon::{Client, Config};
//!
//! #[derive(kolon::FromRow)]
//! struct Event {
//!     id: u64,
//!     name: String,
//! }
//!
//! # async fn app() -> kolon::Result<()> {
//! let client = Client::new(Config::from_env())?;
//!
//! let events = client.fetch::<Event>("SELECT id, name FROM events LIMIT 10").await?;
//!
//! for event in events {
//!     println!("{} {}", event.id, event.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod common;

// Configuration
pub mod config;

// Type system
pub mod types;

// Encoding
mod value;
pub mod decode;
pub mod encode;
mod varint;

// Row model
pub mod row;

// Pipeline
pub mod stream;

// Peripheral wire formats
mod json_format;
pub mod params;

// External interfaces
pub mod external_table;
mod http;

// Facade
mod client;

mod error;

pub use client::Client;
pub use config::{Config, ConfigError};
pub use external_table::ExternalTable;
pub use row::{Column, Decode, DecodeError, FromRow, LazyRow, Row, RowResult, RowView, Schema};
pub use stream::RowStream;
pub use types::TypeDescriptor;
pub use value::Value;

pub use error::{Error, ErrorKind, Result};

#[cfg(feature = "macros")]
pub use kolon_macros::{Decode, FromRow};
