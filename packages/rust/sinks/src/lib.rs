//! Tabular export destinations for scored leads.
//!
//! - [`CsvSink`]: the primary local file
//! - [`SheetsSink`]: optional Google Sheets append, authenticated through an
//!   [`AccessTokenSource`]

mod auth;
mod csv_sink;
mod sheets;

use async_trait::async_trait;

use leadgen_shared::{ExportRow, Result};

pub use auth::{AccessTokenSource, ServiceAccountKey, ServiceAccountTokenSource, StaticToken};
pub use csv_sink::CsvSink;
pub use sheets::SheetsSink;

/// A destination that accepts fully-populated export rows.
#[async_trait]
pub trait RowSink: Send + Sync {
    /// Human-readable location, e.g. a file path or sheet id.
    fn destination(&self) -> String;

    /// Write every row, or fail as a whole.
    async fn write_rows(&self, rows: &[ExportRow]) -> Result<()>;
}
