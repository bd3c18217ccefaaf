use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, instrument};

use leadgen_shared::{EXPORT_HEADERS, ExportRow, LeadGenError, Result};

use crate::RowSink;

/// Writes rows to a local CSV file with minimal quoting.
///
/// In overwrite mode the file is replaced and always starts with the header.
/// In append mode the header is written only when the file is missing or
/// empty.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
    append: bool,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>, append: bool) -> Self {
        Self {
            path: path.into(),
            append,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<(File, bool)> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| LeadGenError::io(dir, e))?;
        }

        if self.append {
            let has_content = std::fs::metadata(&self.path).is_ok_and(|m| m.len() > 0);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| LeadGenError::io(&self.path, e))?;
            Ok((file, !has_content))
        } else {
            let file = File::create(&self.path).map_err(|e| LeadGenError::io(&self.path, e))?;
            Ok((file, true))
        }
    }
}

#[async_trait]
impl RowSink for CsvSink {
    fn destination(&self) -> String {
        self.path.display().to_string()
    }

    #[instrument(skip_all, fields(path = %self.path.display(), rows = rows.len()))]
    async fn write_rows(&self, rows: &[ExportRow]) -> Result<()> {
        if rows.is_empty() {
            return Err(LeadGenError::validation("cannot export an empty lead list"));
        }

        let (file, write_header) = self.open()?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(file);

        let csv_err = |e: csv::Error| LeadGenError::Export(format!("{}: {e}", self.path.display()));

        if write_header {
            writer.write_record(EXPORT_HEADERS).map_err(csv_err)?;
        }
        for row in rows {
            writer.serialize(row).map_err(csv_err)?;
        }
        writer.flush().map_err(|e| LeadGenError::io(&self.path, e))?;

        info!(append = self.append, header = write_header, "CSV written");
        Ok(())
    }
}
