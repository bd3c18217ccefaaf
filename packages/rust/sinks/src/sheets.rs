//! Google Sheets append through the Sheets v4 REST API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use url::Url;

use leadgen_shared::{EXPORT_HEADERS, ExportRow, LeadGenError, Result};

use crate::RowSink;
use crate::auth::AccessTokenSource;

const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4/";

/// First-row range covering the nine export columns.
const HEADER_RANGE: &str = "A1:I1";

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Appends rows to the first worksheet of a spreadsheet.
///
/// The sheet's first row is read before every append; when it does not
/// equal the export headers (an empty sheet included) the header row is
/// sent ahead of the data rows.
pub struct SheetsSink {
    sheet_id: String,
    api_base: Url,
    client: Client,
    tokens: Box<dyn AccessTokenSource>,
}

impl SheetsSink {
    pub fn new(
        sheet_id: impl Into<String>,
        client: Client,
        tokens: Box<dyn AccessTokenSource>,
    ) -> Result<Self> {
        Self::with_api_base(sheet_id, client, tokens, DEFAULT_API_BASE)
    }

    /// Point the sink at another API root (mock servers in tests).
    pub fn with_api_base(
        sheet_id: impl Into<String>,
        client: Client,
        tokens: Box<dyn AccessTokenSource>,
        api_base: &str,
    ) -> Result<Self> {
        let sheet_id = sheet_id.into();
        if sheet_id.trim().is_empty() {
            return Err(LeadGenError::validation("Google Sheet ID is required"));
        }
        let api_base = Url::parse(api_base)
            .map_err(|e| LeadGenError::config(format!("invalid Sheets API base URL: {e}")))?;
        Ok(Self {
            sheet_id,
            api_base,
            client,
            tokens,
        })
    }

    pub fn sheet_id(&self) -> &str {
        &self.sheet_id
    }

    fn values_url(&self, suffix: &str) -> Result<Url> {
        self.api_base
            .join(&format!("spreadsheets/{}/values/{suffix}", self.sheet_id))
            .map_err(|e| LeadGenError::Export(format!("bad Sheets URL: {e}")))
    }

    async fn first_row(&self, token: &str) -> Result<Vec<String>> {
        let url = self.values_url(HEADER_RANGE)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| LeadGenError::Export(format!("Sheets read failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LeadGenError::Export(format!(
                "Sheets read rejected: HTTP {status}: {text}"
            )));
        }

        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| LeadGenError::Export(format!("invalid Sheets response: {e}")))?;
        Ok(range.values.into_iter().next().unwrap_or_default())
    }
}

#[async_trait]
impl RowSink for SheetsSink {
    fn destination(&self) -> String {
        format!("Google Sheet {}", self.sheet_id)
    }

    #[instrument(skip_all, fields(sheet_id = %self.sheet_id, rows = rows.len()))]
    async fn write_rows(&self, rows: &[ExportRow]) -> Result<()> {
        if rows.is_empty() {
            return Err(LeadGenError::validation("cannot export an empty lead list"));
        }

        let token = self.tokens.access_token().await?;
        let existing = self.first_row(&token).await?;
        let needs_header = existing.iter().map(String::as_str).ne(EXPORT_HEADERS.iter().copied());

        let mut values: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 1);
        if needs_header {
            values.push(EXPORT_HEADERS.iter().map(|h| h.to_string()).collect());
        }
        values.extend(rows.iter().map(ExportRow::to_fields));

        let mut url = self.values_url("A1:append")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let response = self
            .client
            .post(url)
            .bearer_auth(&token)
            .json(&json!({ "values": values }))
            .send()
            .await
            .map_err(|e| LeadGenError::Export(format!("Sheets append failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LeadGenError::Export(format!(
                "Sheets append rejected: HTTP {status}: {text}"
            )));
        }

        info!(header_added = needs_header, "appended rows to Google Sheet");
        Ok(())
    }
}
