// src/services/sheets.rs

//! Google Sheets v4 REST client.

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::SheetsConfig;
use crate::services::SheetsApi;
use crate::services::auth::{SHEETS_SCOPE, ServiceAccountKey, TokenProvider};
use crate::utils::{column_letter, http, quote_sheet};

/// Timeout for Sheets API calls.
const SHEETS_TIMEOUT_SECS: u64 = 60;

/// Size of a worksheet grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridProperties {
    #[serde(default)]
    pub row_count: u32,
    #[serde(default)]
    pub column_count: u32,
}

/// Identity and size of one worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
    #[serde(default)]
    pub grid_properties: GridProperties,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<Value>,
}

/// Client for one spreadsheet.
pub struct SheetsClient {
    http: reqwest::Client,
    api_base: Url,
    spreadsheet_id: String,
    tokens: TokenProvider,
}

impl SheetsClient {
    pub fn new(api_base: &str, spreadsheet_id: &str, tokens: TokenProvider) -> Result<Self> {
        Ok(Self {
            http: http::create_google_client(SHEETS_TIMEOUT_SECS)?,
            api_base: Url::parse(api_base.trim_end_matches('/'))?,
            spreadsheet_id: spreadsheet_id.to_string(),
            tokens,
        })
    }

    /// Authorize with the configured key file and open the spreadsheet.
    pub fn from_config(config: &SheetsConfig) -> Result<Self> {
        let key = ServiceAccountKey::load(&config.credentials_file)?;
        let tokens = TokenProvider::new(key, SHEETS_SCOPE, SHEETS_TIMEOUT_SECS)?;
        log::info!(
            "Authorized Sheets access as {} for spreadsheet {}",
            tokens.client_email(),
            config.spreadsheet_id
        );
        Self::new(&config.api_base, &config.spreadsheet_id, tokens)
    }

    /// Build `{api_base}/spreadsheets/{segments...}`.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| AppError::config("sheets.api_base cannot be a base URL"))?;
            path.pop_if_empty();
            path.push("spreadsheets");
            path.extend(segments);
        }
        Ok(url)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let token = self.tokens.token().await?;
        let resp = request.bearer_auth(token).send().await?;

        if !resp.status().is_success() {
            let (status, body) = http::status_and_body(resp).await;
            return Err(AppError::sheets(status, api_error_message(&body)));
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl SheetsApi for SheetsClient {
    /// Properties of every worksheet.
    async fn list_sheets(&self) -> Result<Vec<SheetProperties>> {
        let mut url = self.endpoint(&[&self.spreadsheet_id])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties");
        let meta: SpreadsheetMeta = self.send_json(self.http.get(url)).await?;
        Ok(meta.sheets.into_iter().map(|s| s.properties).collect())
    }

    /// Add a worksheet with the given grid size.
    async fn add_sheet(&self, title: &str, rows: u32, cols: u32) -> Result<SheetProperties> {
        let replies = self
            .batch_update(vec![requests::add_sheet(title, rows, cols)])
            .await?;

        let properties = replies
            .into_iter()
            .next()
            .and_then(|reply| reply.get("addSheet")?.get("properties").cloned())
            .ok_or_else(|| AppError::sheets(200, format!("addSheet reply missing for {title}")))?;
        Ok(serde_json::from_value(properties)?)
    }

    /// Cells of one column, top to bottom. Blank cells inside the data
    /// come back as empty strings; trailing blanks are dropped.
    async fn column_values(&self, title: &str, column: u32) -> Result<Vec<String>> {
        let letter = column_letter(column);
        let range = format!("{}!{}:{}", quote_sheet(title), letter, letter);
        let mut url = self.endpoint(&[&self.spreadsheet_id, "values", &range])?;
        url.query_pairs_mut()
            .append_pair("majorDimension", "COLUMNS");

        let values: ValueRange = self.send_json(self.http.get(url)).await?;
        let column = values.values.into_iter().next().unwrap_or_default();
        Ok(column.into_iter().map(cell_text).collect())
    }

    /// Append rows after the last non-empty row in one request.
    async fn append_rows(&self, title: &str, rows: &[Vec<String>]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let range = format!("{}!A1:append", quote_sheet(title));
        let mut url = self.endpoint(&[&self.spreadsheet_id, "values", &range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let body = json!({ "majorDimension": "ROWS", "values": rows });
        let _: Value = self.send_json(self.http.post(url).json(&body)).await?;
        log::debug!("Appended {} rows to {}", rows.len(), title);
        Ok(())
    }

    /// Run structural requests; returns one reply per request.
    async fn batch_update(&self, requests: Vec<Value>) -> Result<Vec<Value>> {
        let target = format!("{}:batchUpdate", self.spreadsheet_id);
        let url = self.endpoint(&[&target])?;
        let body = json!({ "requests": requests });
        let resp: BatchUpdateResponse = self.send_json(self.http.post(url).json(&body)).await?;
        Ok(resp.replies)
    }
}

/// Render a cell value as text.
fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Pull `error.message` out of a Google error body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error")?.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Builders for `batchUpdate` request objects.
pub mod requests {
    use serde_json::{Value, json};

    pub fn add_sheet(title: &str, rows: u32, cols: u32) -> Value {
        json!({
            "addSheet": {
                "properties": {
                    "title": title,
                    "gridProperties": { "rowCount": rows, "columnCount": cols }
                }
            }
        })
    }

    /// Basic filter over `A1:{cols}{rows}`.
    pub fn set_basic_filter(sheet_id: i64, rows: u32, cols: u32) -> Value {
        json!({
            "setBasicFilter": {
                "filter": {
                    "range": {
                        "sheetId": sheet_id,
                        "startRowIndex": 0,
                        "endRowIndex": rows,
                        "startColumnIndex": 0,
                        "endColumnIndex": cols
                    }
                }
            }
        })
    }

    pub fn freeze_rows(sheet_id: i64, rows: u32) -> Value {
        json!({
            "updateSheetProperties": {
                "properties": {
                    "sheetId": sheet_id,
                    "gridProperties": { "frozenRowCount": rows }
                },
                "fields": "gridProperties.frozenRowCount"
            }
        })
    }

    /// Bold the first `cols` cells of row 1.
    pub fn bold_header(sheet_id: i64, cols: u32) -> Value {
        json!({
            "repeatCell": {
                "range": {
                    "sheetId": sheet_id,
                    "startRowIndex": 0,
                    "endRowIndex": 1,
                    "startColumnIndex": 0,
                    "endColumnIndex": cols
                },
                "cell": { "userEnteredFormat": { "textFormat": { "bold": true } } },
                "fields": "userEnteredFormat.textFormat.bold"
            }
        })
    }
}
