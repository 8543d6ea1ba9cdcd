//! Worksheet-backed target source and record sinks.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{RECORD_HEADER, Record, SheetsConfig};
use crate::services::{SheetProperties, SheetsApi, SheetsClient, requests};
use crate::storage::{RecordSink, TargetSource};
use crate::utils::a1_range;

/// One tab of the spreadsheet.
pub struct Worksheet {
    client: Arc<dyn SheetsApi>,
    properties: SheetProperties,
}

impl Worksheet {
    pub fn new(client: Arc<dyn SheetsApi>, properties: SheetProperties) -> Self {
        Self { client, properties }
    }

    /// Use the tab named `title` from `existing`. Never creates anything.
    pub fn open_existing(
        client: Arc<dyn SheetsApi>,
        existing: &[SheetProperties],
        title: &str,
    ) -> Result<Self> {
        existing
            .iter()
            .find(|s| s.title == title)
            .map(|properties| Self::new(client, properties.clone()))
            .ok_or_else(|| AppError::not_found(format!("worksheet {title}")))
    }

    /// Use the tab named `title` from `existing`, or add a `rows × cols` tab.
    ///
    /// A newly added tab gets `header` as its first row.
    pub async fn open_or_create(
        client: Arc<dyn SheetsApi>,
        existing: &[SheetProperties],
        title: &str,
        rows: u32,
        cols: u32,
        header: &[&str],
    ) -> Result<Self> {
        if let Some(properties) = existing.iter().find(|s| s.title == title) {
            log::debug!("Using existing worksheet {}", title);
            return Ok(Self::new(client, properties.clone()));
        }

        log::info!("Creating worksheet {} ({}x{})", title, rows, cols);
        let properties = client.add_sheet(title, rows, cols).await?;
        let row: Vec<String> = header.iter().map(|h| h.to_string()).collect();
        client.append_rows(title, &[row]).await?;
        Ok(Self::new(client, properties))
    }

    pub fn title(&self) -> &str {
        &self.properties.title
    }

    pub fn sheet_id(&self) -> i64 {
        self.properties.sheet_id
    }

    /// Re-read the grid size; appends can grow it.
    async fn current_properties(&self) -> Result<SheetProperties> {
        Ok(self
            .client
            .find_sheet(self.title())
            .await?
            .unwrap_or_else(|| self.properties.clone()))
    }

    /// Freeze row 1 and make it bold.
    pub async fn format_header(&self) -> Result<()> {
        let properties = self.current_properties().await?;
        let cols = properties.grid_properties.column_count.max(1);
        self.client
            .batch_update(vec![
                requests::freeze_rows(self.sheet_id(), 1),
                requests::bold_header(self.sheet_id(), cols),
            ])
            .await?;
        Ok(())
    }

    /// Put a basic filter over the whole grid. Returns the A1 range used.
    pub async fn add_filter(&self) -> Result<String> {
        let grid = self.current_properties().await?.grid_properties;
        let rows = grid.row_count.max(1);
        let cols = grid.column_count.max(1);
        let range = a1_range(cols, rows);

        self.client
            .batch_update(vec![requests::set_basic_filter(self.sheet_id(), rows, cols)])
            .await?;
        log::debug!("Filter set on {}!{}", self.title(), range);
        Ok(range)
    }
}

#[async_trait]
impl TargetSource for Worksheet {
    async fn read_targets(&self) -> Result<Vec<String>> {
        self.client.column_values(self.title(), 1).await
    }
}

#[async_trait]
impl RecordSink for Worksheet {
    fn name(&self) -> &str {
        self.title()
    }

    async fn append_records(&self, records: &[Record]) -> Result<usize> {
        let rows: Vec<Vec<String>> = records.iter().map(Record::to_row).collect();
        self.client.append_rows(self.title(), &rows).await?;
        Ok(rows.len())
    }

    async fn finish(&self) -> Result<()> {
        self.add_filter().await?;
        self.format_header().await
    }
}

/// The three worksheets a writing run touches.
pub struct Workbook {
    pub targets: Worksheet,
    pub posts: Worksheet,
    pub stories: Worksheet,
}

impl Workbook {
    /// Sheets client for the configured spreadsheet. Reads the key file only.
    pub fn connect(config: &SheetsConfig) -> Result<Arc<dyn SheetsApi>> {
        Ok(Arc::new(SheetsClient::from_config(config)?))
    }

    /// Open the input tab alone, read-only.
    pub async fn open_targets(
        client: Arc<dyn SheetsApi>,
        config: &SheetsConfig,
    ) -> Result<Worksheet> {
        let existing = client.list_sheets().await?;
        Worksheet::open_existing(client, &existing, &config.targets_sheet)
    }

    /// Open the input tab and make sure both output tabs exist.
    pub async fn open(client: Arc<dyn SheetsApi>, config: &SheetsConfig) -> Result<Self> {
        let existing = client.list_sheets().await?;
        let (rows, cols) = (config.new_sheet_rows, config.new_sheet_cols);

        let targets =
            Worksheet::open_existing(Arc::clone(&client), &existing, &config.targets_sheet)?;
        let posts = Worksheet::open_or_create(
            Arc::clone(&client),
            &existing,
            &config.posts_sheet,
            rows,
            cols,
            &RECORD_HEADER,
        )
        .await?;
        let stories = Worksheet::open_or_create(
            client,
            &existing,
            &config.stories_sheet,
            rows,
            cols,
            &RECORD_HEADER,
        )
        .await?;

        Ok(Self {
            targets,
            posts,
            stories,
        })
    }
}
