//! Dry-run sink that prints rows instead of writing them.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Record;
use crate::storage::RecordSink;
use crate::utils::log;

pub struct ConsoleSink {
    label: String,
}

impl ConsoleSink {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait]
impl RecordSink for ConsoleSink {
    fn name(&self) -> &str {
        &self.label
    }

    async fn append_records(&self, records: &[Record]) -> Result<usize> {
        log::info(&format!("[dry-run] {} rows for {}", records.len(), self.label));
        for record in records {
            log::sub_item(&record.to_row().join(" | "));
        }
        Ok(records.len())
    }
}
