//! Where target names come from and where records go.
//!
//! ```text
//! spreadsheet
//! ├── UserList    # TargetSource: first column, one username per row
//! ├── Posts       # RecordSink: user_id | username | link | datetime
//! └── Stories     # RecordSink: same columns
//! ```

pub mod console;
pub mod sheets;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Record;

// Re-export for convenience
pub use console::ConsoleSink;
pub use sheets::{Workbook, Worksheet};

/// Supplier of target usernames.
#[async_trait]
pub trait TargetSource: Send + Sync {
    /// All target names, in sheet order.
    async fn read_targets(&self) -> Result<Vec<String>>;
}

/// Destination for records of one kind.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Human-readable destination name for logs.
    fn name(&self) -> &str;

    /// Append all records in one write. Returns the number written.
    async fn append_records(&self, records: &[Record]) -> Result<usize>;

    /// Post-write formatting.
    async fn finish(&self) -> Result<()> {
        Ok(())
    }
}
