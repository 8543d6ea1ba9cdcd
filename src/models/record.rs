//! Flat output record written to the spreadsheet.

use serde::{Deserialize, Serialize};

/// Link placeholder for posts without a short code.
pub const LINK_UNAVAILABLE: &str = "Link unavailable";

/// Header row of newly created output sheets.
pub const RECORD_HEADER: [&str; 4] = ["user_id", "username", "link", "datetime"];

/// One post or story row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    /// Numeric account id of the owner
    pub owner_id: String,

    /// Username the record was fetched for
    pub display_name: String,

    /// Media URL or [`LINK_UNAVAILABLE`]
    pub link: String,

    /// `YYYY-MM-DD-HH-MM`, local time
    pub formatted_timestamp: String,
}

impl Record {
    /// Row cells in sheet column order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.owner_id.clone(),
            self.display_name.clone(),
            self.link.clone(),
            self.formatted_timestamp.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_order_matches_header() {
        let record = Record {
            owner_id: "42".to_string(),
            display_name: "alice".to_string(),
            link: "https://www.instagram.com/p/abc/".to_string(),
            formatted_timestamp: "2026-10-15-09-30".to_string(),
        };

        assert_eq!(
            record.to_row(),
            vec![
                "42",
                "alice",
                "https://www.instagram.com/p/abc/",
                "2026-10-15-09-30"
            ]
        );
        assert_eq!(RECORD_HEADER.len(), record.to_row().len());
    }
}
