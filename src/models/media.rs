//! Media items returned by the Instagram API.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Kind of media a record was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Feed post or reel
    Post,
    Story,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Post => write!(f, "post"),
            MediaKind::Story => write!(f, "story"),
        }
    }
}

/// Anything carrying a creation instant.
pub trait Timestamped {
    fn taken_at(&self) -> DateTime<Utc>;
}

/// A post, reel or story belonging to one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Full media id (`{pk}_{owner}`)
    pub id: String,

    /// Owner-scoped media primary key
    pub pk: String,

    /// Short code used in `/p/{code}/` links (posts only)
    pub code: Option<String>,

    pub taken_at: DateTime<Utc>,
}

impl Timestamped for MediaItem {
    fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }
}

/// Media item as it arrives on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMediaItem {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub pk: Option<String>,

    #[serde(default)]
    pub code: Option<String>,

    /// Unix seconds
    #[serde(default)]
    pub taken_at: Option<i64>,
}

impl RawMediaItem {
    /// Convert into a [`MediaItem`].
    ///
    /// Returns `None` when the item has no usable creation instant or no
    /// identifier at all.
    pub fn into_media(self) -> Option<MediaItem> {
        let taken_at = DateTime::from_timestamp(self.taken_at?, 0)?;
        let pk = match (&self.pk, &self.id) {
            (Some(pk), _) => pk.clone(),
            (None, Some(id)) => id.split('_').next().unwrap_or(id).to_string(),
            (None, None) => return None,
        };
        let id = self.id.unwrap_or_else(|| pk.clone());
        Some(MediaItem {
            id,
            pk,
            code: self.code.filter(|c| !c.is_empty()),
            taken_at,
        })
    }
}

/// Convert a batch of raw items, skipping malformed ones.
pub fn collect_media(raw: Vec<RawMediaItem>, kind: MediaKind) -> Vec<MediaItem> {
    raw.into_iter()
        .filter_map(|item| {
            let label = item.id.clone().or_else(|| item.pk.clone());
            let media = item.into_media();
            if media.is_none() {
                log::warn!(
                    "Skipping {} {} without creation time",
                    kind,
                    label.as_deref().unwrap_or("<no id>")
                );
            }
            media
        })
        .collect()
}

/// Accept ids sent either as JSON strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
