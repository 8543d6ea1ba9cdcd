// src/pipeline/records.rs

//! Media to record mapping.

use chrono::{DateTime, Local, Utc};

use crate::models::{LINK_UNAVAILABLE, MediaItem, MediaKind, Record};

/// Render an instant as `YYYY-MM-DD-HH-MM` in local time.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&Local)
        .format("%Y-%m-%d-%H-%M")
        .to_string()
}

/// Public URL of a feed post.
pub fn post_link(code: Option<&str>) -> String {
    match code {
        Some(code) if !code.is_empty() => format!("https://www.instagram.com/p/{code}/"),
        _ => LINK_UNAVAILABLE.to_string(),
    }
}

/// Public URL of a story.
pub fn story_link(username: &str, pk: &str) -> String {
    format!("https://www.instagram.com/stories/{username}/{pk}/")
}

/// One record per item, in input order.
pub fn map_records(
    items: &[MediaItem],
    kind: MediaKind,
    owner_id: &str,
    display_name: &str,
) -> Vec<Record> {
    if items.is_empty() {
        log::info!("User @{} does not have {} data.", display_name, kind);
        return Vec::new();
    }

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let link = match kind {
                MediaKind::Post => post_link(item.code.as_deref()),
                MediaKind::Story => story_link(display_name, &item.pk),
            };
            let formatted_timestamp = format_timestamp(item.taken_at);

            log::debug!(
                "@{} {} #{}: id={} date={} url={}",
                display_name,
                kind,
                i + 1,
                item.id,
                formatted_timestamp,
                link
            );

            Record {
                owner_id: owner_id.to_string(),
                display_name: display_name.to_string(),
                link,
                formatted_timestamp,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use regex::Regex;

    use super::*;

    fn media(pk: &str, code: Option<&str>, minutes_ago: i64) -> MediaItem {
        MediaItem {
            id: format!("{pk}_42"),
            pk: pk.to_string(),
            code: code.map(str::to_string),
            taken_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn one_record_per_item_in_order() {
        let items = vec![
            media("1", Some("AAA"), 5),
            media("2", Some("BBB"), 50),
            media("3", None, 500),
        ];

        let records = map_records(&items, MediaKind::Post, "42", "alice");
        assert_eq!(records.len(), 3);

        let links: Vec<_> = records.iter().map(|r| r.link.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://www.instagram.com/p/AAA/",
                "https://www.instagram.com/p/BBB/",
                LINK_UNAVAILABLE,
            ]
        );
        assert!(records.iter().all(|r| r.owner_id == "42" && r.display_name == "alice"));
    }

    #[test]
    fn timestamps_match_pattern() {
        let pattern = Regex::new(r"^\d{4}-\d{2}-\d{2}-\d{2}-\d{2}$").unwrap();
        let items = vec![media("1", Some("A"), 0), media("2", None, 60 * 24 * 3)];

        for record in map_records(&items, MediaKind::Post, "42", "alice") {
            assert!(
                pattern.is_match(&record.formatted_timestamp),
                "bad timestamp {}",
                record.formatted_timestamp
            );
        }
    }

    #[test]
    fn format_uses_local_time() {
        let instant = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let expected = instant.with_timezone(&Local).format("%Y-%m-%d-%H-%M").to_string();
        assert_eq!(format_timestamp(instant), expected);
    }

    #[test]
    fn empty_code_is_unavailable() {
        assert_eq!(post_link(Some("")), LINK_UNAVAILABLE);
        assert_eq!(post_link(None), LINK_UNAVAILABLE);
        assert_eq!(post_link(Some("Cx1")), "https://www.instagram.com/p/Cx1/");
    }

    #[test]
    fn story_links_use_name_and_pk() {
        let items = vec![media("3301", None, 10), media("3302", Some("ignored"), 20)];
        let records = map_records(&items, MediaKind::Story, "42", "bob");

        assert_eq!(records[0].link, "https://www.instagram.com/stories/bob/3301/");
        assert_eq!(records[1].link, "https://www.instagram.com/stories/bob/3302/");
    }

    #[test]
    fn empty_input_maps_to_nothing() {
        assert!(map_records(&[], MediaKind::Story, "42", "bob").is_empty());
    }
}
