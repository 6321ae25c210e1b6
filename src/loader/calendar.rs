//! Monthly calendar loader and race id expansion.

use serde::Serialize;
use tracing::{info, warn};

use super::Scraper;
use crate::error::ScrapeError;
use crate::scraper::parsers::parse_records;
use crate::scraper::{calendar_url, FetchProfile, Record, Target};

/// Races held on any meeting day of the month
const RACES_PER_MEETING: u32 = 12;

/// Short calendar ids: YY + venue + meeting + day
const SHORT_ID_LEN: usize = 8;

/// Expanded race ids for a month
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RaceList {
    pub race_ids: Vec<String>,
    /// Calendar items dropped for a missing or malformed race id
    pub skipped: usize,
}

pub struct CalendarLoader<'a> {
    scraper: &'a Scraper,
    year: i32,
    month: u32,
}

impl<'a> CalendarLoader<'a> {
    pub fn new(scraper: &'a Scraper, year: i32, month: u32) -> Self {
        Self { scraper, year, month }
    }

    pub fn url(&self) -> String {
        calendar_url(&self.scraper.sources().calendar, self.year, self.month)
    }

    pub async fn load(&self) -> Result<RaceList, ScrapeError> {
        let url = self.url();
        info!("Loading calendar {}", url);

        let content = self.scraper.fetcher().fetch(&url, FetchProfile::Bare).await?;
        self.scraper
            .write_snapshot(&format!("calendar_{}_{}.html", self.year, self.month), &content);

        let label = format!("{}-{:02}", self.year, self.month);
        let meetings = parse_records(Target::Calendar, &content, Some(&label))?;
        let list = expand_race_ids(&meetings);

        info!(
            "Calendar {}: {} meetings, {} race ids, {} skipped",
            label,
            meetings.len(),
            list.race_ids.len(),
            list.skipped
        );
        Ok(list)
    }
}

/// Expand 8-character meeting ids into the twelve race ids of each meeting
pub fn expand_race_ids(items: &[Record]) -> RaceList {
    let mut list = RaceList::default();

    for item in items {
        let race_id = match item.get("race_id").and_then(|v| v.as_str()) {
            Some(id) if !id.is_empty() => id,
            _ => {
                warn!("Calendar item has no race_id, skipping: {:?}", item);
                list.skipped += 1;
                continue;
            }
        };

        if race_id.chars().count() != SHORT_ID_LEN {
            warn!(
                "Calendar race_id {} has invalid length ({}), skipping",
                race_id,
                race_id.chars().count()
            );
            list.skipped += 1;
            continue;
        }

        list.race_ids
            .extend((1..=RACES_PER_MEETING).map(|n| format!("20{}{:02}", race_id, n)));
    }

    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_expand_one_meeting() {
        let list = expand_race_ids(&[item(json!({"race_id": "25102601"}))]);
        assert_eq!(list.race_ids.len(), 12);
        assert_eq!(list.race_ids[0], "202510260101");
        assert_eq!(list.race_ids[11], "202510260112");
        assert_eq!(list.skipped, 0);

        for (n, race_id) in list.race_ids.iter().enumerate() {
            assert_eq!(race_id.len(), 12);
            assert!(race_id.starts_with("2025102601"));
            assert_eq!(&race_id[10..], format!("{:02}", n + 1));
        }
    }

    #[test]
    fn test_expand_keeps_order() {
        let list = expand_race_ids(&[
            item(json!({"race_id": "25050101"})),
            item(json!({"race_id": "25080101"})),
        ]);
        assert_eq!(list.race_ids.len(), 24);
        assert_eq!(list.race_ids[0], "202505010101");
        assert_eq!(list.race_ids[11], "202505010112");
        assert_eq!(list.race_ids[12], "202508010101");
        assert_eq!(list.race_ids[23], "202508010112");
        assert!(list.race_ids.iter().all(|id| id.len() == 12));
    }

    #[test]
    fn test_malformed_items_are_skipped() {
        let list = expand_race_ids(&[
            item(json!({"label": "未定"})),
            item(json!({"race_id": ""})),
            item(json!({"race_id": 25102601})),
            item(json!({"race_id": "2510260"})),
            item(json!({"race_id": "251026011"})),
            item(json!({"race_id": "25102601"})),
        ]);
        assert_eq!(list.skipped, 5);
        assert_eq!(list.race_ids.len(), 12);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(expand_race_ids(&[]), RaceList::default());
    }
}
