//! HTML and JSON parsers for netkeiba.com data.
//!
//! The loaders do not call the parsers directly: they go through
//! [`parse`], which picks a strategy from the content kind and target and
//! attributes any failure to the entity being loaded.

pub mod calendar;
pub mod horse;
pub mod odds;
pub mod race_card;
pub mod race_result;

pub use calendar::{CalendarParser, Meeting};
pub use horse::{HorseParser, HorseProfile, PastRace};
pub use odds::{OddsParser, WinOdds};
pub use race_card::{RaceCardParser, RaceEntry, RaceInfo};
pub use race_result::{RaceResultParser, ResultEntry, ResultInfo};

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::error::ScrapeError;

/// Opaque structured record handed back to callers
pub type Record = serde_json::Map<String, Value>;

/// Parsing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Json,
}

/// What to extract from a fetched document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Race header of a race card
    Race,
    /// Entry table of a race card
    Entry,
    /// Race header of a result page
    RaceDb,
    /// Result table of a result page
    Result,
    /// Win odds from the odds API
    Odds,
    /// Horse profile
    Horse,
    /// Horse race history
    History,
    /// Meetings on the monthly schedule
    Calendar,
}

impl Target {
    pub fn name(&self) -> &'static str {
        match self {
            Target::Race => "race",
            Target::Entry => "entry",
            Target::RaceDb => "race_db",
            Target::Result => "result",
            Target::Odds => "odds",
            Target::Horse => "horse",
            Target::History => "history",
            Target::Calendar => "calendar",
        }
    }

    pub fn content_kind(&self) -> ContentKind {
        match self {
            Target::Odds => ContentKind::Json,
            _ => ContentKind::Html,
        }
    }

    /// Whether the target yields a list of records
    pub fn is_many(&self) -> bool {
        matches!(
            self,
            Target::Entry | Target::Result | Target::Odds | Target::History | Target::Calendar
        )
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parser output
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    One(Record),
    Many(Vec<Record>),
}

impl Parsed {
    pub fn len(&self) -> usize {
        match self {
            Parsed::One(_) => 1,
            Parsed::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse `content` for `target` using the `kind` strategy
pub fn parse(
    kind: ContentKind,
    target: Target,
    content: &str,
    entity_id: Option<&str>,
) -> Result<Parsed, ScrapeError> {
    if target.content_kind() != kind {
        return Err(ScrapeError::parse(
            target,
            entity_id,
            anyhow::anyhow!("{} data is not extracted from {:?} content", target, kind),
        ));
    }

    dispatch(target, content, entity_id.unwrap_or_default())
        .map_err(|e| ScrapeError::parse(target, entity_id, e))
}

pub fn parse_html(target: Target, content: &str, entity_id: Option<&str>) -> Result<Parsed, ScrapeError> {
    parse(ContentKind::Html, target, content, entity_id)
}

pub fn parse_json(target: Target, content: &str, entity_id: Option<&str>) -> Result<Parsed, ScrapeError> {
    parse(ContentKind::Json, target, content, entity_id)
}

/// Parse a single-record target
pub fn parse_record(target: Target, content: &str, entity_id: Option<&str>) -> Result<Record, ScrapeError> {
    match parse(target.content_kind(), target, content, entity_id)? {
        Parsed::One(record) => Ok(record),
        Parsed::Many(_) => Err(ScrapeError::parse(
            target,
            entity_id,
            anyhow::anyhow!("expected a single {} record", target),
        )),
    }
}

/// Parse a list target
pub fn parse_records(target: Target, content: &str, entity_id: Option<&str>) -> Result<Vec<Record>, ScrapeError> {
    match parse(target.content_kind(), target, content, entity_id)? {
        Parsed::Many(records) => Ok(records),
        Parsed::One(_) => Err(ScrapeError::parse(
            target,
            entity_id,
            anyhow::anyhow!("expected a list of {} records", target),
        )),
    }
}

fn dispatch(target: Target, content: &str, entity_id: &str) -> anyhow::Result<Parsed> {
    match target {
        Target::Race => one(&RaceCardParser::parse_race(content, entity_id)?),
        Target::Entry => many(&RaceCardParser::parse_entries(content, entity_id)?),
        Target::RaceDb => one(&RaceResultParser::parse_race(content, entity_id)?),
        Target::Result => many(&RaceResultParser::parse_results(content, entity_id)?),
        Target::Odds => many(&OddsParser::parse_win(content, entity_id)?),
        Target::Horse => one(&HorseParser::parse_profile(content, entity_id)?),
        Target::History => many(&HorseParser::parse_history(content, entity_id)?),
        Target::Calendar => many(&CalendarParser::parse(content)?),
    }
}

fn one<T: Serialize>(value: &T) -> anyhow::Result<Parsed> {
    Ok(Parsed::One(to_record(value)?))
}

fn many<T: Serialize>(values: &[T]) -> anyhow::Result<Parsed> {
    let records = values.iter().map(to_record).collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Parsed::Many(records))
}

/// Serialize a parsed struct into an opaque record
pub fn to_record<T: Serialize>(value: &T) -> anyhow::Result<Record> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("expected an object, got {}", other),
    }
}

/// Collapse whitespace runs and trim
pub(crate) fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ODDS_JSON: &str = r#"{
        "status": "result",
        "data": {
            "official_datetime": "2024-12-22 15:25:00",
            "odds": {"1": {"01": ["2.1", "", "1"], "02": ["15.3", "", "5"]}}
        }
    }"#;

    #[test]
    fn test_target_kinds() {
        assert_eq!(Target::Odds.content_kind(), ContentKind::Json);
        assert_eq!(Target::Race.content_kind(), ContentKind::Html);
        assert_eq!(Target::Calendar.content_kind(), ContentKind::Html);
        assert!(Target::Entry.is_many());
        assert!(!Target::Horse.is_many());
        assert_eq!(Target::RaceDb.to_string(), "race_db");
    }

    #[test]
    fn test_parse_json_odds() {
        let parsed = parse_json(Target::Odds, ODDS_JSON, Some("202406050811")).unwrap();
        let Parsed::Many(records) = parsed else {
            panic!("odds should be a list");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["horse_number"], 1);
        assert_eq!(records[0]["race_id"], "202406050811");
    }

    #[test]
    fn test_kind_mismatch_is_parse_error() {
        let err = parse_html(Target::Odds, ODDS_JSON, Some("202406050811")).unwrap_err();
        match err {
            ScrapeError::Parse { target, entity_id, .. } => {
                assert_eq!(target, Target::Odds);
                assert_eq!(entity_id.as_deref(), Some("202406050811"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_failure_attributed_to_entity() {
        let err = parse_record(Target::Race, "<html><body></body></html>", Some("202406050811"))
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { target: Target::Race, .. }));
        assert_eq!(err.to_string(), "failed to parse race data for 202406050811");
    }

    #[test]
    fn test_shape_mismatch() {
        let err = parse_records(Target::Horse, "<h1>x</h1>", Some("1")).unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { .. }));
    }

    #[test]
    fn test_to_record_rejects_scalars() {
        assert!(to_record(&42).is_err());
        assert!(to_record(&WinOdds::default()).is_ok());
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  有馬記念 \n  (G1) "), "有馬記念 (G1)");
    }
}
