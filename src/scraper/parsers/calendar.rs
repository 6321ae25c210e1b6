//! Monthly meeting calendar parser for sports.yahoo.co.jp/keiba.
//!
//! Each meeting day links to its race list, e.g. `/keiba/race/list/25050208`,
//! where the trailing digits are the short race id (YY venue meeting day).

use anyhow::Result;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use super::clean_text;

/// One meeting day on the schedule
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Meeting {
    /// Short race id taken from the link; absent when the link carries none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub race_id: Option<String>,
    pub label: String,
    pub href: String,
}

/// Parser for the monthly schedule page
pub struct CalendarParser;

impl CalendarParser {
    /// Meetings in page order, without duplicates
    pub fn parse(html: &str) -> Result<Vec<Meeting>> {
        let document = Html::parse_document(html);
        let mut meetings: Vec<Meeting> = Vec::new();

        let link_selector = Selector::parse("a[href*='/race/list/']").unwrap();
        let race_id_re = Regex::new(r"/race/list/(\d+)").unwrap();

        for elem in document.select(&link_selector) {
            let Some(href) = elem.value().attr("href") else {
                continue;
            };
            if meetings.iter().any(|m| m.href == href) {
                continue;
            }

            let race_id = race_id_re.captures(href).map(|caps| caps[1].to_string());
            if race_id.is_some() && meetings.iter().any(|m| m.race_id == race_id) {
                continue;
            }

            meetings.push(Meeting {
                race_id,
                label: clean_text(&elem.text().collect::<String>()),
                href: href.to_string(),
            });
        }

        Ok(meetings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<table class="hr-tableSchedule">
  <tr>
    <td>11月1日(土)</td>
    <td><a href="/keiba/race/list/25050101">4回東京1日</a></td>
    <td><a href="/keiba/race/list/25080101">3回京都1日</a></td>
  </tr>
  <tr>
    <td>11月2日(日)</td>
    <td><a href="https://sports.yahoo.co.jp/keiba/race/list/25050102">4回東京2日</a></td>
    <td><a href="/keiba/race/list/25050102">4回東京2日</a></td>
    <td><a href="/keiba/race/list/">未定</a></td>
  </tr>
</table>
<a href="/keiba/schedule/monthly?year=2025&month=12">翌月</a>
</body>
</html>"#;

    #[test]
    fn test_parse_calendar() {
        let meetings = CalendarParser::parse(SAMPLE_HTML).unwrap();

        assert_eq!(meetings.len(), 4);
        assert_eq!(meetings[0].race_id.as_deref(), Some("25050101"));
        assert_eq!(meetings[0].label, "4回東京1日");
        assert_eq!(meetings[1].race_id.as_deref(), Some("25080101"));
        assert_eq!(meetings[2].race_id.as_deref(), Some("25050102"));
        assert_eq!(meetings[3].race_id, None);
        assert_eq!(meetings[3].href, "/keiba/race/list/");
    }

    #[test]
    fn test_missing_race_id_is_not_serialized() {
        let meeting = Meeting {
            race_id: None,
            label: "未定".to_string(),
            href: "/keiba/race/list/".to_string(),
        };
        let value = serde_json::to_value(&meeting).unwrap();
        assert!(value.get("race_id").is_none());
    }

    #[test]
    fn test_empty_page() {
        assert!(CalendarParser::parse("<html><body></body></html>").unwrap().is_empty());
    }
}
