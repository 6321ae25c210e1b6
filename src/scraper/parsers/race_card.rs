//! Race card (shutuba) parser for race.netkeiba.com.

use anyhow::Result;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use super::clean_text;

/// Race information
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RaceInfo {
    pub race_id: String,
    pub race_name: String,
    pub race_number: u8,
    pub racecourse: String,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub distance: u32,
    pub surface: String,         // "turf", "dirt" or "obstacle"
    pub direction: Option<String>,
    pub weather: Option<String>,
    pub track_condition: Option<String>, // "良", "稍重", "重", "不良"
    pub grade: Option<String>,   // "G1", "G2", "G3", "L", "OP"
}

/// Entry in race card
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RaceEntry {
    pub race_id: String,
    pub bracket: Option<u8>,
    pub post_position: u8,
    pub horse_id: String,
    pub horse_name: String,
    pub horse_age: Option<u8>,
    pub horse_sex: Option<String>, // "牡", "牝", "セ"
    pub weight_carried: Option<f64>,
    pub horse_weight: Option<u32>,
    pub weight_change: Option<i32>,
    pub jockey_id: Option<String>,
    pub jockey_name: Option<String>,
    pub trainer_id: Option<String>,
    pub trainer_name: Option<String>,
    pub win_odds: Option<f64>,
    pub popularity: Option<u8>,
}

/// Parser for race card pages
pub struct RaceCardParser;

impl RaceCardParser {
    /// Parse the race header. Fails when the page has no race name.
    pub fn parse_race(html: &str, race_id: &str) -> Result<RaceInfo> {
        let document = Html::parse_document(html);
        let mut info = RaceInfo {
            race_id: race_id.to_string(),
            ..Default::default()
        };

        let name_selector = Selector::parse(".RaceName").unwrap();
        info.race_name = document
            .select(&name_selector)
            .next()
            .map(|elem| clean_text(&elem.text().collect::<String>()))
            .unwrap_or_default();
        if info.race_name.is_empty() {
            anyhow::bail!("race name not found");
        }

        // Race number
        if let Ok(selector) = Selector::parse(".RaceNum") {
            if let Some(elem) = document.select(&selector).next() {
                let text = elem.text().collect::<String>();
                let re = Regex::new(r"(\d+)\s*R").unwrap();
                if let Some(caps) = re.captures(&text) {
                    info.race_number = caps[1].parse().unwrap_or(0);
                }
            }
        }
        if info.race_number == 0 {
            info.race_number = race_number_from_id(race_id).unwrap_or(0);
        }

        // RaceData01: "15:25発走 / 芝2500m (右) / 天候:晴 / 馬場:良"
        if let Ok(selector) = Selector::parse(".RaceData01") {
            if let Some(elem) = document.select(&selector).next() {
                let text = elem.text().collect::<String>();

                let time_re = Regex::new(r"(\d{1,2}:\d{2})発走").unwrap();
                if let Some(caps) = time_re.captures(&text) {
                    info.start_time = Some(caps[1].to_string());
                }

                let dist_re = Regex::new(r"(芝|ダ|障)(\d+)m").unwrap();
                if let Some(caps) = dist_re.captures(&text) {
                    info.surface = surface_name(&caps[1]).to_string();
                    info.distance = caps[2].parse().unwrap_or(0);
                }

                let direction_re = Regex::new(r"\((右|左|直線)").unwrap();
                if let Some(caps) = direction_re.captures(&text) {
                    info.direction = Some(caps[1].to_string());
                }

                let weather_re = Regex::new(r"天候\s*[:：]\s*(\S+?)(?:\s|/|$)").unwrap();
                if let Some(caps) = weather_re.captures(&text) {
                    info.weather = Some(caps[1].to_string());
                }

                let condition_re = Regex::new(r"馬場\s*[:：]\s*(良|稍重|重|不良)").unwrap();
                if let Some(caps) = condition_re.captures(&text) {
                    info.track_condition = Some(caps[1].to_string());
                }

                let date_re = Regex::new(r"(\d{4})/(\d{1,2})/(\d{1,2})").unwrap();
                if let Some(caps) = date_re.captures(&text) {
                    info.date = Some(format_date(&caps[1], &caps[2], &caps[3]));
                }
            }
        }

        // Racecourse from RaceData02: "5回 中山 8日目"
        if let Ok(selector) = Selector::parse(".RaceData02 span") {
            let re = Regex::new(r"^\D+$").unwrap();
            for elem in document.select(&selector).skip(1).take(1) {
                let text = clean_text(&elem.text().collect::<String>());
                if re.is_match(&text) {
                    info.racecourse = text;
                }
            }
        }

        // Date from the selected day tab: <dd class="Active"><a ...?kaisai_date=20241222>
        if info.date.is_none() {
            if let Ok(selector) = Selector::parse("dd.Active a[href*='kaisai_date='], #RaceList_DateList .Active a") {
                let re = Regex::new(r"kaisai_date=(\d{4})(\d{2})(\d{2})").unwrap();
                for elem in document.select(&selector) {
                    if let Some(caps) = elem.value().attr("href").and_then(|h| re.captures(h)) {
                        info.date = Some(format_date(&caps[1], &caps[2], &caps[3]));
                        break;
                    }
                }
            }
        }

        info.grade = grade_from_icon(&document).or_else(|| extract_grade(&info.race_name));

        Ok(info)
    }

    /// Parse the entry table. Fails when the page has no entry table.
    pub fn parse_entries(html: &str, race_id: &str) -> Result<Vec<RaceEntry>> {
        let document = Html::parse_document(html);

        // Try multiple table selectors
        let table_selectors = [".Shutuba_Table", "table.ShutubaTable", ".RaceTable01"];
        let mut table = None;

        for sel_str in table_selectors {
            if let Ok(selector) = Selector::parse(sel_str) {
                if let Some(t) = document.select(&selector).next() {
                    table = Some(t);
                    break;
                }
            }
        }

        let Some(table_elem) = table else {
            anyhow::bail!("entry table not found");
        };

        let row_selector = Selector::parse("tr.HorseList, tbody tr").unwrap();
        let mut entries: Vec<RaceEntry> = Vec::new();

        for row in table_elem.select(&row_selector) {
            if let Some(entry) = Self::parse_entry_row(&row, race_id) {
                if !entries.iter().any(|e| e.post_position == entry.post_position) {
                    entries.push(entry);
                }
            }
        }

        Ok(entries)
    }

    fn parse_entry_row(row: &ElementRef, race_id: &str) -> Option<RaceEntry> {
        let td_selector = Selector::parse("td").unwrap();
        let cells: Vec<_> = row.select(&td_selector).collect();

        if cells.len() < 4 {
            return None;
        }

        let mut entry = RaceEntry {
            race_id: race_id.to_string(),
            ..Default::default()
        };

        // Bracket (枠番)
        if let Ok(sel) = Selector::parse("td[class^='Waku'], td:nth-child(1)") {
            if let Some(elem) = row.select(&sel).next() {
                entry.bracket = elem.text().collect::<String>().trim().parse().ok();
            }
        }

        // Post position (馬番)
        if let Ok(sel) = Selector::parse("td[class^='Umaban'], td:nth-child(2)") {
            if let Some(elem) = row.select(&sel).next() {
                let text = elem.text().collect::<String>();
                entry.post_position = text.trim().parse().unwrap_or(0);
            }
        }

        // Horse ID and name
        if let Some((id, name)) = linked_id(row, "a[href*='/horse/']", r"/horse/(\d+)") {
            entry.horse_id = id;
            entry.horse_name = name;
        }

        // Sex and age
        if let Ok(sel) = Selector::parse("td.Barei, td:nth-child(5)") {
            if let Some(elem) = row.select(&sel).next() {
                let text = elem.text().collect::<String>();
                let re = Regex::new(r"([牡牝セ])(\d+)").unwrap();
                if let Some(caps) = re.captures(&text) {
                    entry.horse_sex = Some(caps[1].to_string());
                    entry.horse_age = caps[2].parse().ok();
                }
            }
        }

        // Weight carried (斤量)
        if let Ok(sel) = Selector::parse("td.Barei + td, td:nth-child(6)") {
            if let Some(elem) = row.select(&sel).next() {
                let text = elem.text().collect::<String>();
                let re = Regex::new(r"(\d+(?:\.\d+)?)").unwrap();
                if let Some(caps) = re.captures(&text) {
                    entry.weight_carried = caps[1].parse().ok();
                }
            }
        }

        if let Some((id, name)) = linked_id(row, "a[href*='/jockey/']", r"/jockey/(?:result/recent/)?(\d+)") {
            entry.jockey_id = Some(id);
            entry.jockey_name = Some(name);
        }

        if let Some((id, name)) = linked_id(row, "a[href*='/trainer/']", r"/trainer/(?:result/recent/)?(\d+)") {
            entry.trainer_id = Some(id);
            entry.trainer_name = Some(name);
        }

        // Horse weight: 480(+4)
        if let Ok(sel) = Selector::parse("td.Weight") {
            if let Some(elem) = row.select(&sel).next() {
                let text = elem.text().collect::<String>();
                let re = Regex::new(r"(\d+)(?:\s*\(([+-]?\d+)\))?").unwrap();
                if let Some(caps) = re.captures(&text) {
                    entry.horse_weight = caps.get(1).and_then(|m| m.as_str().parse().ok());
                    entry.weight_change = caps.get(2).and_then(|m| m.as_str().parse().ok());
                }
            }
        }

        // Win odds and popularity are filled in by script on live pages
        if let Ok(sel) = Selector::parse("span[id^='odds-']") {
            if let Some(elem) = row.select(&sel).next() {
                entry.win_odds = elem.text().collect::<String>().trim().parse().ok();
            }
        }
        if let Ok(sel) = Selector::parse("span[id^='ninki-']") {
            if let Some(elem) = row.select(&sel).next() {
                entry.popularity = elem.text().collect::<String>().trim().parse().ok();
            }
        }

        if entry.horse_id.is_empty() || entry.post_position == 0 {
            return None;
        }

        Some(entry)
    }
}

/// Grade icon on the race card: <span class="Icon_GradeType Icon_GradeType1">
fn grade_from_icon(document: &Html) -> Option<String> {
    let selector = Selector::parse(".RaceName [class*='Icon_GradeType']").ok()?;
    let re = Regex::new(r"Icon_GradeType(\d+)").unwrap();
    for elem in document.select(&selector) {
        let class = elem.value().attr("class").unwrap_or("");
        for caps in re.captures_iter(class) {
            let grade = match &caps[1] {
                "1" => "G1",
                "2" => "G2",
                "3" => "G3",
                "5" => "OP",
                "15" => "L",
                _ => continue,
            };
            return Some(grade.to_string());
        }
    }
    None
}

/// Extract race grade from text
pub fn extract_grade(text: &str) -> Option<String> {
    // Roman numerals: check GIII before GII before GI
    if text.contains("GIII") || text.contains("GⅢ") || text.contains("G3") || text.contains("Ｇ３") {
        return Some("G3".to_string());
    }
    if text.contains("GII") || text.contains("GⅡ") || text.contains("G2") || text.contains("Ｇ２") {
        return Some("G2".to_string());
    }
    if text.contains("GI") || text.contains("GⅠ") || text.contains("G1") || text.contains("Ｇ１") {
        return Some("G1".to_string());
    }
    if text.contains("(L)") || text.contains("（L）") || text.contains("(Ｌ)") {
        return Some("L".to_string());
    }
    if text.contains("オープン") || text.contains("OP") {
        return Some("OP".to_string());
    }
    None
}

/// First link matching `css` in `scope`, as (id captured by `id_pattern`, link text)
pub(crate) fn linked_id(scope: &ElementRef, css: &str, id_pattern: &str) -> Option<(String, String)> {
    let selector = Selector::parse(css).ok()?;
    let re = Regex::new(id_pattern).ok()?;
    let elem = scope.select(&selector).next()?;
    let href = elem.value().attr("href")?;
    let caps = re.captures(href)?;
    Some((caps[1].to_string(), clean_text(&elem.text().collect::<String>())))
}

pub(crate) fn surface_name(mark: &str) -> &'static str {
    if mark.starts_with('芝') {
        "turf"
    } else if mark.starts_with('障') {
        "obstacle"
    } else {
        "dirt"
    }
}

pub(crate) fn format_date(year: &str, month: &str, day: &str) -> String {
    format!(
        "{}-{:02}-{:02}",
        year,
        month.parse::<u32>().unwrap_or(1),
        day.parse::<u32>().unwrap_or(1)
    )
}

/// Race id format: YYYY VV KK DD RR (year, venue, meeting, day, race)
pub(crate) fn race_number_from_id(race_id: &str) -> Option<u8> {
    if race_id.len() != 12 {
        return None;
    }
    race_id.get(10..12)?.parse().ok()
}
