//! Race result parser for db.netkeiba.com
//!
//! Parses result pages into the race header and the finishing order.
//! URL: https://db.netkeiba.com/race/RACEID/

use anyhow::Result;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use super::clean_text;
use super::race_card::{extract_grade, format_date, linked_id, race_number_from_id, surface_name};

/// Race header from a result page
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResultInfo {
    pub race_id: String,
    pub race_name: String,
    pub race_number: u8,
    pub racecourse: String,
    pub date: Option<String>,
    pub distance: u32,
    pub surface: String,
    pub direction: Option<String>,
    pub weather: Option<String>,
    pub track_condition: Option<String>,
    pub start_time: Option<String>,
    pub grade: Option<String>,
}

/// One finisher (or non-finisher) in a result table
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResultEntry {
    pub race_id: String,
    /// None for scratched / withdrawn / did not finish
    pub finish_position: Option<u8>,
    pub status: Option<String>,
    pub bracket: Option<u8>,
    pub post_position: u8,
    pub horse_id: String,
    pub horse_name: String,
    pub horse_sex: Option<String>,
    pub horse_age: Option<u8>,
    pub weight_carried: Option<f64>,
    pub jockey_id: Option<String>,
    pub jockey_name: Option<String>,
    /// Seconds
    pub finish_time: Option<f64>,
    pub margin: Option<String>,
    pub passing: Option<String>,
    pub last_3f: Option<f64>,
    pub win_odds: Option<f64>,
    pub popularity: Option<u8>,
    pub horse_weight: Option<u32>,
    pub weight_change: Option<i32>,
    pub trainer_id: Option<String>,
    pub trainer_name: Option<String>,
}

/// Parser for race result pages
pub struct RaceResultParser;

impl RaceResultParser {
    /// Parse the race header. Fails when the page has no race name.
    pub fn parse_race(html: &str, race_id: &str) -> Result<ResultInfo> {
        let document = Html::parse_document(html);
        let mut info = ResultInfo {
            race_id: race_id.to_string(),
            ..Default::default()
        };

        // <dl class="racedata"><dt>11 R</dt><dd><h1>Race Name</h1><p><span>芝右2500m / 天候 : 晴 / 芝 : 良 / 発走 : 15:40</span></p></dd></dl>
        for selector_str in ["dl.racedata h1", ".racedata h1", ".RaceName"] {
            if let Ok(selector) = Selector::parse(selector_str) {
                if let Some(elem) = document.select(&selector).next() {
                    let text = clean_text(&elem.text().collect::<String>());
                    if !text.is_empty() {
                        info.race_name = text;
                        break;
                    }
                }
            }
        }
        if info.race_name.is_empty() {
            anyhow::bail!("race name not found");
        }
        info.grade = extract_grade(&info.race_name);

        let mut full_text = String::new();
        for selector_str in ["dl.racedata", ".data_intro", ".smalltxt", "p.smalltxt"] {
            if let Ok(selector) = Selector::parse(selector_str) {
                for elem in document.select(&selector) {
                    full_text.push_str(&elem.text().collect::<String>());
                    full_text.push(' ');
                }
            }
        }

        let date_re = Regex::new(r"(\d{4})年(\d{1,2})月(\d{1,2})日").unwrap();
        if let Some(caps) = date_re.captures(&full_text) {
            info.date = Some(format_date(&caps[1], &caps[2], &caps[3]));
        }

        // 芝右2500m, ダ左1800m, 芝右 外2200m, 障芝3570m
        let dist_re = Regex::new(r"(芝|ダ|障)(?:ート)?\s*(右|左|直線)?[^\d\s/]*\s*(\d{3,4})\s*m").unwrap();
        if let Some(caps) = dist_re.captures(&full_text) {
            info.surface = surface_name(&caps[1]).to_string();
            info.direction = caps.get(2).map(|m| m.as_str().to_string());
            info.distance = caps[3].parse().unwrap_or(0);
        }

        let race_num_re = Regex::new(r"(\d+)\s*R").unwrap();
        if let Some(caps) = race_num_re.captures(&full_text) {
            info.race_number = caps[1].parse().unwrap_or(0);
        }
        if info.race_number == 0 {
            info.race_number = race_number_from_id(race_id).unwrap_or(0);
        }

        // "5回中山8日目"
        let racecourse_re = Regex::new(r"(札幌|函館|福島|新潟|中山|東京|中京|京都|阪神|小倉)").unwrap();
        if let Some(caps) = racecourse_re.captures(&full_text) {
            info.racecourse = caps[1].to_string();
        }

        let condition_re = Regex::new(r"(?:芝|ダート?)\s*[:：]\s*(良|稍重|重|不良)").unwrap();
        if let Some(caps) = condition_re.captures(&full_text) {
            info.track_condition = Some(caps[1].to_string());
        }

        let weather_re = Regex::new(r"天候\s*[:：]\s*(晴|曇|小雨|雨|小雪|雪)").unwrap();
        if let Some(caps) = weather_re.captures(&full_text) {
            info.weather = Some(caps[1].to_string());
        }

        let start_re = Regex::new(r"発走\s*[:：]\s*(\d{1,2}:\d{2})").unwrap();
        if let Some(caps) = start_re.captures(&full_text) {
            info.start_time = Some(caps[1].to_string());
        }

        Ok(info)
    }

    /// Parse the result table. Fails when the page has no result table.
    pub fn parse_results(html: &str, race_id: &str) -> Result<Vec<ResultEntry>> {
        let document = Html::parse_document(html);

        let table_selectors = [
            "table.race_table_01",
            "table.ResultTableWrap",
            "table[summary*='レース結果']",
            "table.nk_tb_common",
        ];

        let mut table = None;
        for sel_str in table_selectors {
            if let Ok(selector) = Selector::parse(sel_str) {
                if let Some(t) = document.select(&selector).next() {
                    let text = t.text().collect::<String>();
                    if text.contains("着順") || text.contains("馬名") {
                        table = Some(t);
                        break;
                    }
                }
            }
        }

        let Some(table_elem) = table else {
            anyhow::bail!("result table not found");
        };

        let row_selector = Selector::parse("tr").unwrap();
        let th_selector = Selector::parse("th").unwrap();

        let entries = table_elem
            .select(&row_selector)
            .filter(|row| row.select(&th_selector).next().is_none())
            .filter_map(|row| Self::parse_result_row(&row, race_id))
            .collect();

        Ok(entries)
    }

    // Column order: 着順, 枠番, 馬番, 馬名, 性齢, 斤量, 騎手, タイム, 着差,
    // [タイム指数], 通過, 上り, 単勝, 人気, 馬体重, [調教タイム], [厩舎コメント], [備考], 調教師
    fn parse_result_row(row: &ElementRef, race_id: &str) -> Option<ResultEntry> {
        let td_selector = Selector::parse("td").unwrap();
        let cells: Vec<String> = row
            .select(&td_selector)
            .map(|c| clean_text(&c.text().collect::<String>()))
            .collect();

        if cells.len() < 8 {
            return None;
        }

        let mut entry = ResultEntry {
            race_id: race_id.to_string(),
            ..Default::default()
        };

        match cells[0].parse::<u8>() {
            Ok(pos) => entry.finish_position = Some(pos),
            Err(_) if !cells[0].is_empty() => entry.status = Some(cells[0].clone()),
            Err(_) => {}
        }
        entry.bracket = cells[1].parse().ok();
        entry.post_position = cells[2].parse().unwrap_or(0);

        if let Some((id, name)) = linked_id(row, "a[href*='/horse/']", r"/horse/(\d+)") {
            entry.horse_id = id;
            entry.horse_name = name;
        }

        let age_re = Regex::new(r"^([牡牝セ騸])(\d+)$").unwrap();
        if let Some(caps) = age_re.captures(&cells[4]) {
            entry.horse_sex = Some(caps[1].to_string());
            entry.horse_age = caps[2].parse().ok();
        }

        entry.weight_carried = cells[5].parse().ok();

        if let Some((id, name)) = linked_id(row, "a[href*='/jockey/']", r"/jockey/(?:result/)?(?:recent/)?(\d+)") {
            entry.jockey_id = Some(id);
            entry.jockey_name = Some(name);
        }
        if let Some((id, name)) = linked_id(row, "a[href*='/trainer/']", r"/trainer/(?:result/)?(?:recent/)?(\d+)") {
            entry.trainer_id = Some(id);
            entry.trainer_name = Some(name);
        }

        entry.finish_time = parse_finish_time(&cells[7]);
        entry.margin = cells.get(8).filter(|m| !m.is_empty()).cloned();

        // Remaining columns are located by shape rather than position, since
        // premium-only columns are present or absent depending on the page.
        let passing_re = Regex::new(r"^\d+(?:-\d+)+$").unwrap();
        let last_3f_re = Regex::new(r"^\d{2}\.\d$").unwrap();
        let odds_re = Regex::new(r"^\d+(?:,\d{3})*\.\d$").unwrap();
        let weight_re = Regex::new(r"^(\d{3})\s*\(([+-]?\d+)\)$").unwrap();

        let mut idx = 9;
        while idx < cells.len() {
            let text = &cells[idx];
            if entry.passing.is_none() && passing_re.is_match(text) {
                entry.passing = Some(text.clone());
                // 上り follows 通過
                if let Some(next) = cells.get(idx + 1).filter(|t| last_3f_re.is_match(t)) {
                    entry.last_3f = next.parse().ok();
                    idx += 1;
                }
            } else if entry.win_odds.is_none() && entry.passing.is_some() && odds_re.is_match(text) {
                entry.win_odds = text.replace(',', "").parse().ok();
                entry.popularity = cells.get(idx + 1).and_then(|p| p.parse().ok());
                idx += 1;
            } else if let Some(caps) = weight_re.captures(text) {
                entry.horse_weight = caps[1].parse().ok();
                entry.weight_change = caps[2].parse().ok();
            }
            idx += 1;
        }

        if entry.horse_id.is_empty() {
            return None;
        }

        Some(entry)
    }
}

/// "2:32.5" -> 152.5
fn parse_finish_time(text: &str) -> Option<f64> {
    let re = Regex::new(r"^(\d+):(\d{2})\.(\d)$").unwrap();
    let caps = re.captures(text)?;
    let min: f64 = caps[1].parse().ok()?;
    let sec: f64 = caps[2].parse().ok()?;
    let dec: f64 = caps[3].parse().ok()?;
    Some(min * 60.0 + sec + dec / 10.0)
}
