//! Horse profile and race history parser for db.netkeiba.com.
//!
//! The history table is filled in client-side, so it only appears in
//! documents obtained through the headless renderer.

use anyhow::Result;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::clean_text;
use super::race_card::{format_date, surface_name};

/// Horse profile data
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HorseProfile {
    pub horse_id: String,
    pub name: String,
    pub status: Option<String>, // "現役", "抹消"
    pub sex: Option<String>,
    pub age: Option<u8>,
    pub coat_color: Option<String>,
    pub birth_date: Option<String>,
    pub trainer_id: Option<String>,
    pub trainer_name: Option<String>,
    pub owner_id: Option<String>,
    pub owner_name: Option<String>,
    pub breeder_id: Option<String>,
    pub breeder_name: Option<String>,
    pub birthplace: Option<String>,
    pub earnings: Option<String>,
    // Career record
    pub career_races: Option<u32>,
    pub wins: Option<u32>,
    pub seconds: Option<u32>,
    pub thirds: Option<u32>,
    // Bloodline
    pub sire: Option<String>,
    pub dam: Option<String>,
    pub broodmare_sire: Option<String>,
}

/// Past race record
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PastRace {
    pub horse_id: String,
    pub race_id: Option<String>,
    pub date: Option<String>,
    pub venue: Option<String>,
    pub weather: Option<String>,
    pub race_number: Option<u8>,
    pub race_name: Option<String>,
    pub field_size: Option<u8>,
    pub bracket: Option<u8>,
    pub post_position: Option<u8>,
    pub odds: Option<f64>,
    pub popularity: Option<u8>,
    pub finish_position: Option<u8>,
    pub status: Option<String>,
    pub jockey_id: Option<String>,
    pub jockey_name: Option<String>,
    pub weight_carried: Option<f64>,
    pub surface: Option<String>,
    pub distance: Option<u32>,
    pub track_condition: Option<String>,
    pub finish_time: Option<String>,
    pub margin: Option<String>,
    pub passing: Option<String>,
    pub pace: Option<String>,
    pub last_3f: Option<f64>,
    pub horse_weight: Option<u32>,
    pub weight_change: Option<i32>,
    pub winner: Option<String>,
    pub prize: Option<f64>,
}

/// History table columns, by header label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Date,
    Venue,
    Weather,
    RaceNumber,
    RaceName,
    FieldSize,
    Bracket,
    PostPosition,
    Odds,
    Popularity,
    Finish,
    Jockey,
    WeightCarried,
    Distance,
    TrackCondition,
    Time,
    Margin,
    Passing,
    Pace,
    Last3f,
    HorseWeight,
    Winner,
    Prize,
}

impl Column {
    fn from_header(label: &str) -> Option<Self> {
        let column = match label {
            "日付" => Column::Date,
            "開催" => Column::Venue,
            "天気" => Column::Weather,
            "R" => Column::RaceNumber,
            "レース名" => Column::RaceName,
            "頭数" => Column::FieldSize,
            "枠番" => Column::Bracket,
            "馬番" => Column::PostPosition,
            "オッズ" => Column::Odds,
            "人気" => Column::Popularity,
            "着順" => Column::Finish,
            "騎手" => Column::Jockey,
            "斤量" => Column::WeightCarried,
            "距離" => Column::Distance,
            "馬場" => Column::TrackCondition,
            "タイム" => Column::Time,
            "着差" => Column::Margin,
            "通過" => Column::Passing,
            "ペース" => Column::Pace,
            "上り" => Column::Last3f,
            "馬体重" => Column::HorseWeight,
            "賞金" => Column::Prize,
            l if l.starts_with("勝ち馬") => Column::Winner,
            _ => return None,
        };
        Some(column)
    }

    /// Layout of the public history table
    fn default_layout() -> HashMap<Column, usize> {
        [
            (Column::Date, 0),
            (Column::Venue, 1),
            (Column::Weather, 2),
            (Column::RaceNumber, 3),
            (Column::RaceName, 4),
            (Column::FieldSize, 6),
            (Column::Bracket, 7),
            (Column::PostPosition, 8),
            (Column::Odds, 9),
            (Column::Popularity, 10),
            (Column::Finish, 11),
            (Column::Jockey, 12),
            (Column::WeightCarried, 13),
            (Column::Distance, 14),
            (Column::TrackCondition, 15),
            (Column::Time, 17),
            (Column::Margin, 18),
            (Column::Passing, 20),
            (Column::Pace, 21),
            (Column::Last3f, 22),
            (Column::HorseWeight, 23),
            (Column::Winner, 26),
            (Column::Prize, 27),
        ]
        .into_iter()
        .collect()
    }
}

/// Parser for horse pages
pub struct HorseParser;

impl HorseParser {
    /// Parse the horse profile. Fails when the page has no horse name.
    pub fn parse_profile(html: &str, horse_id: &str) -> Result<HorseProfile> {
        let document = Html::parse_document(html);
        let mut profile = HorseProfile {
            horse_id: horse_id.to_string(),
            ..Default::default()
        };

        let name_selectors = [".horse_title h1", ".db_head_name h1", "h1"];
        for sel_str in name_selectors {
            if let Ok(selector) = Selector::parse(sel_str) {
                if let Some(elem) = document.select(&selector).next() {
                    let cleaned = clean_text(&elem.text().collect::<String>());
                    if !cleaned.is_empty() {
                        profile.name = cleaned;
                        break;
                    }
                }
            }
        }
        if profile.name.is_empty() {
            anyhow::bail!("horse name not found");
        }

        Self::parse_title(&document, &mut profile);
        Self::parse_profile_table(&document, &mut profile);
        Self::parse_bloodline(&document, &mut profile);

        Ok(profile)
    }

    /// "現役　牡5　鹿毛"
    fn parse_title(document: &Html, profile: &mut HorseProfile) {
        let Ok(selector) = Selector::parse(".horse_title p.txt_01, .horse_title p") else {
            return;
        };
        let Some(elem) = document.select(&selector).next() else {
            return;
        };

        let sex_age_re = Regex::new(r"^([牡牝セ])(\d+)$").unwrap();
        for token in elem.text().collect::<String>().split_whitespace() {
            if let Some(caps) = sex_age_re.captures(token) {
                profile.sex = Some(caps[1].to_string());
                profile.age = caps[2].parse().ok();
            } else if token == "現役" || token == "抹消" {
                profile.status = Some(token.to_string());
            } else if token.ends_with('毛') || token.ends_with('色') {
                profile.coat_color = Some(token.to_string());
            }
        }
    }

    fn parse_profile_table(document: &Html, profile: &mut HorseProfile) {
        let Ok(row_selector) = Selector::parse("table.db_prof_table tr, .profile_table tr") else {
            return;
        };
        let th_selector = Selector::parse("th").unwrap();
        let td_selector = Selector::parse("td").unwrap();

        let date_re = Regex::new(r"(\d{4})年(\d{1,2})月(\d{1,2})日").unwrap();
        let record_re = Regex::new(r"(\d+)戦(\d+)勝\s*\[\s*(\d+)-(\d+)-(\d+)-(\d+)\s*\]").unwrap();

        for row in document.select(&row_selector) {
            let (Some(th), Some(td)) = (row.select(&th_selector).next(), row.select(&td_selector).next()) else {
                continue;
            };
            let label = clean_text(&th.text().collect::<String>());
            let value = clean_text(&td.text().collect::<String>());

            match label.as_str() {
                "生年月日" => {
                    if let Some(caps) = date_re.captures(&value) {
                        profile.birth_date = Some(format_date(&caps[1], &caps[2], &caps[3]));
                    }
                }
                "調教師" => {
                    let (id, name) = person(&td, "trainer", &value);
                    profile.trainer_id = id;
                    profile.trainer_name = name;
                }
                "馬主" => {
                    let (id, name) = person(&td, "owner", &value);
                    profile.owner_id = id;
                    profile.owner_name = name;
                }
                "生産者" => {
                    let (id, name) = person(&td, "breeder", &value);
                    profile.breeder_id = id;
                    profile.breeder_name = name;
                }
                "産地" => profile.birthplace = non_empty(value),
                "獲得賞金" => profile.earnings = non_empty(value),
                "通算成績" => {
                    if let Some(caps) = record_re.captures(&value) {
                        profile.career_races = caps[1].parse().ok();
                        profile.wins = caps[3].parse().ok();
                        profile.seconds = caps[4].parse().ok();
                        profile.thirds = caps[5].parse().ok();
                    }
                }
                _ => {}
            }
        }
    }

    // blood_table rows: sire | sire's sire / sire's dam / dam | broodmare sire / dam's dam
    fn parse_bloodline(document: &Html, profile: &mut HorseProfile) {
        let table_selectors = ["table.blood_table", ".pedigree_table"];

        for sel_str in table_selectors {
            if let Ok(selector) = Selector::parse(sel_str) {
                if let Some(table) = document.select(&selector).next() {
                    let a_selector = Selector::parse("a").unwrap();
                    let names: Vec<String> = table
                        .select(&a_selector)
                        .map(|a| clean_text(&a.text().collect::<String>()))
                        .filter(|name| !name.is_empty())
                        .collect();

                    profile.sire = names.first().cloned();
                    profile.dam = names.get(3).cloned();
                    profile.broodmare_sire = names.get(4).cloned();
                    break;
                }
            }
        }
    }

    /// Parse the race history. Pages without history yield an empty list.
    pub fn parse_history(html: &str, horse_id: &str) -> Result<Vec<PastRace>> {
        let document = Html::parse_document(html);

        let table_selectors = ["table.db_h_race_results", "#horse_results_box table", "table.race_table"];
        let mut table = None;
        for sel_str in table_selectors {
            if let Ok(selector) = Selector::parse(sel_str) {
                if let Some(t) = document.select(&selector).next() {
                    table = Some(t);
                    break;
                }
            }
        }
        let Some(table) = table else {
            return Ok(Vec::new());
        };

        let layout = Self::column_layout(&table);
        let row_selector = Selector::parse("tbody tr, tr").unwrap();
        let th_selector = Selector::parse("th").unwrap();

        let races = table
            .select(&row_selector)
            .filter(|row| row.select(&th_selector).next().is_none())
            .filter_map(|row| Self::parse_history_row(&row, &layout, horse_id))
            .collect();

        Ok(races)
    }

    fn column_layout(table: &ElementRef) -> HashMap<Column, usize> {
        let th_selector = Selector::parse("thead th, tr th").unwrap();
        let layout: HashMap<Column, usize> = table
            .select(&th_selector)
            .enumerate()
            .filter_map(|(idx, th)| {
                let label = clean_text(&th.text().collect::<String>());
                Column::from_header(&label).map(|column| (column, idx))
            })
            .collect();

        if layout.contains_key(&Column::Date) && layout.contains_key(&Column::Finish) {
            layout
        } else {
            Column::default_layout()
        }
    }

    fn parse_history_row(row: &ElementRef, layout: &HashMap<Column, usize>, horse_id: &str) -> Option<PastRace> {
        let td_selector = Selector::parse("td").unwrap();
        let cells: Vec<ElementRef> = row.select(&td_selector).collect();
        if cells.len() < 12 {
            return None;
        }

        let cell = |column: Column| layout.get(&column).and_then(|&i| cells.get(i));
        let text = |column: Column| {
            cell(column)
                .map(|c| clean_text(&c.text().collect::<String>()))
                .filter(|t| !t.is_empty())
        };

        let mut race = PastRace {
            horse_id: horse_id.to_string(),
            ..Default::default()
        };

        let date_re = Regex::new(r"(\d{4})/(\d{1,2})/(\d{1,2})").unwrap();
        race.date = text(Column::Date)
            .and_then(|t| date_re.captures(&t).map(|c| format_date(&c[1], &c[2], &c[3])));
        race.date.as_ref()?;

        race.venue = text(Column::Venue);
        race.weather = text(Column::Weather);
        race.race_number = text(Column::RaceNumber).and_then(|t| t.parse().ok());

        if let Some(name_cell) = cell(Column::RaceName) {
            race.race_name = non_empty(clean_text(&name_cell.text().collect::<String>()));
            let race_re = Regex::new(r"/race/(\d{12})").unwrap();
            race.race_id = link_href(name_cell)
                .and_then(|href| race_re.captures(&href).map(|c| c[1].to_string()));
        }

        race.field_size = text(Column::FieldSize).and_then(|t| t.parse().ok());
        race.bracket = text(Column::Bracket).and_then(|t| t.parse().ok());
        race.post_position = text(Column::PostPosition).and_then(|t| t.parse().ok());
        race.odds = text(Column::Odds).and_then(|t| t.replace(',', "").parse().ok());
        race.popularity = text(Column::Popularity).and_then(|t| t.parse().ok());

        if let Some(t) = text(Column::Finish) {
            match t.parse::<u8>() {
                Ok(pos) => race.finish_position = Some(pos),
                Err(_) => race.status = Some(t),
            }
        }

        if let Some(jockey_cell) = cell(Column::Jockey) {
            race.jockey_name = non_empty(clean_text(&jockey_cell.text().collect::<String>()));
            let jockey_re = Regex::new(r"/jockey/(?:result/)?(?:recent/)?(\d+)").unwrap();
            race.jockey_id = link_href(jockey_cell)
                .and_then(|href| jockey_re.captures(&href).map(|c| c[1].to_string()));
        }

        race.weight_carried = text(Column::WeightCarried).and_then(|t| t.parse().ok());

        let dist_re = Regex::new(r"(芝|ダ|障)(\d+)").unwrap();
        if let Some(caps) = text(Column::Distance).and_then(|t| dist_re.captures(&t).map(|c| (c[1].to_string(), c[2].to_string()))) {
            race.surface = Some(surface_name(&caps.0).to_string());
            race.distance = caps.1.parse().ok();
        }

        race.track_condition = text(Column::TrackCondition);
        race.finish_time = text(Column::Time);
        race.margin = text(Column::Margin);
        race.passing = text(Column::Passing);
        race.pace = text(Column::Pace);
        race.last_3f = text(Column::Last3f).and_then(|t| t.parse().ok());

        let weight_re = Regex::new(r"^(\d{3})\s*\(([+-]?\d+)\)$").unwrap();
        if let Some(t) = text(Column::HorseWeight) {
            if let Some(caps) = weight_re.captures(&t) {
                race.horse_weight = caps[1].parse().ok();
                race.weight_change = caps[2].parse().ok();
            }
        }

        race.winner = text(Column::Winner);
        race.prize = text(Column::Prize).and_then(|t| t.replace(',', "").parse().ok());

        Some(race)
    }
}

/// (id from the first link into `/{kind}/`, display name)
fn person(td: &ElementRef, kind: &str, text: &str) -> (Option<String>, Option<String>) {
    let id = Selector::parse(&format!("a[href*='/{}/']", kind))
        .ok()
        .and_then(|sel| td.select(&sel).next())
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| {
            let re = Regex::new(&format!(r"/{}/(?:result/)?(?:recent/)?(\w+)", kind)).ok()?;
            re.captures(href).map(|c| c[1].to_string())
        });
    (id, non_empty(text.to_string()))
}

fn link_href(cell: &ElementRef) -> Option<String> {
    let selector = Selector::parse("a[href]").ok()?;
    cell.select(&selector)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<div class="horse_title">
  <h1>ドウデュース</h1>
  <p class="txt_01">抹消　牡5　鹿毛</p>
</div>
<table class="db_prof_table">
  <tr><th>生年月日</th><td>2019年5月7日</td></tr>
  <tr><th>調教師</th><td><a href="/trainer/01061/">友道康夫</a> (栗東)</td></tr>
  <tr><th>馬主</th><td><a href="/owner/x04ab1/">キーファーズ</a></td></tr>
  <tr><th>生産者</th><td><a href="/breeder/373126/">ノーザンファーム</a></td></tr>
  <tr><th>産地</th><td>安平町</td></tr>
  <tr><th>獲得賞金</th><td>22億0,000万円 (中央)</td></tr>
  <tr><th>通算成績</th><td>16戦8勝 [8-3-1-4]</td></tr>
</table>
<table class="blood_table">
  <tr><td rowspan="2"><a href="/horse/ped/000a00033a/">ハーツクライ</a></td><td><a href="/horse/ped/000a000082/">サンデーサイレンス</a></td></tr>
  <tr><td><a href="/horse/ped/000a001134/">アイリッシュダンス</a></td></tr>
  <tr><td rowspan="2"><a href="/horse/ped/2011100876/">ダストアンドダイヤモンズ</a></td><td><a href="/horse/ped/000a00ef5a/">Vindication</a></td></tr>
  <tr><td><a href="/horse/ped/000a00f00c/">Majestically</a></td></tr>
</table>
<div id="horse_results_box">
<table class="db_h_race_results nk_tb_common">
  <thead><tr>
    <th>日付</th><th>開催</th><th>天気</th><th>R</th><th>レース名</th><th>映像</th><th>頭数</th><th>枠番</th><th>馬番</th>
    <th>オッズ</th><th>人気</th><th>着順</th><th>騎手</th><th>斤量</th><th>距離</th><th>馬場</th><th>馬場指数</th>
    <th>タイム</th><th>着差</th><th>ﾀｲﾑ指数</th><th>通過</th><th>ペース</th><th>上り</th><th>馬体重</th>
    <th>厩舎ｺﾒﾝﾄ</th><th>備考</th><th>勝ち馬(2着馬)</th><th>賞金</th>
  </tr></thead>
  <tbody>
  <tr>
    <td><a href="/race/list/20241222/">2024/12/22</a></td><td>5中山8</td><td>晴</td><td>11</td>
    <td><a href="/race/202406050811/">有馬記念(G1)</a></td><td></td><td>16</td><td>1</td><td>1</td>
    <td>2.8</td><td>1</td><td>取</td><td><a href="/jockey/result/recent/00666/">武豊</a></td><td>58</td><td>芝2500</td><td>良</td><td></td>
    <td></td><td></td><td></td><td></td><td></td><td></td><td>計不</td>
    <td></td><td></td><td></td><td></td>
  </tr>
  <tr>
    <td><a href="/race/list/20241124/">2024/11/24</a></td><td>5東京8</td><td>晴</td><td>12</td>
    <td><a href="/race/202405050812/">ジャパンC(G1)</a></td><td></td><td>14</td><td>5</td><td>8</td>
    <td>2.2</td><td>1</td><td>1</td><td><a href="/jockey/result/recent/00666/">武豊</a></td><td>58</td><td>芝2400</td><td>良</td><td></td>
    <td>2:25.5</td><td>0.0</td><td></td><td>10-10-10</td><td>37.8-32.9</td><td>32.7</td><td>488(+4)</td>
    <td></td><td></td><td>(シンエンペラー)</td><td>50,000.0</td>
  </tr>
  </tbody>
</table>
</div>
</body>
</html>"#;

    #[test]
    fn test_parse_profile() {
        let profile = HorseParser::parse_profile(SAMPLE_HTML, "2019105219").unwrap();

        assert_eq!(profile.horse_id, "2019105219");
        assert_eq!(profile.name, "ドウデュース");
        assert_eq!(profile.status.as_deref(), Some("抹消"));
        assert_eq!(profile.sex.as_deref(), Some("牡"));
        assert_eq!(profile.age, Some(5));
        assert_eq!(profile.coat_color.as_deref(), Some("鹿毛"));
        assert_eq!(profile.birth_date.as_deref(), Some("2019-05-07"));
        assert_eq!(profile.trainer_id.as_deref(), Some("01061"));
        assert_eq!(profile.trainer_name.as_deref(), Some("友道康夫 (栗東)"));
        assert_eq!(profile.owner_id.as_deref(), Some("x04ab1"));
        assert_eq!(profile.breeder_name.as_deref(), Some("ノーザンファーム"));
        assert_eq!(profile.birthplace.as_deref(), Some("安平町"));
        assert_eq!(profile.career_races, Some(16));
        assert_eq!(profile.wins, Some(8));
        assert_eq!(profile.seconds, Some(3));
        assert_eq!(profile.thirds, Some(1));
        assert_eq!(profile.sire.as_deref(), Some("ハーツクライ"));
        assert_eq!(profile.dam.as_deref(), Some("ダストアンドダイヤモンズ"));
        assert_eq!(profile.broodmare_sire.as_deref(), Some("Vindication"));
    }

    #[test]
    fn test_parse_history() {
        let races = HorseParser::parse_history(SAMPLE_HTML, "2019105219").unwrap();
        assert_eq!(races.len(), 2);

        let scratched = &races[0];
        assert_eq!(scratched.date.as_deref(), Some("2024-12-22"));
        assert_eq!(scratched.race_id.as_deref(), Some("202406050811"));
        assert_eq!(scratched.finish_position, None);
        assert_eq!(scratched.status.as_deref(), Some("取"));
        assert_eq!(scratched.horse_weight, None);

        let win = &races[1];
        assert_eq!(win.horse_id, "2019105219");
        assert_eq!(win.venue.as_deref(), Some("5東京8"));
        assert_eq!(win.race_number, Some(12));
        assert_eq!(win.race_name.as_deref(), Some("ジャパンC(G1)"));
        assert_eq!(win.field_size, Some(14));
        assert_eq!(win.post_position, Some(8));
        assert_eq!(win.odds, Some(2.2));
        assert_eq!(win.finish_position, Some(1));
        assert_eq!(win.jockey_id.as_deref(), Some("00666"));
        assert_eq!(win.surface.as_deref(), Some("turf"));
        assert_eq!(win.distance, Some(2400));
        assert_eq!(win.finish_time.as_deref(), Some("2:25.5"));
        assert_eq!(win.last_3f, Some(32.7));
        assert_eq!(win.horse_weight, Some(488));
        assert_eq!(win.weight_change, Some(4));
        assert_eq!(win.winner.as_deref(), Some("(シンエンペラー)"));
        assert_eq!(win.prize, Some(50000.0));
    }

    #[test]
    fn test_history_missing_is_empty() {
        let races = HorseParser::parse_history("<html><h1>x</h1></html>", "1").unwrap();
        assert!(races.is_empty());
    }

    #[test]
    fn test_profile_without_name_fails() {
        assert!(HorseParser::parse_profile("<html><body></body></html>", "1").is_err());
    }
}
