//! Odds parser for the netkeiba.com JSON API.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Win odds (単勝) for one horse
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WinOdds {
    pub race_id: String,
    pub horse_number: u8,
    /// None while the horse is scratched or odds are not yet published
    pub odds: Option<f64>,
    pub popularity: Option<u8>,
    pub official_datetime: Option<String>,
}

/// Parser for odds JSON API
pub struct OddsParser;

/// type=1 is win odds
const WIN_ODDS_TYPE: &str = "1";

impl OddsParser {
    /// Parse win odds from a JSON response, ordered by horse number
    pub fn parse_win(json: &str, race_id: &str) -> Result<Vec<WinOdds>> {
        let response: OddsResponse = serde_json::from_str(json.trim())?;

        // "middle" is served while betting is still open
        if response.status != "result" && response.status != "middle" {
            anyhow::bail!("Invalid response status: {}", response.status);
        }

        let Some(data) = response.data else {
            return Ok(Vec::new());
        };

        let mut odds = Vec::new();
        if let Some(odds_map) = data.odds.get(WIN_ODDS_TYPE) {
            for (horse_str, values) in odds_map {
                let Ok(horse_number) = horse_str.parse::<u8>() else {
                    continue;
                };

                // ["2.1", "", "1"]: odds, unused, popularity
                odds.push(WinOdds {
                    race_id: race_id.to_string(),
                    horse_number,
                    odds: values.first().and_then(|v| v.replace(',', "").parse().ok()),
                    popularity: values.get(2).and_then(|v| v.parse().ok()),
                    official_datetime: data.official_datetime.clone(),
                });
            }
        }

        odds.sort_by_key(|o| o.horse_number);
        Ok(odds)
    }
}

/// Internal: API response structure
#[derive(Deserialize)]
struct OddsResponse {
    status: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    data: Option<OddsData>,
}

#[derive(Deserialize)]
struct OddsData {
    official_datetime: Option<String>,
    #[serde(default)]
    odds: HashMap<String, HashMap<String, Vec<String>>>,
}

/// The API sends `"data": ""` when there is nothing to report
fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<OddsData>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    #[allow(dead_code)]
    enum Payload {
        Data(OddsData),
        Other(serde_json::Value),
    }

    Ok(match Option::<Payload>::deserialize(deserializer)? {
        Some(Payload::Data(data)) => Some(data),
        _ => None,
    })
}
