//! Travel lookup tools: attractions per city and opening hours per place.
//!
//! Lookups never fail. Unknown keys, a missing data file, and malformed
//! data all come back as an empty list (or "Hours unavailable").

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{Tool, ToolContext, ToolOutput};

const ATTRACTIONS: &[(&str, &[&str])] = &[
    ("Kyoto", &["Fushimi Inari", "Kiyomizu-dera", "Arashiyama"]),
    ("Osaka", &["Osaka Castle", "Dotonbori"]),
];

const HOURS: &[(&str, &str)] = &[
    ("Fushimi Inari", "Always open"),
    ("Kiyomizu-dera", "6:00-18:00"),
    ("Arashiyama", "Always open"),
    ("Osaka Castle", "9:00-17:00"),
    ("Dotonbori", "Always open"),
];

pub const HOURS_UNAVAILABLE: &str = "Hours unavailable";

/// Attractions for a city from the built-in table.
pub fn list_attractions(city: &str) -> Vec<&'static str> {
    ATTRACTIONS
        .iter()
        .find(|(name, _)| *name == city)
        .map(|(_, places)| places.to_vec())
        .unwrap_or_default()
}

/// Opening hours for a place from the built-in table.
pub fn get_hours(place: &str) -> &'static str {
    HOURS
        .iter()
        .find(|(name, _)| *name == place)
        .map(|(_, hours)| *hours)
        .unwrap_or(HOURS_UNAVAILABLE)
}

/// Attraction records for `city` from a JSON file shaped `{"City": [...]}`.
pub async fn read_attractions_file(path: &Path, city: &str) -> Vec<serde_json::Value> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) => {
            debug!(path = %path.display(), %e, "attractions file unreadable");
            return Vec::new();
        }
    };

    let data: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(data) => data,
        Err(e) => {
            debug!(path = %path.display(), %e, "attractions file is not valid JSON");
            return Vec::new();
        }
    };

    data.get(city)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

#[derive(Deserialize)]
struct CityParams {
    city: String,
}

#[derive(Deserialize)]
struct PlaceParams {
    place: String,
}

fn city_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "city": {
                "type": "string",
                "description": "City name, e.g. \"Kyoto\""
            }
        },
        "required": ["city"]
    })
}

pub struct ListAttractionsTool;

#[async_trait]
impl Tool for ListAttractionsTool {
    fn name(&self) -> &str {
        "list_attractions"
    }

    fn description(&self) -> &str {
        "Return a list of attractions for a city."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        city_schema()
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _context: &ToolContext,
    ) -> anyhow::Result<ToolOutput> {
        let p: CityParams = serde_json::from_value(params)?;
        debug!(city = %p.city, "list_attractions");
        ToolOutput::json(&list_attractions(&p.city))
    }
}

pub struct ReadAttractionsFileTool;

#[async_trait]
impl Tool for ReadAttractionsFileTool {
    fn name(&self) -> &str {
        "read_attractions_file"
    }

    fn description(&self) -> &str {
        "Return a list of attractions for a city from the JSON data file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        city_schema()
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        context: &ToolContext,
    ) -> anyhow::Result<ToolOutput> {
        let p: CityParams = serde_json::from_value(params)?;
        let path = context.config.attractions_file();
        debug!(city = %p.city, path = %path.display(), "read_attractions_file");
        ToolOutput::json(&read_attractions_file(&path, &p.city).await)
    }
}

pub struct GetHoursTool;

#[async_trait]
impl Tool for GetHoursTool {
    fn name(&self) -> &str {
        "get_hours"
    }

    fn description(&self) -> &str {
        "Return opening hours for a place."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "place": {
                    "type": "string",
                    "description": "Name of the attraction"
                }
            },
            "required": ["place"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _context: &ToolContext,
    ) -> anyhow::Result<ToolOutput> {
        let p: PlaceParams = serde_json::from_value(params)?;
        Ok(ToolOutput::ok(get_hours(&p.place)))
    }
}
