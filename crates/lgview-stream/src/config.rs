use crate::error::ConfigError;
use crate::transport::HttpSettings;
use lgview_model::Location;
use std::collections::HashSet;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const API_URL_ENV: &str = "LGVIEW_API_URL";
pub const LOCATIONS_ENV: &str = "LGVIEW_LOCATIONS";

/// Start-up configuration: a default endpoint plus an optional JSON list of
/// `{id, name, url}` location records.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub default_url: String,
    pub locations_json: Option<String>,
    pub http: HttpSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_url: DEFAULT_API_URL.to_string(),
            locations_json: None,
            http: HttpSettings::default(),
        }
    }
}

impl ClientConfig {
    pub fn default_location(&self) -> Location {
        Location {
            id: "default".to_string(),
            name: "Default Location".to_string(),
            url: self.default_url.clone(),
        }
    }

    /// The configured locations, or the single default location when the
    /// list is absent, empty or unparseable.
    pub fn locations(&self) -> Vec<Location> {
        let parsed = match self.locations_json.as_deref().map(str::trim) {
            None | Some("") => Vec::new(),
            Some(json) => match parse_locations(json) {
                Ok(locations) => locations,
                Err(err) => {
                    tracing::error!(error = %err, "failed to parse {LOCATIONS_ENV}");
                    Vec::new()
                }
            },
        };

        if parsed.is_empty() {
            vec![self.default_location()]
        } else {
            parsed
        }
    }
}

pub fn parse_locations(json: &str) -> Result<Vec<Location>, ConfigError> {
    let locations: Vec<Location> = serde_json::from_str(json)?;

    let mut ids = HashSet::new();
    for location in &locations {
        if !ids.insert(location.id.as_str()) {
            tracing::warn!(id = %location.id, "duplicate location id; the first entry wins on selection");
        }
    }

    Ok(locations)
}
