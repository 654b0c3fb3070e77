use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::scheduler::poll_interval;

/// Crawler configuration loaded from environment variables (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub cards_dir: PathBuf,

    // Wall source
    pub vk_token: String,
    pub vk_group_name: String,
    pub vk_api_url: String,
    pub wall_fetch_count: u32,

    // Static card location
    pub location_address: String,
    pub location_lat: f64,
    pub location_lon: f64,

    // Classifiers
    pub cat_dog_classifier_endpoint: String,
    pub lost_found_classifier_endpoint: String,
    pub male_female_classifier_endpoint: String,

    // Downstream
    pub pipeline_notification_url: Option<String>,

    // Pacing
    pub num_of_crawlers: u32,
    pub min_poll_interval_sec: u64,
    pub api_requests_per_day: u32,
    pub known_cards_tracking_count: usize,
    pub http_timeout_sec: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| get(key).with_context(|| format!("{key} environment variable is required"));

        let config = Self {
            cards_dir: get("CARDS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".").join("db")),
            vk_token: required("VK_TOKEN")?,
            vk_group_name: required("VK_GROUP_NAME")?,
            vk_api_url: get("VK_API_URL").unwrap_or_else(|| "https://api.vk.com/method".to_string()),
            wall_fetch_count: parsed(&get, "WALL_FETCH_COUNT", 100)?,
            location_address: required("LOCATION_ADDRESS")?,
            location_lat: parse_value("LOCATION_LAT", &required("LOCATION_LAT")?)?,
            location_lon: parse_value("LOCATION_LON", &required("LOCATION_LON")?)?,
            cat_dog_classifier_endpoint: required("CAT_DOG_CLASSIFIER_ENDPOINT")?,
            lost_found_classifier_endpoint: required("LOST_FOUND_CLASSIFIER_ENDPOINT")?,
            male_female_classifier_endpoint: required("MALE_FEMALE_CLASSIFIER_ENDPOINT")?,
            pipeline_notification_url: get("PIPELINE_NOTIFICATION_URL")
                .or_else(|| get("PIPELINE_NOTIFICATATION_URL")),
            num_of_crawlers: parsed(&get, "NUM_OF_CRAWLERS", 1)?,
            min_poll_interval_sec: parsed(&get, "MIN_POLL_INTERVAL_SEC", 600)?,
            api_requests_per_day: match get("API_REQUESTS_PER_DAY") {
                Some(v) => parse_value("API_REQUESTS_PER_DAY", &v)?,
                None => parsed(&get, "API_REQUESTS_PET_DAY", 4000)?,
            },
            known_cards_tracking_count: parsed(&get, "KNOWN_CARDS_TRACKING_COUNT", 1024)?,
            http_timeout_sec: parsed(&get, "HTTP_TIMEOUT_SEC", 30)?,
        };

        if config.api_requests_per_day == 0 {
            bail!("API_REQUESTS_PER_DAY must be positive");
        }
        if config.num_of_crawlers == 0 {
            bail!("NUM_OF_CRAWLERS must be positive");
        }

        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        poll_interval(
            self.min_poll_interval_sec,
            self.api_requests_per_day,
            self.num_of_crawlers,
        )
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_sec)
    }

    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            let n = val.char_indices().nth(5).map(|(i, _)| i).unwrap_or(val.len());
            format!("{}...({} chars)", &val[..n], val.len())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  CARDS_DIR: {}", self.cards_dir.display());
        tracing::info!("  VK_TOKEN: {}", preview(&self.vk_token));
        tracing::info!("  VK_GROUP_NAME: {}", self.vk_group_name);
        tracing::info!("  CAT_DOG_CLASSIFIER_ENDPOINT: {}", self.cat_dog_classifier_endpoint);
        tracing::info!("  LOST_FOUND_CLASSIFIER_ENDPOINT: {}", self.lost_found_classifier_endpoint);
        tracing::info!("  MALE_FEMALE_CLASSIFIER_ENDPOINT: {}", self.male_female_classifier_endpoint);
        tracing::info!(
            "  PIPELINE_NOTIFICATION_URL: {}",
            self.pipeline_notification_url.as_deref().unwrap_or("<not set>")
        );
        tracing::info!(
            "  Crawlers sharing the token: {}, targeting {} API requests per day",
            self.num_of_crawlers,
            self.api_requests_per_day
        );
        tracing::info!("  Effective polling interval: {:?}", self.poll_interval());
    }
}

fn parsed<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("{key} has invalid value {value:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("VK_TOKEN", "vk1.a.secret"),
            ("VK_GROUP_NAME", "lost_pets"),
            ("LOCATION_ADDRESS", "Saint Petersburg"),
            ("LOCATION_LAT", "59.93"),
            ("LOCATION_LON", "30.36"),
            ("CAT_DOG_CLASSIFIER_ENDPOINT", "http://species/invocations"),
            ("LOST_FOUND_CLASSIFIER_ENDPOINT", "http://lostfound/invocations"),
            ("MALE_FEMALE_CLASSIFIER_ENDPOINT", "http://sex/invocations"),
        ])
    }

    fn load(vars: &HashMap<&str, &str>) -> Result<Config> {
        Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_apply_when_optional_vars_missing() {
        let config = load(&base()).unwrap();
        assert_eq!(config.cards_dir, PathBuf::from("./db"));
        assert_eq!(config.wall_fetch_count, 100);
        assert_eq!(config.num_of_crawlers, 1);
        assert_eq!(config.min_poll_interval_sec, 600);
        assert_eq!(config.api_requests_per_day, 4000);
        assert_eq!(config.known_cards_tracking_count, 1024);
        assert_eq!(config.pipeline_notification_url, None);
        assert_eq!(config.location_lat, 59.93);
    }

    #[test]
    fn each_classifier_keeps_its_own_endpoint() {
        let config = load(&base()).unwrap();
        assert_eq!(config.lost_found_classifier_endpoint, "http://lostfound/invocations");
        assert_eq!(config.male_female_classifier_endpoint, "http://sex/invocations");
    }

    #[test]
    fn missing_required_var_is_named_in_error() {
        let mut vars = base();
        vars.remove("VK_TOKEN");
        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("VK_TOKEN"));
    }

    #[test]
    fn unparsable_number_is_an_error() {
        let mut vars = base();
        vars.insert("LOCATION_LAT", "north");
        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("LOCATION_LAT"));
    }

    #[test]
    fn legacy_variable_spellings_are_accepted() {
        let mut vars = base();
        vars.insert("PIPELINE_NOTIFICATATION_URL", "http://pipeline/cards");
        vars.insert("API_REQUESTS_PET_DAY", "2000");
        let config = load(&vars).unwrap();
        assert_eq!(config.pipeline_notification_url.as_deref(), Some("http://pipeline/cards"));
        assert_eq!(config.api_requests_per_day, 2000);
    }

    #[test]
    fn empty_notification_url_disables_notifications() {
        let mut vars = base();
        vars.insert("PIPELINE_NOTIFICATION_URL", "");
        assert_eq!(load(&vars).unwrap().pipeline_notification_url, None);
    }

    #[test]
    fn zero_request_budget_is_rejected() {
        let mut vars = base();
        vars.insert("API_REQUESTS_PER_DAY", "0");
        assert!(load(&vars).is_err());
    }

    #[test]
    fn poll_interval_uses_shared_budget() {
        let mut vars = base();
        vars.insert("NUM_OF_CRAWLERS", "50");
        vars.insert("MIN_POLL_INTERVAL_SEC", "60");
        vars.insert("API_REQUESTS_PER_DAY", "4000");
        // 86400 / 4000 * 50 = 1080s
        assert_eq!(load(&vars).unwrap().poll_interval(), Duration::from_secs(1080));
    }
}
