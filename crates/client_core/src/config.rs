use std::{collections::HashMap, fs, path::Path};

use shared::{
    domain::{DEFAULT_FORECAST_DAYS, DEFAULT_HISTORY_DAYS},
    error::ForecastError,
};
use url::Url;

pub const SETTINGS_FILE: &str = "forecaster.toml";
const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000/api";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub history_days: u32,
    pub forecast_days: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            history_days: DEFAULT_HISTORY_DAYS,
            forecast_days: DEFAULT_FORECAST_DAYS,
        }
    }
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the flat toml file, then environment overrides. Unparsable values are ignored,
/// and a zero request timeout falls back to the default.
pub fn load_settings_from(
    file: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(file) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("api_base_url") {
                settings.api_base_url = v.clone();
            }
            if let Some(v) = file_cfg.get("request_timeout_secs") {
                apply_parsed(v, &mut settings.request_timeout_secs);
            }
            if let Some(v) = file_cfg.get("history_days") {
                apply_parsed(v, &mut settings.history_days);
            }
            if let Some(v) = file_cfg.get("forecast_days") {
                apply_parsed(v, &mut settings.forecast_days);
            }
        }
    }

    if let Some(v) = env("FORECASTER_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = env("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        apply_parsed(&v, &mut settings.request_timeout_secs);
    }
    if let Some(v) = env("APP__HISTORY_DAYS") {
        apply_parsed(&v, &mut settings.history_days);
    }
    if let Some(v) = env("APP__FORECAST_DAYS") {
        apply_parsed(&v, &mut settings.forecast_days);
    }
    if settings.request_timeout_secs == 0 {
        settings.request_timeout_secs = DEFAULT_REQUEST_TIMEOUT_SECS;
    }

    settings
}

fn apply_parsed<T: std::str::FromStr>(raw: &str, target: &mut T) {
    if let Ok(parsed) = raw.trim().parse::<T>() {
        *target = parsed;
    }
}

pub fn normalize_api_base_url(raw: &str) -> Result<String, ForecastError> {
    let raw = raw.trim().trim_end_matches('/');
    if raw.is_empty() {
        return Ok(DEFAULT_API_BASE_URL.to_string());
    }

    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };

    let parsed = Url::parse(&candidate).map_err(|err| {
        ForecastError::validation(format!("invalid api base url '{raw}': {err}"))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ForecastError::validation(format!(
            "unsupported api base url scheme '{}'",
            parsed.scheme()
        )));
    }

    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    #[test]
    fn adds_scheme_and_trims_trailing_slash() {
        assert_eq!(
            normalize_api_base_url("localhost:5000/api/").expect("normalize"),
            "http://localhost:5000/api"
        );
        assert_eq!(
            normalize_api_base_url(" https://forecast.example.com/api ").expect("normalize"),
            "https://forecast.example.com/api"
        );
    }

    #[test]
    fn empty_base_url_falls_back_to_default() {
        assert_eq!(
            normalize_api_base_url("  ").expect("normalize"),
            DEFAULT_API_BASE_URL
        );
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = normalize_api_base_url("ftp://example.com").expect_err("must reject");
        assert!(matches!(err, ForecastError::Validation(_)));
    }

    #[test]
    fn env_overrides_file_and_ignores_garbage() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("forecaster_settings_{suffix}.toml"));
        fs::write(
            &path,
            "api_base_url = \"http://file-host/api\"\nhistory_days = \"120\"\nforecast_days = \"lots\"\n",
        )
        .expect("write settings");

        let settings = load_settings_from(&path, |key| match key {
            "APP__API_BASE_URL" => Some("http://env-host/api".to_string()),
            "APP__REQUEST_TIMEOUT_SECS" => Some("5".to_string()),
            _ => None,
        });

        assert_eq!(settings.api_base_url, "http://env-host/api");
        assert_eq!(settings.request_timeout_secs, 5);
        assert_eq!(settings.history_days, 120);
        assert_eq!(settings.forecast_days, DEFAULT_FORECAST_DAYS);

        fs::remove_file(path).expect("cleanup");
    }

    #[test]
    fn zero_timeout_uses_default() {
        let settings = load_settings_from(Path::new("/nonexistent/forecaster.toml"), |key| {
            (key == "APP__REQUEST_TIMEOUT_SECS").then(|| "0".to_string())
        });
        assert_eq!(settings.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn missing_file_keeps_defaults() {
        let settings = load_settings_from(Path::new("/nonexistent/forecaster.toml"), |_| None);
        assert_eq!(settings, ClientSettings::default());
    }
}
