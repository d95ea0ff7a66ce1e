use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::layout::font_metrics::FontFamily;
use crate::layout::validate::ValidationRules;

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Quiet period before a preview snapshot is laid out.
    pub layout_debounce: Duration,
    /// Preview sessions untouched for this long are closed.
    pub preview_idle_ttl: Duration,
    pub max_recommended_pages: usize,
    pub tight_fit_threshold_px: f32,
    pub default_font: FontFamily,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let font_name = lookup("DEFAULT_FONT").unwrap_or_else(|| "inter".to_string());
        let default_font = FontFamily::from_name(&font_name)
            .ok_or_else(|| anyhow!("DEFAULT_FONT '{font_name}' is not a supported font family"))?;

        let tight_fit_threshold_px: f32 = parse_or(&lookup, "TIGHT_FIT_THRESHOLD_PX", 30.0)?;
        if !tight_fit_threshold_px.is_finite() || tight_fit_threshold_px < 0.0 {
            return Err(anyhow!(
                "TIGHT_FIT_THRESHOLD_PX must be a non-negative number"
            ));
        }

        let preview_idle_ttl_secs: u64 = parse_or(&lookup, "PREVIEW_IDLE_TTL_SECS", 1800)?;
        if preview_idle_ttl_secs == 0 {
            return Err(anyhow!("PREVIEW_IDLE_TTL_SECS must be at least 1"));
        }

        Ok(Config {
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            layout_debounce: Duration::from_millis(parse_or(&lookup, "LAYOUT_DEBOUNCE_MS", 250)?),
            preview_idle_ttl: Duration::from_secs(preview_idle_ttl_secs),
            max_recommended_pages: parse_or(&lookup, "MAX_RECOMMENDED_PAGES", 3)?,
            tight_fit_threshold_px,
            default_font,
        })
    }

    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules {
            tight_fit_threshold_px: self.tight_fit_threshold_px,
            max_recommended_pages: self.max_recommended_pages,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn make_config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = make_config(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.layout_debounce, Duration::from_millis(250));
        assert_eq!(config.preview_idle_ttl, Duration::from_secs(1800));
        assert_eq!(config.max_recommended_pages, 3);
        assert_eq!(config.tight_fit_threshold_px, 30.0);
        assert_eq!(config.default_font, FontFamily::Inter);
    }

    #[test]
    fn test_overrides() {
        let config = make_config(&[
            ("PORT", "9000"),
            ("LAYOUT_DEBOUNCE_MS", "40"),
            ("PREVIEW_IDLE_TTL_SECS", "90"),
            ("MAX_RECOMMENDED_PAGES", "2"),
            ("TIGHT_FIT_THRESHOLD_PX", "12.5"),
            ("DEFAULT_FONT", "EB Garamond"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.layout_debounce, Duration::from_millis(40));
        assert_eq!(config.preview_idle_ttl, Duration::from_secs(90));
        assert_eq!(config.validation_rules().max_recommended_pages, 2);
        assert_eq!(config.validation_rules().tight_fit_threshold_px, 12.5);
        assert_eq!(config.default_font, FontFamily::EbGaramond);
    }

    #[test]
    fn test_invalid_port_fails() {
        let err = make_config(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_unknown_font_fails() {
        assert!(make_config(&[("DEFAULT_FONT", "papyrus")]).is_err());
    }

    #[test]
    fn test_zero_idle_ttl_fails() {
        assert!(make_config(&[("PREVIEW_IDLE_TTL_SECS", "0")]).is_err());
    }

    #[test]
    fn test_negative_threshold_fails() {
        assert!(make_config(&[("TIGHT_FIT_THRESHOLD_PX", "-5")]).is_err());
    }
}
