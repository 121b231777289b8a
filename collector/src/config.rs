use crate::error::{Result, StatsError};
use crate::utils::is_truthy;
use env_logger::Builder;
use log::{info, LevelFilter};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_CHANNEL_ID: &str = "UCylIWXb8bRI0KcDeJG6H8rw";
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3/";
pub const SECRET_NAME: &str = "YOUTUBE_API_KEY";

/// Everything a run needs, read once at process start.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub channel_id: String,
    pub api_base: Url,
    pub history_path: PathBuf,
    pub backup_dir: PathBuf,
    pub backup_keep: usize,
    pub template_path: PathBuf,
    pub report_path: PathBuf,
    /// `None` disables chart generation.
    pub chart_dir: Option<PathBuf>,
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub request_timeout: Duration,
    pub integrity_threshold: f64,
    pub secret_repo: Option<String>,
    pub is_ci: bool,
}

pub fn init_logger() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
    info!("Starting YouTube stats collector...");
}

pub fn load_environment() {
    dotenv::dotenv().ok();
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("YOUTUBE_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                StatsError::Config("YOUTUBE_API_KEY environment variable must be set".to_string())
            })?;

        let text = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let mut base = text("YOUTUBE_API_BASE", DEFAULT_API_BASE);
        if !base.ends_with('/') {
            base.push('/');
        }
        let api_base = Url::parse(&base)
            .map_err(|e| StatsError::Config(format!("YOUTUBE_API_BASE is not a valid URL: {e}")))?;

        // an explicitly empty STATS_CHART_DIR turns charts off
        let chart_dir = match lookup("STATS_CHART_DIR") {
            Some(dir) if dir.trim().is_empty() => None,
            Some(dir) => Some(PathBuf::from(dir)),
            None => Some(PathBuf::from("charts")),
        };

        let is_ci = ["CI", "GITHUB_ACTIONS"]
            .iter()
            .any(|key| lookup(key).map(|v| is_truthy(&v)).unwrap_or(false));

        let secret_repo = lookup("STATS_SECRET_REPO")
            .or_else(|| lookup("GITHUB_REPOSITORY"))
            .filter(|r| !r.trim().is_empty());

        let max_retries: u32 = parse_var(&lookup, "STATS_MAX_RETRIES", 3)?;
        if max_retries == 0 {
            return Err(StatsError::Config(
                "STATS_MAX_RETRIES must be at least 1".to_string(),
            ));
        }

        let integrity_threshold: f64 = parse_var(&lookup, "STATS_INTEGRITY_THRESHOLD", 0.5)?;
        // NaN compares false against every ratio and would pass everything
        if !integrity_threshold.is_finite() || integrity_threshold < 0.0 {
            return Err(StatsError::Config(format!(
                "STATS_INTEGRITY_THRESHOLD must be a finite number >= 0, got {integrity_threshold}"
            )));
        }

        Ok(Config {
            api_key,
            channel_id: text("YOUTUBE_CHANNEL_ID", DEFAULT_CHANNEL_ID),
            api_base,
            history_path: PathBuf::from(text("STATS_HISTORY_PATH", "youtube_stats.csv")),
            backup_dir: PathBuf::from(text("STATS_BACKUP_DIR", "backups")),
            backup_keep: parse_var(&lookup, "STATS_BACKUP_KEEP", 30)?,
            template_path: PathBuf::from(text("STATS_TEMPLATE_PATH", "README.template.md")),
            report_path: PathBuf::from(text("STATS_REPORT_PATH", "README.md")),
            chart_dir,
            max_retries,
            initial_delay: Duration::from_secs(parse_var(&lookup, "STATS_RETRY_DELAY_SECS", 1)?),
            request_timeout: Duration::from_secs(parse_var(
                &lookup,
                "STATS_REQUEST_TIMEOUT_SECS",
                10,
            )?),
            integrity_threshold,
            secret_repo,
            is_ci,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| StatsError::Config(format!("{key}={raw:?} is invalid: {e}"))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let err = Config::from_map(&vars(&[])).unwrap_err();
        assert!(matches!(err, StatsError::Config(_)));

        let err = Config::from_map(&vars(&[("YOUTUBE_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, StatsError::Config(_)));
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_map(&vars(&[("YOUTUBE_API_KEY", "key")])).unwrap();
        assert_eq!(config.channel_id, DEFAULT_CHANNEL_ID);
        assert_eq!(config.api_base.as_str(), DEFAULT_API_BASE);
        assert_eq!(config.history_path, PathBuf::from("youtube_stats.csv"));
        assert_eq!(config.backup_keep, 30);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.chart_dir, Some(PathBuf::from("charts")));
        assert!(!config.is_ci);
        assert!(config.secret_repo.is_none());
    }

    #[test]
    fn overrides_and_ci_detection() {
        let config = Config::from_map(&vars(&[
            ("YOUTUBE_API_KEY", "key"),
            ("YOUTUBE_API_BASE", "http://localhost:8080/v3"),
            ("STATS_BACKUP_KEEP", "5"),
            ("STATS_CHART_DIR", ""),
            ("GITHUB_ACTIONS", "true"),
            ("GITHUB_REPOSITORY", "someone/youtube-stats"),
        ]))
        .unwrap();

        assert_eq!(config.api_base.as_str(), "http://localhost:8080/v3/");
        assert_eq!(config.backup_keep, 5);
        assert!(config.chart_dir.is_none());
        assert!(config.is_ci);
        assert_eq!(config.secret_repo.as_deref(), Some("someone/youtube-stats"));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = Config::from_map(&vars(&[
            ("YOUTUBE_API_KEY", "key"),
            ("STATS_BACKUP_KEEP", "thirty"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("STATS_BACKUP_KEEP"));

        let err = Config::from_map(&vars(&[
            ("YOUTUBE_API_KEY", "key"),
            ("STATS_MAX_RETRIES", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, StatsError::Config(_)));
    }

    #[test]
    fn integrity_threshold_must_be_finite_and_non_negative() {
        for bad in ["NaN", "inf", "-0.1"] {
            let err = Config::from_map(&vars(&[
                ("YOUTUBE_API_KEY", "key"),
                ("STATS_INTEGRITY_THRESHOLD", bad),
            ]))
            .unwrap_err();
            assert!(
                err.to_string().contains("STATS_INTEGRITY_THRESHOLD"),
                "{bad}: {err}"
            );
        }

        let config = Config::from_map(&vars(&[
            ("YOUTUBE_API_KEY", "key"),
            ("STATS_INTEGRITY_THRESHOLD", "0"),
        ]))
        .unwrap();
        assert_eq!(config.integrity_threshold, 0.0);
    }
}
