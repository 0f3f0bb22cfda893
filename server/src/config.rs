use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BACKEND_HOST: &str = "0.0.0.0";
pub const DEFAULT_BACKEND_PORT: u16 = 5001;
pub const DEFAULT_DATASET_DIR: &str = "datasets";
pub const DEFAULT_MODEL_PATH: &str = "datasets/trained_data/rbf_model.json";
pub const DEFAULT_CORS_ALLOW_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173";
pub const DEFAULT_STATIC_DIR: &str = "client/dist";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

pub const DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_PREDICTION_CACHE_MAX_ENTRIES: usize = 128;
pub const DEFAULT_BY_YEAR_MAX_CONCURRENCY: usize = 4;

/// Everything [`crate::state::AppState`] needs that comes from the environment.
#[derive(Debug, Clone)]
pub struct StateConfig {
    pub dataset_dir: PathBuf,
    pub model_path: PathBuf,
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub prediction_cache_max_entries: usize,
}

impl StateConfig {
    pub fn from_env() -> Self {
        Self {
            dataset_dir: dataset_dir(),
            model_path: model_path(),
            google_api_key: google_api_key(),
            gemini_model: gemini_model(),
            gemini_api_base: gemini_api_base(),
            prediction_cache_max_entries: prediction_cache_max_entries(),
        }
    }

    /// Offline configuration rooted at `dataset_dir`.
    #[cfg(test)]
    pub fn for_dataset_dir(dataset_dir: impl Into<PathBuf>) -> Self {
        let dataset_dir = dataset_dir.into();
        Self {
            model_path: dataset_dir.join("trained_data").join("rbf_model.json"),
            dataset_dir,
            google_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_api_base: GEMINI_API_BASE.to_string(),
            prediction_cache_max_entries: DEFAULT_PREDICTION_CACHE_MAX_ENTRIES,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn bind_addr() -> String {
    let host = non_empty_var("BACKEND_HOST").unwrap_or_else(|| DEFAULT_BACKEND_HOST.to_string());
    let port = std::env::var("BACKEND_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_BACKEND_PORT);
    format!("{host}:{port}")
}

pub fn dataset_dir() -> PathBuf {
    non_empty_var("ICE_DATASET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_DIR))
}

pub fn model_path() -> PathBuf {
    non_empty_var("ICE_MODEL_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH))
}

pub fn static_dir() -> PathBuf {
    non_empty_var("STATIC_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR))
}

pub fn cors_allow_origins() -> Vec<String> {
    let raw = std::env::var("CORS_ALLOW_ORIGINS")
        .unwrap_or_else(|_| DEFAULT_CORS_ALLOW_ORIGINS.to_string());
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn google_api_key() -> Option<String> {
    non_empty_var("GOOGLE_API_KEY")
}

pub fn gemini_model() -> String {
    non_empty_var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string())
}

pub fn gemini_api_base() -> String {
    non_empty_var("GEMINI_API_BASE")
        .map(|base| base.trim_end_matches('/').to_string())
        .unwrap_or_else(|| GEMINI_API_BASE.to_string())
}

pub fn upstream_http_timeout() -> Duration {
    std::env::var("UPSTREAM_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS))
}

pub fn upstream_connect_timeout() -> Duration {
    std::env::var("UPSTREAM_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS))
}

pub fn prediction_cache_max_entries() -> usize {
    std::env::var("PREDICTION_CACHE_MAX_ENTRIES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_PREDICTION_CACHE_MAX_ENTRIES)
}

pub fn by_year_max_concurrency() -> usize {
    std::env::var("BY_YEAR_MAX_CONCURRENCY")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_BY_YEAR_MAX_CONCURRENCY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_defaults_and_overrides() {
        temp_env::with_vars_unset(["BACKEND_HOST", "BACKEND_PORT"], || {
            assert_eq!(bind_addr(), "0.0.0.0:5001");
        });
        temp_env::with_vars(
            [("BACKEND_HOST", Some("127.0.0.1")), ("BACKEND_PORT", Some("8080"))],
            || assert_eq!(bind_addr(), "127.0.0.1:8080"),
        );
        temp_env::with_var("BACKEND_PORT", Some("not-a-port"), || {
            assert!(bind_addr().ends_with(":5001"));
        });
    }

    #[test]
    fn cors_origins_split_and_trimmed() {
        temp_env::with_var(
            "CORS_ALLOW_ORIGINS",
            Some(" http://a.test , ,http://b.test"),
            || {
                assert_eq!(
                    cors_allow_origins(),
                    vec!["http://a.test".to_string(), "http://b.test".to_string()]
                );
            },
        );
        temp_env::with_var_unset("CORS_ALLOW_ORIGINS", || {
            assert_eq!(cors_allow_origins().len(), 2);
        });
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        temp_env::with_var("GOOGLE_API_KEY", Some("   "), || {
            assert_eq!(google_api_key(), None);
        });
        temp_env::with_var("GOOGLE_API_KEY", Some("abc"), || {
            assert_eq!(google_api_key().as_deref(), Some("abc"));
        });
    }

    #[test]
    fn zero_values_fall_back_to_defaults() {
        temp_env::with_vars(
            [
                ("PREDICTION_CACHE_MAX_ENTRIES", Some("0")),
                ("UPSTREAM_HTTP_TIMEOUT_SECS", Some("0")),
            ],
            || {
                assert_eq!(
                    prediction_cache_max_entries(),
                    DEFAULT_PREDICTION_CACHE_MAX_ENTRIES
                );
                assert_eq!(
                    upstream_http_timeout(),
                    Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS)
                );
            },
        );
    }

    #[test]
    fn gemini_base_drops_trailing_slash() {
        temp_env::with_var("GEMINI_API_BASE", Some("http://127.0.0.1:9000/"), || {
            assert_eq!(gemini_api_base(), "http://127.0.0.1:9000");
        });
    }
}
