//! Process configuration, read once from the environment at startup.
//!
//! `dotenvy` merges a local `.env` before this runs. Credentials are opaque;
//! an absent or empty one is not an error, it only disables the path that
//! needs it. Malformed numbers are an error and stop startup.

use std::path::PathBuf;
use std::time::Duration;

use crate::lexicon::{Lexicon, LexiconError};
use crate::upstream::client::{DEFAULT_BASE_URL, DEFAULT_MODEL};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:5173",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error(transparent)]
    Lexicon(#[from] LexiconError),
}

#[derive(Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_quote_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub search_client_id: Option<String>,
    pub search_client_secret: Option<String>,
    pub idle_timeout: Duration,
    pub request_timeout: Duration,
    pub lexicon_path: Option<PathBuf>,
    pub allowed_origins: Vec<String>,
    pub static_dir: Option<PathBuf>,
    pub port: u16,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.redacted_summary())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_quote_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_base_url: DEFAULT_BASE_URL.to_string(),
            search_client_id: None,
            search_client_secret: None,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            lexicon_path: None,
            allowed_origins: DEFAULT_ORIGINS.iter().map(|s| s.to_string()).collect(),
            static_dir: None,
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let gemini_api_key = get("GEMINI_API_KEY");
        let gemini_quote_api_key = get("GEMINI_QUOTE_API_KEY").or_else(|| gemini_api_key.clone());

        let idle_secs = parse_num(get("UPSTREAM_IDLE_TIMEOUT_SECS"), "UPSTREAM_IDLE_TIMEOUT_SECS", DEFAULT_IDLE_TIMEOUT_SECS)?;
        let request_secs = parse_num(get("UPSTREAM_REQUEST_TIMEOUT_SECS"), "UPSTREAM_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        let port = parse_num(get("PORT"), "PORT", DEFAULT_PORT)?;

        let allowed_origins = match get("ALLOWED_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.allowed_origins,
        };

        Ok(Self {
            gemini_api_key,
            gemini_quote_api_key,
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            search_client_id: get("SEARCH_CLIENT_ID"),
            search_client_secret: get("SEARCH_CLIENT_SECRET"),
            idle_timeout: Duration::from_secs(idle_secs),
            request_timeout: Duration::from_secs(request_secs),
            lexicon_path: get("LEXICON_PATH").map(PathBuf::from),
            allowed_origins,
            static_dir: get("STATIC_DIR").map(PathBuf::from),
            port,
        })
    }

    /// Built-in table unless `LEXICON_PATH` names a file.
    pub fn load_lexicon(&self) -> Result<Lexicon, ConfigError> {
        match &self.lexicon_path {
            Some(path) => Ok(Lexicon::load(path)?),
            None => Ok(Lexicon::default()),
        }
    }

    pub fn search_configured(&self) -> bool {
        self.search_client_id.is_some() && self.search_client_secret.is_some()
    }

    /// One-line description safe to log: says which credentials are present,
    /// never their values.
    pub fn redacted_summary(&self) -> String {
        let flag = |v: &Option<String>| if v.is_some() { "set" } else { "unset" };
        format!(
            "model={} base_url={} gemini_key={} quote_key={} search={} idle_timeout={}s port={}",
            self.gemini_model,
            self.gemini_base_url,
            flag(&self.gemini_api_key),
            flag(&self.gemini_quote_api_key),
            if self.search_configured() { "set" } else { "unset" },
            self.idle_timeout.as_secs(),
            self.port,
        )
    }
}

fn parse_num<T: std::str::FromStr>(
    raw: Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            var,
            expected: "a non-negative integer",
            value,
        }),
    }
}
