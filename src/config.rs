//! Runtime configuration, read from the environment (and `.env` via dotenvy).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub session_file: PathBuf,
    pub logo_url: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub http_timeout: Duration,
}

impl Config {
    /// Load `.env` if present, then read `SIGUM_*` variables
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` with an injectable lookup (tests, embedding)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("SIGUM_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let session_file = match lookup("SIGUM_SESSION_FILE").filter(|v| !v.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => default_session_file(lookup("HOME")),
        };

        let http_timeout = match lookup("SIGUM_HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| Error::Config(format!("SIGUM_HTTP_TIMEOUT_SECS não é um número: {raw}")))?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            session_file,
            logo_url: lookup("SIGUM_LOGO_URL").filter(|v| !v.trim().is_empty()),
            log_dir: lookup("SIGUM_LOG_DIR").filter(|v| !v.trim().is_empty()).map(PathBuf::from),
            http_timeout,
        })
    }

    pub fn with_api_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.api_url = url.trim_end_matches('/').to_string();
        }
        self
    }
}

fn default_session_file(home: Option<String>) -> PathBuf {
    let base = home.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    base.join(".sigum").join("session.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::from_lookup(lookup_from(&[("HOME", "/home/fiscal")])).unwrap();
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.session_file, PathBuf::from("/home/fiscal/.sigum/session.json"));
        assert_eq!(cfg.http_timeout, Duration::from_secs(30));
        assert!(cfg.logo_url.is_none());
    }

    #[test]
    fn test_overrides_and_trailing_slash() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("SIGUM_API_URL", "https://api.sigum.local/"),
            ("SIGUM_SESSION_FILE", "/tmp/s.json"),
            ("SIGUM_HTTP_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_url, "https://api.sigum.local");
        assert_eq!(cfg.session_file, PathBuf::from("/tmp/s.json"));
        assert_eq!(cfg.http_timeout, Duration::from_secs(5));

        let cfg = cfg.with_api_url(Some("http://127.0.0.1:9000/".to_string()));
        assert_eq!(cfg.api_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn test_bad_timeout_rejected() {
        let err = Config::from_lookup(lookup_from(&[("SIGUM_HTTP_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
