// Configuration: endpoints and API key.
//
// Values come from a small JSON file (`env.json` by default) and can be
// overridden by environment variables of the same name. A key that is
// missing is only a warning at startup; it becomes `ConfigMissing` when a
// turn actually needs it, before any request is sent.

use crate::error::{Error, Result};
use anyhow::Context;
use log::warn;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const API_KEY: &str = "GEMINI_API_KEY";
pub const API_URL: &str = "GEMINI_API_URL";
pub const FILE_URL: &str = "GEMINI_FILE_URL";

/// File name looked up in the working directory when no path is given.
pub const DEFAULT_FILE_NAME: &str = "env.json";

/// Raw settings; any key may be absent.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Settings {
    #[serde(rename = "GEMINI_API_KEY")]
    pub api_key: Option<String>,
    #[serde(rename = "GEMINI_API_URL")]
    pub api_url: Option<String>,
    #[serde(rename = "GEMINI_FILE_URL")]
    pub file_url: Option<String>,
}

/// Fully resolved settings needed for one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoints {
    pub api_key: String,
    /// Generation endpoint.
    pub generate_url: String,
    /// File service endpoint that starts resumable uploads.
    pub file_url: String,
}

impl Settings {
    /// Parse settings from JSON text.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("Parsing configuration JSON")
    }

    /// Read the file at `path` (if it exists) and apply environment
    /// overrides. A file that exists but does not parse is an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut settings = if path.exists() {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Reading configuration file {}", path.display()))?;
            Self::from_json(&text).with_context(|| format!("Invalid configuration in {}", path.display()))?
        } else {
            Settings::default()
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Replace values with those returned by `lookup`, when it has one.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(v) = non_empty(API_KEY) {
            self.api_key = Some(v);
        }
        if let Some(v) = non_empty(API_URL) {
            self.api_url = Some(v);
        }
        if let Some(v) = non_empty(FILE_URL) {
            self.file_url = Some(v);
        }
    }

    /// Names of the keys that are absent or empty.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        [(API_KEY, &self.api_key), (API_URL, &self.api_url), (FILE_URL, &self.file_url)]
            .into_iter()
            .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
            .map(|(key, _)| key)
            .collect()
    }

    /// Log each missing key; startup goes on regardless.
    pub fn warn_missing(&self) {
        for key in self.missing_keys() {
            warn!("{} is not set", key);
        }
    }

    /// Resolve into `Endpoints`, failing on the first missing key.
    pub fn require(&self) -> Result<Endpoints> {
        if let Some(key) = self.missing_keys().first().copied() {
            return Err(Error::ConfigMissing(key));
        }
        Ok(Endpoints {
            api_key: self.api_key.clone().unwrap_or_default(),
            generate_url: self.api_url.clone().unwrap_or_default(),
            file_url: self.file_url.clone().unwrap_or_default(),
        })
    }
}

/// Pick the configuration file: the explicit path, else `env.json` in the
/// working directory, else `<config dir>/gemini-upload/env.json`.
pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local = PathBuf::from(DEFAULT_FILE_NAME);
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .map(|dir| dir.join("gemini-upload").join(DEFAULT_FILE_NAME))
        .unwrap_or(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL: &str = r#"{
        "GEMINI_API_KEY": "secret",
        "GEMINI_API_URL": "https://api.example.com/generate",
        "GEMINI_FILE_URL": "https://api.example.com/upload",
        "UNRELATED": 1
    }"#;

    #[test]
    fn full_file_resolves_endpoints() {
        let settings = Settings::from_json(FULL).unwrap();
        let endpoints = settings.require().unwrap();
        assert_eq!(endpoints.api_key, "secret");
        assert_eq!(endpoints.generate_url, "https://api.example.com/generate");
        assert_eq!(endpoints.file_url, "https://api.example.com/upload");
    }

    #[test]
    fn missing_key_is_config_missing() {
        let settings = Settings::from_json(r#"{"GEMINI_API_KEY": "k", "GEMINI_API_URL": "u"}"#).unwrap();
        assert_eq!(settings.missing_keys(), vec![FILE_URL]);
        assert!(matches!(settings.require(), Err(Error::ConfigMissing(FILE_URL))));
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let settings = Settings::from_json(r#"{"GEMINI_API_KEY": "", "GEMINI_API_URL": "u", "GEMINI_FILE_URL": "f"}"#)
            .unwrap();
        assert!(matches!(settings.require(), Err(Error::ConfigMissing(API_KEY))));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut settings = Settings::from_json(FULL).unwrap();
        settings.apply_overrides(|key| (key == API_KEY).then(|| "from-env".to_string()));
        assert_eq!(settings.api_key.as_deref(), Some("from-env"));
        assert_eq!(settings.api_url.as_deref(), Some("https://api.example.com/generate"));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", FULL).unwrap();
        let settings = Settings::load(file.path()).unwrap();
        assert!(settings.api_url.is_some());
        assert!(settings.file_url.is_some());
    }

    #[test]
    fn load_rejects_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(Settings::load(file.path()).is_err());
    }

    #[test]
    fn explicit_path_wins() {
        let path = Path::new("/tmp/custom.json");
        assert_eq!(resolve_path(Some(path)), path);
    }
}
