//! Bot configuration
//!
//! Settings come from an optional TOML file and are then overridden by
//! environment variables (`SECRET_KEY`, `RELAY_URLS`, `POW`, ...). The result is
//! an explicit [`Settings`] value handed to the pipeline; nothing reads ambient
//! configuration after startup.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use triangles_core::Keys;

pub const DEFAULT_UPLOAD_URL: &str = "https://api.satellite.earth/v1/media/item";
pub const DEFAULT_TOPICS: &str = "nature,cathedral,outdoors,landscape,cafe,restaurante";
pub const DEFAULT_POSTING_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Fully resolved bot settings
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub secret_key: String,
    pub unsplash_client_id: String,
    pub unsplash_topics: Vec<String>,
    pub relay_urls: Vec<String>,
    pub additional_tags: Vec<String>,
    pub posting_interval: Duration,
    /// Required leading zero bits for the picture post
    pub pow: u8,
    /// Give up mining after this long; unbounded when `None`
    pub mining_timeout: Option<Duration>,
    pub relay_timeout: Duration,
    pub upload_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            unsplash_client_id: String::new(),
            unsplash_topics: split_list(DEFAULT_TOPICS),
            relay_urls: Vec::new(),
            additional_tags: Vec::new(),
            posting_interval: DEFAULT_POSTING_INTERVAL,
            pow: 0,
            mining_timeout: None,
            relay_timeout: DEFAULT_RELAY_TIMEOUT,
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("secret_key", &"<redacted>")
            .field("unsplash_client_id", &"<redacted>")
            .field("unsplash_topics", &self.unsplash_topics)
            .field("relay_urls", &self.relay_urls)
            .field("additional_tags", &self.additional_tags)
            .field("posting_interval", &self.posting_interval)
            .field("pow", &self.pow)
            .field("mining_timeout", &self.mining_timeout)
            .field("relay_timeout", &self.relay_timeout)
            .field("upload_url", &self.upload_url)
            .finish()
    }
}

/// On-disk form; durations are strings such as `"30m"` or `"1h30m"`
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileSettings {
    secret_key: Option<String>,
    unsplash_client_id: Option<String>,
    unsplash_topics: Option<Vec<String>>,
    relay_urls: Option<Vec<String>>,
    additional_tags: Option<Vec<String>>,
    posting_interval: Option<String>,
    pow: Option<u8>,
    mining_timeout: Option<String>,
    relay_timeout: Option<String>,
    upload_url: Option<String>,
}

impl Settings {
    /// Load from an optional TOML file, then apply process environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse TOML text on top of the defaults
    pub fn from_toml(text: &str) -> Result<Self> {
        let file: FileSettings = toml::from_str(text)?;
        let mut settings = Self::default();

        if let Some(v) = file.secret_key {
            settings.secret_key = v;
        }
        if let Some(v) = file.unsplash_client_id {
            settings.unsplash_client_id = v;
        }
        if let Some(v) = file.unsplash_topics {
            settings.unsplash_topics = v;
        }
        if let Some(v) = file.relay_urls {
            settings.relay_urls = v;
        }
        if let Some(v) = file.additional_tags {
            settings.additional_tags = v;
        }
        if let Some(v) = file.posting_interval {
            settings.posting_interval = parse_duration(&v).context("posting_interval")?;
        }
        if let Some(v) = file.pow {
            settings.pow = v;
        }
        if let Some(v) = file.mining_timeout {
            settings.mining_timeout = Some(parse_duration(&v).context("mining_timeout")?);
        }
        if let Some(v) = file.relay_timeout {
            settings.relay_timeout = parse_duration(&v).context("relay_timeout")?;
        }
        if let Some(v) = file.upload_url {
            settings.upload_url = v;
        }

        Ok(settings)
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SECRET_KEY") {
            self.secret_key = v;
        }
        if let Some(v) = lookup("UNSPLASH_CLIENT_ID") {
            self.unsplash_client_id = v;
        }
        if let Some(v) = lookup("UNSPLASH_TOPICS") {
            self.unsplash_topics = split_list(&v);
        }
        if let Some(v) = lookup("RELAY_URLS") {
            self.relay_urls = split_list(&v);
        }
        if let Some(v) = lookup("ADDITIONAL_TAGS") {
            self.additional_tags = split_list(&v);
        }
        if let Some(v) = lookup("POSTING_DURATION") {
            self.posting_interval = parse_duration(&v).context("POSTING_DURATION")?;
        }
        if let Some(v) = lookup("POW") {
            self.pow = v
                .trim()
                .parse()
                .with_context(|| format!("POW must be an integer between 0 and 255, got {v:?}"))?;
        }
        if let Some(v) = lookup("MINING_TIMEOUT") {
            self.mining_timeout = Some(parse_duration(&v).context("MINING_TIMEOUT")?);
        }
        if let Some(v) = lookup("RELAY_TIMEOUT") {
            self.relay_timeout = parse_duration(&v).context("RELAY_TIMEOUT")?;
        }
        if let Some(v) = lookup("UPLOAD_URL") {
            self.upload_url = v;
        }
        Ok(())
    }

    /// Reject configurations that can never produce a post
    pub fn validate(&self, allow_no_relays: bool) -> Result<()> {
        self.keys()?;
        if self.relay_urls.is_empty() && !allow_no_relays {
            bail!("No relays configured; set RELAY_URLS or relay_urls");
        }
        if self.posting_interval.is_zero() {
            bail!("Posting interval must be greater than zero");
        }
        if self.unsplash_client_id.is_empty() {
            bail!("No Unsplash client id configured; set UNSPLASH_CLIENT_ID");
        }
        url::Url::parse(&self.upload_url)
            .with_context(|| format!("Invalid upload URL: {}", self.upload_url))?;
        Ok(())
    }

    /// Parse the configured secret key
    pub fn keys(&self) -> Result<Keys> {
        Keys::parse(&self.secret_key).context("Invalid SECRET_KEY")
    }
}

/// Comma separated list with blanks dropped
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse durations like `90s`, `30m`, `1h30m` or `250ms`; a bare number is seconds
pub fn parse_duration(value: &str) -> Result<Duration> {
    let value = value.trim();
    if value.is_empty() {
        bail!("empty duration");
    }
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = value;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            bail!("invalid duration {value:?}: expected a number");
        }
        let amount: u64 = rest[..digits]
            .parse()
            .with_context(|| format!("invalid duration {value:?}"))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let part = match unit {
            "ms" => Some(Duration::from_millis(amount)),
            "s" => Some(Duration::from_secs(amount)),
            "m" => amount.checked_mul(60).map(Duration::from_secs),
            "h" => amount.checked_mul(60 * 60).map(Duration::from_secs),
            "" => bail!("invalid duration {value:?}: missing unit"),
            other => bail!("invalid duration {value:?}: unknown unit {other:?}"),
        };
        total = part
            .and_then(|part| total.checked_add(part))
            .with_context(|| format!("invalid duration {value:?}: out of range"))?;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TEST_SECRET: &str = "d217c1ff2f8a65c3e3a1740db3b9f58b8c848bb45e26d00ed4714e4a0f4ceecf";

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn valid() -> Settings {
        Settings {
            secret_key: TEST_SECRET.to_string(),
            unsplash_client_id: "client".to_string(),
            relay_urls: vec!["wss://nos.lol".to_string()],
            ..Settings::default()
        }
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("90").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("1h30").is_err());
        assert!(parse_duration("9999999999999999999h").is_err());
        assert!(parse_duration("18446744073709551615s1s").is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("wss://a, wss://b,,wss://a "),
            vec!["wss://a", "wss://b", "wss://a"]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.pow, 0);
        assert_eq!(settings.posting_interval, Duration::from_secs(3600));
        assert_eq!(settings.upload_url, DEFAULT_UPLOAD_URL);
        assert_eq!(settings.unsplash_topics.len(), 6);
        assert!(settings.mining_timeout.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[
                ("SECRET_KEY", TEST_SECRET),
                ("RELAY_URLS", "wss://a,wss://b"),
                ("ADDITIONAL_TAGS", "art,triangles"),
                ("POSTING_DURATION", "2h"),
                ("POW", "21"),
                ("MINING_TIMEOUT", "10m"),
            ]))
            .unwrap();

        assert_eq!(settings.secret_key, TEST_SECRET);
        assert_eq!(settings.relay_urls, vec!["wss://a", "wss://b"]);
        assert_eq!(settings.additional_tags, vec!["art", "triangles"]);
        assert_eq!(settings.posting_interval, Duration::from_secs(7200));
        assert_eq!(settings.pow, 21);
        assert_eq!(settings.mining_timeout, Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_bad_pow_env() {
        let mut settings = Settings::default();
        assert!(settings.apply_env(env(&[("POW", "300")])).is_err());
        assert!(settings.apply_env(env(&[("POW", "lots")])).is_err());
    }

    #[test]
    fn test_toml_file_then_env() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
secret_key = "{TEST_SECRET}"
unsplash_client_id = "from-file"
relay_urls = ["wss://file.example"]
posting_interval = "45m"
pow = 12
relay_timeout = "5s"
"#
        )
        .unwrap();
        file.flush().unwrap();

        let mut settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.unsplash_client_id, "from-file");
        assert_eq!(settings.posting_interval, Duration::from_secs(2700));
        assert_eq!(settings.relay_timeout, Duration::from_secs(5));
        assert_eq!(settings.pow, 12);

        settings.apply_env(env(&[("POW", "3")])).unwrap();
        assert_eq!(settings.pow, 3);
        assert_eq!(settings.relay_urls, vec!["wss://file.example"]);
    }

    #[test]
    fn test_unknown_toml_key_is_rejected() {
        assert!(Settings::from_toml("relays = []").is_err());
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate(false).is_ok());

        let no_relays = Settings {
            relay_urls: vec![],
            ..valid()
        };
        assert!(no_relays.validate(false).is_err());
        assert!(no_relays.validate(true).is_ok());

        let bad_key = Settings {
            secret_key: "nope".to_string(),
            ..valid()
        };
        assert!(bad_key.validate(false).is_err());

        let zero_interval = Settings {
            posting_interval: Duration::ZERO,
            ..valid()
        };
        assert!(zero_interval.validate(false).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", valid());
        assert!(!debug.contains(TEST_SECRET));
        assert!(debug.contains("<redacted>"));
    }
}
