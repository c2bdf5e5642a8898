// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use chatfold_app::{AccountId, AutoScrollConfig, GestureConfig, OrganizerConfig};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_ACCOUNT_ID: i64 = 1;
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_CLICK_THRESHOLD: i32 = 1;
const DEFAULT_SCROLL_EDGE: i32 = 1;
const DEFAULT_SCROLL_STEP: i32 = 1;
const DEFAULT_SCROLL_INTERVAL: &str = "60ms";
const DEFAULT_CLICK_SUPPRESS: &str = "100ms";
const TERMINAL_HOTSPOT: i32 = 1;
const TERMINAL_GUTTER: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Api,
    Local,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub gesture: Gesture,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            backend: Backend::default(),
            gesture: Gesture::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Backend {
    pub mode: Option<String>,
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub account_id: Option<i64>,
    pub timeout: Option<String>,
    pub db_path: Option<String>,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            mode: Some("api".to_owned()),
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            token: None,
            account_id: Some(DEFAULT_ACCOUNT_ID),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
            db_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Gesture {
    pub click_threshold: Option<i32>,
    pub scroll_edge: Option<i32>,
    pub scroll_step: Option<i32>,
    pub scroll_interval: Option<String>,
    pub click_suppress: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("CHATFOLD_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set CHATFOLD_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(chatfold_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and move values under [backend], [gesture], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1. Run `chatfold --print-example-config` for the current layout",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        self.backend_mode()
            .with_context(|| format!("invalid [backend] in {}", path.display()))?;

        if let Some(account_id) = self.backend.account_id
            && account_id <= 0
        {
            bail!(
                "backend.account_id in {} must be positive, got {}",
                path.display(),
                account_id
            );
        }

        if let Some(db_path) = &self.backend.db_path {
            chatfold_db::validate_db_path(db_path)?;
        }

        for (key, raw) in [
            ("backend.timeout", self.backend.timeout.as_deref()),
            ("gesture.scroll_interval", self.gesture.scroll_interval.as_deref()),
            ("gesture.click_suppress", self.gesture.click_suppress.as_deref()),
        ] {
            let Some(raw) = raw else {
                continue;
            };
            if parse_duration(raw)? <= Duration::ZERO {
                bail!("{key} in {} must be positive, got {raw}", path.display());
            }
        }

        for (key, value, minimum) in [
            ("gesture.click_threshold", self.gesture.click_threshold, 0),
            ("gesture.scroll_edge", self.gesture.scroll_edge, 0),
            ("gesture.scroll_step", self.gesture.scroll_step, 1),
        ] {
            if let Some(value) = value
                && value < minimum
            {
                bail!(
                    "{key} in {} must be at least {minimum}, got {value}",
                    path.display()
                );
            }
        }

        Ok(())
    }

    pub fn backend_mode(&self) -> Result<BackendMode> {
        match self.backend.mode.as_deref().map(str::trim) {
            None | Some("api") => Ok(BackendMode::Api),
            Some("local") => Ok(BackendMode::Local),
            Some(other) => {
                bail!("backend.mode {other:?} is not supported; use \"api\" or \"local\"")
            }
        }
    }

    pub fn base_url(&self) -> &str {
        self.backend
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn token(&self) -> Option<&str> {
        self.backend.token.as_deref()
    }

    pub fn account(&self) -> AccountId {
        AccountId::new(self.backend.account_id.unwrap_or(DEFAULT_ACCOUNT_ID))
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.backend.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.backend.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => chatfold_db::default_db_path(),
        }
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }

        let data_root = dirs::data_local_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [log].file to a writable path")
        })?;
        let app_dir = data_root.join(chatfold_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create log directory {}", app_dir.display()))?;
        Ok(app_dir.join("chatfold.log"))
    }

    /// Gesture tuning in terminal cells.
    pub fn organizer_config(&self) -> Result<OrganizerConfig> {
        let gesture = &self.gesture;
        let scroll = AutoScrollConfig {
            edge: gesture.scroll_edge.unwrap_or(DEFAULT_SCROLL_EDGE),
            interval: parse_duration(
                gesture
                    .scroll_interval
                    .as_deref()
                    .unwrap_or(DEFAULT_SCROLL_INTERVAL),
            )?,
            step: gesture.scroll_step.unwrap_or(DEFAULT_SCROLL_STEP),
        };
        let click_suppress = parse_duration(
            gesture
                .click_suppress
                .as_deref()
                .unwrap_or(DEFAULT_CLICK_SUPPRESS),
        )?;

        Ok(OrganizerConfig {
            gesture: GestureConfig {
                click_threshold: gesture.click_threshold.unwrap_or(DEFAULT_CLICK_THRESHOLD),
                click_suppress,
                hotspot: TERMINAL_HOTSPOT,
                scroll,
            },
            folder_scroll: scroll,
            row_height: 1,
            gutter: TERMINAL_GUTTER,
        })
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# chatfold config\n# Place this file at: {}\n\nversion = 1\n\n[backend]\n# \"api\" talks to the chat service; \"local\" uses a SQLite file.\nmode = \"api\"\nbase_url = \"{}\"\n# token = \"...\"\naccount_id = {}\ntimeout = \"{}\"\n# Local mode only. Default is platform data dir (for example ~/.local/share/chatfold/chatfold.db)\n# db_path = \"/absolute/path/to/chatfold.db\"\n\n[gesture]\nclick_threshold = {}\nscroll_edge = {}\nscroll_step = {}\nscroll_interval = \"{}\"\nclick_suppress = \"{}\"\n\n[log]\nlevel = \"{}\"\n# file = \"/absolute/path/to/chatfold.log\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_ACCOUNT_ID,
            DEFAULT_TIMEOUT,
            DEFAULT_CLICK_THRESHOLD,
            DEFAULT_SCROLL_EDGE,
            DEFAULT_SCROLL_STEP,
            DEFAULT_SCROLL_INTERVAL,
            DEFAULT_CLICK_SUPPRESS,
            DEFAULT_LOG_LEVEL,
        )
    }
}

/// Accepts `<N>ms`, `<N>s` or `<N>m`.
fn parse_duration(raw: &str) -> Result<Duration> {
    const UNITS: [(&str, u64); 3] = [("ms", 1), ("s", 1_000), ("m", 60_000)];

    let raw = raw.trim();
    let (count, millis_per_unit) = UNITS
        .iter()
        .find_map(|&(suffix, scale)| raw.strip_suffix(suffix).map(|count| (count, scale)))
        .ok_or_else(|| anyhow!("duration {raw:?} has no unit; write it like 60ms, 10s or 2m"))?;
    let count: u64 = count
        .parse()
        .with_context(|| format!("duration {raw:?} needs a whole number before the unit"))?;
    let millis = count
        .checked_mul(millis_per_unit)
        .ok_or_else(|| anyhow!("duration {raw:?} is too large"))?;
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::{BackendMode, Config, parse_duration};
    use anyhow::Result;
    use chatfold_app::AccountId;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_terminal_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.backend_mode()?, BackendMode::Api);
        assert_eq!(config.account(), AccountId::new(1));

        let organizer = config.organizer_config()?;
        assert_eq!(organizer.gesture.click_threshold, 1);
        assert_eq!(organizer.gesture.hotspot, 1);
        assert_eq!(organizer.gesture.scroll.edge, 1);
        assert_eq!(organizer.gesture.scroll.interval, Duration::from_millis(60));
        assert_eq!(organizer.gesture.click_suppress, Duration::from_millis(100));
        assert_eq!(organizer.folder_scroll, organizer.gesture.scroll);
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[backend]\nmode = \"local\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[backend], [gesture], and [log]"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[backend]\nmode = \"local\"\nbase_url = \"http://chat.local/\"\ntoken = \"t0k\"\naccount_id = 4\ntimeout = \"2m\"\ndb_path = \"/tmp/chatfold.db\"\n[gesture]\nclick_threshold = 2\nscroll_edge = 3\nscroll_step = 2\nscroll_interval = \"40ms\"\n[log]\nlevel = \"debug\"\nfile = \"/tmp/chatfold.log\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.backend_mode()?, BackendMode::Local);
        assert_eq!(config.base_url(), "http://chat.local");
        assert_eq!(config.token(), Some("t0k"));
        assert_eq!(config.account(), AccountId::new(4));
        assert_eq!(config.timeout()?, Duration::from_secs(120));
        assert_eq!(config.db_path()?, PathBuf::from("/tmp/chatfold.db"));
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.log_file()?, PathBuf::from("/tmp/chatfold.log"));

        let organizer = config.organizer_config()?;
        assert_eq!(organizer.gesture.click_threshold, 2);
        assert_eq!(organizer.gesture.scroll.edge, 3);
        assert_eq!(organizer.gesture.scroll.step, 2);
        assert_eq!(organizer.gesture.scroll.interval, Duration::from_millis(40));
        Ok(())
    }

    #[test]
    fn unknown_backend_mode_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[backend]\nmode = \"grpc\"\n")?;
        let error = Config::load(&path).expect_err("unknown mode should fail");
        let message = format!("{error:#}");
        assert!(message.contains("use \"api\" or \"local\""), "{message}");
        Ok(())
    }

    #[test]
    fn non_positive_values_are_rejected() -> Result<()> {
        for content in [
            "version = 1\n[backend]\naccount_id = 0\n",
            "version = 1\n[backend]\ntimeout = \"0s\"\n",
            "version = 1\n[gesture]\nscroll_interval = \"0ms\"\n",
            "version = 1\n[gesture]\nscroll_step = 0\n",
            "version = 1\n[gesture]\nclick_threshold = -1\n",
        ] {
            let (_temp, path) = write_config(content)?;
            let error = Config::load(&path).expect_err("invalid value should fail");
            let message = error.to_string();
            assert!(
                message.contains("must be positive") || message.contains("must be at least"),
                "unexpected message for {content:?}: {message}"
            );
        }
        Ok(())
    }

    #[test]
    fn db_path_rejects_uri_style_value() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[backend]\ndb_path = \"https://evil.example/chat.db\"\n")?;
        assert!(Config::load(&path).is_err());
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("CHATFOLD_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("CHATFOLD_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn db_path_uses_env_override_when_unset_in_config() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("CHATFOLD_DB_PATH", "/from/env-only.db");
        }
        let config = Config::load(&path)?;
        let resolved = config.db_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("CHATFOLD_DB_PATH");
        }
        assert_eq!(resolved, PathBuf::from("/from/env-only.db"));
        Ok(())
    }

    #[test]
    fn durations_parse_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("60ms")?, Duration::from_millis(60));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("soon").is_err());
        Ok(())
    }

    #[test]
    fn example_config_round_trips_through_load() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, Config::example_config(&path))?;

        let config = Config::load(&path)?;
        assert_eq!(config.backend_mode()?, BackendMode::Api);
        assert_eq!(config.organizer_config()?, Config::default().organizer_config()?);
        Ok(())
    }
}
