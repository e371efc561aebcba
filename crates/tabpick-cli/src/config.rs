// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tabpick_app::{DEFAULT_ICON_PATH, DEFAULT_ROW_TOGGLE_SRC, RenderOptions, SessionOptions};
use tabpick_http::Method;

pub const APP_NAME: &str = "tabpick";
const CONFIG_VERSION: i64 = 1;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub table: TableSection,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub submit: Submit,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            table: TableSection::default(),
            ui: Ui::default(),
            submit: Submit::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableSection {
    pub delimiter: Option<String>,
    pub first_row: Option<usize>,
    pub first_column: Option<usize>,
}

impl Default for TableSection {
    fn default() -> Self {
        Self {
            delimiter: Some(",".to_owned()),
            first_row: Some(1),
            first_column: Some(1),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub icon_path: Option<String>,
    pub row_toggle_src: Option<String>,
    pub click_nags: Option<bool>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            icon_path: Some(DEFAULT_ICON_PATH.to_owned()),
            row_toggle_src: Some(DEFAULT_ROW_TOGGLE_SRC.to_owned()),
            click_nags: Some(false),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Submit {
    pub url: Option<String>,
    pub method: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub path: Option<String>,
    pub level: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("TABPICK_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set TABPICK_CONFIG_PATH to the config file")
        })?;

        Ok(config_root.join(APP_NAME).join("config.toml"))
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
                    "config file {} is not versioned. Add `version = 1` and put values under [table], [ui], [submit] and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
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
        if let Some(delimiter) = &self.table.delimiter {
            parse_delimiter(delimiter).with_context(|| {
                format!("table.delimiter in {} is invalid", path.display())
            })?;
        }

        for (key, value) in [
            ("table.first_row", self.table.first_row),
            ("table.first_column", self.table.first_column),
        ] {
            if value == Some(0) {
                bail!(
                    "{key} in {} must be at least 1, got 0",
                    path.display()
                );
            }
        }

        if let Some(method) = &self.submit.method
            && !matches!(method.as_str(), "GET" | "POST")
        {
            bail!(
                "submit.method in {} must be \"GET\" or \"POST\", got {method:?}",
                path.display()
            );
        }

        if let Some(url) = &self.submit.url {
            tabpick_http::submission_url(url, &Default::default()).with_context(|| {
                format!("submit.url in {} is not usable", path.display())
            })?;
        }

        if let Some(timeout) = &self.submit.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "submit.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(level) = &self.log.level
            && !LOG_LEVELS.contains(&level.as_str())
        {
            bail!(
                "log.level in {} must be one of {}, got {level:?}",
                path.display(),
                LOG_LEVELS.join(", ")
            );
        }

        Ok(())
    }

    pub fn delimiter(&self) -> Result<u8> {
        parse_delimiter(self.table.delimiter.as_deref().unwrap_or(","))
    }

    pub fn first_row(&self) -> usize {
        self.table.first_row.unwrap_or(1)
    }

    pub fn first_column(&self) -> usize {
        self.table.first_column.unwrap_or(1)
    }

    pub fn render_options(&self) -> RenderOptions {
        let defaults = RenderOptions::default();
        RenderOptions {
            icon_path: self.ui.icon_path.clone().unwrap_or(defaults.icon_path),
            row_toggle_src: self
                .ui
                .row_toggle_src
                .clone()
                .unwrap_or(defaults.row_toggle_src),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            click_nags: self.ui.click_nags.unwrap_or(false),
        }
    }

    pub fn submit_url(&self) -> Option<&str> {
        self.submit.url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn submit_method(&self) -> Method {
        Method::from_name(self.submit.method.as_deref().unwrap_or("GET"))
    }

    /// `None` means requests wait indefinitely.
    pub fn submit_timeout(&self) -> Result<Option<Duration>> {
        self.submit.timeout.as_deref().map(parse_duration).transpose()
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log
            .path
            .as_deref()
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or("info")
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# tabpick config\n# Place this file at: {}\n\nversion = 1\n\n[table]\ndelimiter = \",\"\n# Row and column numbers of the first table cell.\nfirst_row = 1\nfirst_column = 1\n\n[ui]\nicon_path = \"{}\"\nrow_toggle_src = \"{}\"\nclick_nags = false\n\n[submit]\n# Optional. hlist and plist are appended as query parameters.\n# url = \"http://localhost:8080/convert\"\nmethod = \"GET\"\n# timeout = \"10s\"\n\n[log]\n# Optional. Without a path nothing is logged while the editor runs.\n# path = \"/tmp/tabpick.log\"\nlevel = \"info\"\n",
            path.display(),
            DEFAULT_ICON_PATH,
            DEFAULT_ROW_TOGGLE_SRC,
        )
    }
}

fn parse_delimiter(raw: &str) -> Result<u8> {
    match raw {
        "\\t" | "tab" => Ok(b'\t'),
        _ => match raw.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => bail!("delimiter {raw:?} must be a single ASCII character or \"tab\""),
        },
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        let secs = mins
            .checked_mul(60)
            .ok_or_else(|| anyhow!("timeout duration {raw:?} is too large"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}
