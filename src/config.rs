use clap::ValueEnum;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_LOGSTASH: &str = "http://logstash:31311";
pub const DEFAULT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_PROC_ROOT: &str = "/proc";
pub const DEFAULT_VOLUME: &str = "/";

#[derive(Debug, Clone)]
pub struct Config {
    pub logstash: Url,
    pub interval_secs: u64,
    pub hostname: String,
    pub level: LogLevel,
    pub proc_root: PathBuf,
    pub volumes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialConfig {
    pub logstash: Option<String>,
    pub interval_secs: Option<u64>,
    pub hostname: Option<String>,
    pub level: Option<LogLevel>,
    pub proc_root: Option<PathBuf>,
    pub volumes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    #[serde(alias = "debug")]
    Debug,
    #[default]
    #[serde(alias = "info")]
    Info,
    #[serde(alias = "warn")]
    Warn,
    #[serde(alias = "error")]
    Error,
    #[serde(alias = "fatal")]
    Fatal,
}

impl LogLevel {
    pub fn filter_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error | LogLevel::Fatal => "error",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("не удалось прочитать файл конфигурации {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("не удалось разобрать YAML в {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("missing option '-hostname'")]
    MissingHostname,
    #[error("ошибка валидации конфигурации: {0}")]
    Validation(String),
}

impl PartialConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })
    }

    pub fn overlay(self, top: PartialConfig) -> PartialConfig {
        PartialConfig {
            logstash: top.logstash.or(self.logstash),
            interval_secs: top.interval_secs.or(self.interval_secs),
            hostname: top.hostname.or(self.hostname),
            level: top.level.or(self.level),
            proc_root: top.proc_root.or(self.proc_root),
            volumes: if top.volumes.is_empty() {
                self.volumes
            } else {
                top.volumes
            },
        }
    }
}

impl Config {
    pub fn resolve(file: PartialConfig, cli: PartialConfig) -> Result<Self, ConfigError> {
        let merged = file.overlay(cli);

        let hostname = merged
            .hostname
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingHostname)?;

        let logstash_raw = merged
            .logstash
            .unwrap_or_else(|| DEFAULT_LOGSTASH.to_string());
        let logstash = Url::parse(logstash_raw.trim()).map_err(|err| {
            ConfigError::Validation(format!(
                "logstash '{logstash_raw}' не является корректным URL: {err}"
            ))
        })?;

        let volumes = if merged.volumes.is_empty() {
            vec![DEFAULT_VOLUME.to_string()]
        } else {
            merged.volumes
        };

        let cfg = Config {
            logstash,
            interval_secs: merged.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS),
            hostname,
            level: merged.level.unwrap_or_default(),
            proc_root: merged
                .proc_root
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT)),
            volumes,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.logstash.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "logstash должен использовать http или https, получено '{}'",
                self.logstash.scheme()
            )));
        }
        if self.interval_secs < 1 {
            return Err(ConfigError::Validation(
                "interval должен быть >= 1".to_string(),
            ));
        }
        if self.volumes.iter().any(|v| v.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "путь тома не должен быть пустым".to_string(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}
