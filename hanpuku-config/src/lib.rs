use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `HANPUKU_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os("HANPUKU_CONFIG") {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 提取行为配置。
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "ExtractionConfig::default_tag_prefix")]
    pub tag_prefix: String,
    #[serde(default = "ExtractionConfig::default_tag_value")]
    pub default_tag_value: String,
    #[serde(default = "ExtractionConfig::default_z_order_fallback")]
    pub z_order_fallback: i64,
    #[serde(default = "ExtractionConfig::enabled")]
    pub absorb_z_order_faults: bool,
    #[serde(default = "ExtractionConfig::enabled")]
    pub warn_unsupported_color: bool,
}

impl ExtractionConfig {
    fn default_tag_prefix() -> String {
        "id3_".to_string()
    }

    fn default_tag_value() -> String {
        "null".to_string()
    }

    fn default_z_order_fallback() -> i64 {
        100
    }

    fn enabled() -> bool {
        true
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            tag_prefix: Self::default_tag_prefix(),
            default_tag_value: Self::default_tag_value(),
            z_order_fallback: Self::default_z_order_fallback(),
            absorb_z_order_faults: true,
            warn_unsupported_color: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_returned_when_file_missing() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.extraction.tag_prefix, "id3_");
        assert_eq!(cfg.extraction.default_tag_value, "null");
        assert_eq!(cfg.extraction.z_order_fallback, 100);
        assert!(cfg.extraction.absorb_z_order_faults);
        assert!(cfg.extraction.warn_unsupported_color);
        assert!(!cfg.output.pretty);
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [logging]
            level = "debug"

            [extraction]
            tag_prefix = "d3_"
            z_order_fallback = -1
            warn_unsupported_color = false

            [output]
            pretty = true
            "#
        )
        .unwrap();

        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.extraction.tag_prefix, "d3_");
        assert_eq!(cfg.extraction.default_tag_value, "null");
        assert_eq!(cfg.extraction.z_order_fallback, -1);
        assert!(cfg.extraction.absorb_z_order_faults);
        assert!(!cfg.extraction.warn_unsupported_color);
        assert!(cfg.output.pretty);
    }

    #[test]
    fn invalid_toml_reports_path() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "[extraction\ntag_prefix = 1").unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = AppConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
