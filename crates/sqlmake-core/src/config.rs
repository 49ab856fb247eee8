use std::{env, path::Path};

use thiserror::Error;
use tracing::Level;

use crate::MakeMode;

pub const DOTENV_FILE: &str = ".env";

pub const KEY_DRIVER: &str = "DRIVER";
pub const KEY_DATASOURCE: &str = "DATASOCURE";
pub const KEY_WRITE_HEADER: &str = "WRITEHEADER";
pub const KEY_FILE_TYPE: &str = "FILE_TYPE";
pub const KEY_MAKE_MODE: &str = "MAKE_MODE";
pub const KEY_BACKUP_FILE: &str = "BACKUP_FILE";
pub const KEY_DISPLAY_MODE: &str = "DISPLAY_MODE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("载入设定档出问题: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

/// 产出文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    #[default]
    Csv,
    Xlsx,
}

impl FileType {
    pub fn all() -> &'static [FileType] {
        &[FileType::Csv, FileType::Xlsx]
    }

    /// `xlsx` 之外的值一律按 CSV 处理
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("xlsx") {
            FileType::Xlsx
        } else {
            FileType::Csv
        }
    }

    /// 扩展名，同时也是输出目录名
    pub fn ext(&self) -> &'static str {
        match self {
            FileType::Csv => "csv",
            FileType::Xlsx => "xlsx",
        }
    }
}

/// 日志流
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Info,
    Error,
    Debug,
}

impl LogStream {
    /// warn 与 error 同属错误流
    pub fn of(level: &Level) -> Self {
        match *level {
            Level::ERROR | Level::WARN => LogStream::Error,
            Level::INFO => LogStream::Info,
            _ => LogStream::Debug,
        }
    }
}

/// 控制哪些日志流同时输出到终端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    ShowAll,
    ShowInfo,
    ShowError,
    HideAll,
}

impl DisplayMode {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "SHOW_INFO" => DisplayMode::ShowInfo,
            "SHOW_ERROR" => DisplayMode::ShowError,
            "HIDE_ALL" => DisplayMode::HideAll,
            _ => DisplayMode::ShowAll,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DisplayMode::ShowAll => "SHOW_ALL",
            DisplayMode::ShowInfo => "SHOW_INFO",
            DisplayMode::ShowError => "SHOW_ERROR",
            DisplayMode::HideAll => "HIDE_ALL",
        }
    }

    pub fn to_stdout(
        &self,
        stream: LogStream,
    ) -> bool {
        matches!(
            (self, stream),
            (DisplayMode::ShowAll, _) | (DisplayMode::ShowInfo, LogStream::Info)
        )
    }

    pub fn to_stderr(
        &self,
        stream: LogStream,
    ) -> bool {
        matches!(
            (self, stream),
            (DisplayMode::ShowInfo | DisplayMode::ShowError, LogStream::Error)
        )
    }

    /// info.log 收录 info 与 error，debug 只在 SHOW_ALL / SHOW_INFO 下保留
    pub fn to_info_log(
        &self,
        stream: LogStream,
    ) -> bool {
        match stream {
            LogStream::Debug => matches!(self, DisplayMode::ShowAll | DisplayMode::ShowInfo),
            LogStream::Info | LogStream::Error => true,
        }
    }

    pub fn to_error_log(
        &self,
        stream: LogStream,
    ) -> bool {
        stream == LogStream::Error
    }
}

/// 运行配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeConfig {
    pub driver: String,
    pub datasource: String,
    pub write_header: bool,
    pub file_type: FileType,
    pub make_mode: MakeMode,
    pub backup: bool,
    pub display_mode: DisplayMode,
}

impl Default for MakeConfig {
    fn default() -> Self {
        Self {
            driver: String::new(),
            datasource: String::new(),
            write_header: false,
            file_type: FileType::Csv,
            make_mode: MakeMode::All,
            backup: false,
            display_mode: DisplayMode::ShowAll,
        }
    }
}

impl MakeConfig {
    /// 载入当前目录下的 `.env`，缺失即报错
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_in(Path::new("."))
    }

    /// 只读取 `dir/.env`，不向上层目录查找
    pub fn load_in(dir: &Path) -> Result<Self, ConfigError> {
        Self::load_from(&dir.join(DOTENV_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        dotenvy::from_path(path)?;
        Ok(Self::from_env())
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).unwrap_or_default();

        Self {
            driver: get(KEY_DRIVER).trim().to_string(),
            datasource: get(KEY_DATASOURCE).trim().to_string(),
            write_header: is_true(&get(KEY_WRITE_HEADER)),
            file_type: FileType::parse(&get(KEY_FILE_TYPE)),
            make_mode: MakeMode::parse(&get(KEY_MAKE_MODE)),
            backup: is_true(&get(KEY_BACKUP_FILE)),
            display_mode: DisplayMode::parse(&get(KEY_DISPLAY_MODE)),
        }
    }
}

fn is_true(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}
