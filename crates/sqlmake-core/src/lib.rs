// 核心模块导出
pub mod backup;
pub mod config;
pub mod driver;
pub mod export;
pub mod make;
pub mod paths;
pub mod pipeline;
pub mod scan;

// 重新导出常用类型
pub use driver::{
    CellValue, DatabaseDriver, DatabaseSession, DriverError, DriverKind, RowSet, check_connection, create_connection,
};

pub use backup::{BackupError, backup_name};
pub use config::{ConfigError, DisplayMode, FileType, LogStream, MakeConfig};
pub use export::ExportError;
pub use make::{Decision, MakeMode, SkipReason, decide, needs_backup};
pub use paths::Layout;
pub use pipeline::{FileOutcome, RunError, RunReport, connect, run};
pub use scan::{OutputIndex, ScanError, SourceQuery, list_sources};
