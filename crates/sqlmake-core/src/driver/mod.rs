use std::{fmt, str::FromStr};

pub use self::mysql::MySQLDriver;
pub use self::postgres::PostgresDriver;
pub use self::sqlite::SQLiteDriver;
pub use self::sqlserver::SQLServerDriver;

mod mysql;
mod postgres;
mod sqlite;
mod sqlserver;

/// 单元格值
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Int(int) => write!(f, "{}", int),
            CellValue::Float(float) => write!(f, "{}", float),
            CellValue::Text(text) => f.write_str(text),
        }
    }
}

/// 查询结果集，列顺序与查询结果一致
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowSet {
    pub cols: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RowSet {
    pub fn new(cols: Vec<String>) -> Self {
        Self { cols, rows: vec![] }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("{0}")]
    Other(String),
    #[error("配置字段缺失: {0}")]
    MissingField(String),
    #[error("配置字段非法: {0}")]
    InvalidField(String),
    #[error("{0} 驱动暂未实现")]
    Unsupported(String),
}

pub trait DatabaseDriver {
    fn open(
        &self,
        dsn: &str,
    ) -> Result<Box<dyn DatabaseSession>, DriverError>;
}

pub trait DatabaseSession: Send {
    fn ping(&mut self) -> Result<(), DriverError>;

    fn query(
        &mut self,
        sql: &str,
    ) -> Result<RowSet, DriverError>;
}

/// 由 DRIVER 配置选择的驱动
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    MySQL,
    Postgres,
    SQLite,
    SQLServer,
    Odbc,
}

impl DriverKind {
    pub fn label(&self) -> &'static str {
        match self {
            DriverKind::MySQL => "MySQL",
            DriverKind::Postgres => "PostgreSQL",
            DriverKind::SQLite => "SQLite",
            DriverKind::SQLServer => "SQLServer",
            DriverKind::Odbc => "ODBC",
        }
    }
}

impl FromStr for DriverKind {
    type Err = DriverError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_lowercase().as_str() {
            "mysql" => Ok(DriverKind::MySQL),
            "postgres" | "postgresql" | "pg" => Ok(DriverKind::Postgres),
            "sqlite3" | "sqlite" => Ok(DriverKind::SQLite),
            "sqlserver" | "mssql" => Ok(DriverKind::SQLServer),
            "odbc" => Ok(DriverKind::Odbc),
            "" => Err(DriverError::MissingField("DRIVER".into())),
            other => Err(DriverError::InvalidField(format!("未知的 DRIVER: {}", other))),
        }
    }
}

pub fn create_connection(
    kind: DriverKind,
    dsn: &str,
) -> Result<Box<dyn DatabaseSession>, DriverError> {
    match kind {
        DriverKind::MySQL => MySQLDriver.open(dsn),
        DriverKind::Postgres => PostgresDriver.open(dsn),
        DriverKind::SQLite => SQLiteDriver.open(dsn),
        DriverKind::SQLServer => SQLServerDriver.open(dsn),
        DriverKind::Odbc => Err(DriverError::Unsupported(kind.label().into())),
    }
}

/// 打开连接并 ping，失败即返回
pub fn check_connection(
    kind: DriverKind,
    dsn: &str,
) -> Result<Box<dyn DatabaseSession>, DriverError> {
    let mut session = create_connection(kind, dsn)?;
    session.ping()?;
    Ok(session)
}

pub fn validate_sql(sql: &str) -> Result<(), DriverError> {
    if sql.trim().is_empty() {
        return Err(DriverError::InvalidField("sql".into()));
    }
    Ok(())
}
