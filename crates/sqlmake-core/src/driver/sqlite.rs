use std::{fs, path::Path};

use rusqlite::{Connection, OpenFlags, types::ValueRef};

use super::{CellValue, DatabaseDriver, DatabaseSession, DriverError, RowSet, validate_sql};

#[derive(Debug, Clone, Copy)]
pub struct SQLiteDriver;

struct SQLiteSession {
    conn: Connection,
}

impl SQLiteSession {
    fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

impl DatabaseSession for SQLiteSession {
    fn ping(&mut self) -> Result<(), DriverError> {
        self.conn
            .query_row("SELECT 1", [], |_| Ok::<_, rusqlite::Error>(()))
            .map_err(|err| DriverError::Other(format!("校验查询失败: {}", err)))?;
        Ok(())
    }

    fn query(
        &mut self,
        sql: &str,
    ) -> Result<RowSet, DriverError> {
        validate_sql(sql)?;
        // 末尾分号之后的空白会被 SQLite 视为第二条语句
        let sql = sql.trim_end().trim_end_matches(';');

        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|err| DriverError::Other(format!("准备查询失败: {}", err)))?;
        let cols = stmt.column_names().iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let mut rows = stmt
            .query([])
            .map_err(|err| DriverError::Other(format!("执行查询失败: {}", err)))?;

        let mut records = vec![];
        while let Some(row) = rows
            .next()
            .map_err(|err| DriverError::Other(format!("读取结果失败: {}", err)))?
        {
            let mut record = Vec::with_capacity(cols.len());
            for (idx, name) in cols.iter().enumerate() {
                let value = row
                    .get_ref(idx)
                    .map_err(|err| DriverError::Other(format!("读取列 {name} 失败: {}", err)))?;
                record.push(parse_value(value));
            }
            records.push(record);
        }

        Ok(RowSet { cols, rows: records })
    }
}

impl DatabaseDriver for SQLiteDriver {
    fn open(
        &self,
        dsn: &str,
    ) -> Result<Box<dyn DatabaseSession>, DriverError> {
        let conn = open_conn(dsn)?;
        Ok(Box::new(SQLiteSession::new(conn)))
    }
}

/// 解析 `file:path?mode=ro` 形式的连接字符串
fn parse_dsn(dsn: &str) -> (&str, bool) {
    let dsn = dsn.trim();
    let dsn = dsn.strip_prefix("file:").unwrap_or(dsn);
    match dsn.split_once('?') {
        Some((path, query)) => (path, query.split('&').any(|kv| kv == "mode=ro")),
        None => (dsn, false),
    }
}

fn open_conn(dsn: &str) -> Result<Connection, DriverError> {
    let (path_str, readonly) = parse_dsn(dsn);
    if path_str.is_empty() {
        return Err(DriverError::MissingField("DATASOCURE".into()));
    }
    if path_str == ":memory:" {
        return Connection::open_in_memory()
            .map_err(|err| DriverError::Other(format!("打开 SQLite 失败: {}", err)));
    }

    let path = Path::new(path_str);

    if readonly {
        if !path.exists() {
            return Err(DriverError::InvalidField(format!("{} 不存在", path_str)));
        }
    } else if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| DriverError::Other(format!("创建目录失败: {}", err)))?;
        }
    }

    let flags = if readonly {
        OpenFlags::SQLITE_OPEN_READ_ONLY
    } else {
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
    };

    Connection::open_with_flags(path, flags).map_err(|err| DriverError::Other(format!("打开 SQLite 失败: {}", err)))
}

fn parse_value(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(int) => CellValue::Int(int),
        ValueRef::Real(real) => CellValue::Float(real),
        ValueRef::Text(text) => CellValue::Text(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => {
            // Blob 显示为十六进制字符串
            CellValue::Text(blob.iter().map(|b| format!("{:02x}", b)).collect::<String>())
        }
    }
}
