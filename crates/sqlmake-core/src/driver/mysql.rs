use mysql::{Conn, Opts, Value, prelude::Queryable};

use super::{CellValue, DatabaseDriver, DatabaseSession, DriverError, RowSet, validate_sql};

#[derive(Debug, Clone, Copy)]
pub struct MySQLDriver;

impl DatabaseDriver for MySQLDriver {
    fn open(
        &self,
        dsn: &str,
    ) -> Result<Box<dyn DatabaseSession>, DriverError> {
        let conn = open_conn(dsn)?;
        Ok(Box::new(MySQLSession::new(conn)))
    }
}

struct MySQLSession {
    conn: Conn,
}

impl MySQLSession {
    fn new(conn: Conn) -> Self {
        Self { conn }
    }
}

impl DatabaseSession for MySQLSession {
    fn ping(&mut self) -> Result<(), DriverError> {
        self.conn
            .ping()
            .map_err(|err| DriverError::Other(format!("ping 失败: {}", err)))?;
        Ok(())
    }

    fn query(
        &mut self,
        sql: &str,
    ) -> Result<RowSet, DriverError> {
        validate_sql(sql)?;
        tracing::debug!(sql = %sql);

        let mut result = self
            .conn
            .query_iter(sql)
            .map_err(|err| DriverError::Other(format!("执行查询失败: {}", err)))?;

        let cols: Vec<String> = result
            .columns()
            .as_ref()
            .iter()
            .map(|col| col.name_str().to_string())
            .collect();

        let mut records: Vec<Vec<CellValue>> = vec![];
        for row in result.by_ref() {
            let row = row.map_err(|err| DriverError::Other(format!("读取结果失败: {}", err)))?;
            records.push(row.unwrap().into_iter().map(parse_value).collect());
        }

        Ok(RowSet { cols, rows: records })
    }
}

fn open_conn(dsn: &str) -> Result<Conn, DriverError> {
    let dsn = dsn.trim();
    if dsn.is_empty() {
        return Err(DriverError::MissingField("DATASOCURE".into()));
    }

    let opts = Opts::from_url(dsn).map_err(|err| DriverError::InvalidField(format!("连接字符串解析失败: {}", err)))?;
    Conn::new(opts).map_err(|err| DriverError::Other(format!("连接失败: {}", err)))
}

fn parse_value(value: Value) -> CellValue {
    match value {
        Value::NULL => CellValue::Null,
        Value::Bytes(bytes) => CellValue::Text(String::from_utf8_lossy(&bytes).into_owned()),
        Value::Int(int) => CellValue::Int(int),
        Value::UInt(uint) => match i64::try_from(uint) {
            Ok(int) => CellValue::Int(int),
            Err(_) => CellValue::Text(uint.to_string()),
        },
        Value::Float(float) => CellValue::Float(float as f64),
        Value::Double(double) => CellValue::Float(double),
        Value::Date(year, month, day, hour, minute, second, micros) => CellValue::Text(format!(
            "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micros:06}"
        )),
        Value::Time(neg, days, hours, minutes, seconds, micros) => {
            let sign = if neg { "-" } else { "" };
            CellValue::Text(format!("{sign}{days} {hours:02}:{minutes:02}:{seconds:02}.{micros:06}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_dsn_is_missing() {
        assert!(matches!(open_conn("  "), Err(DriverError::MissingField(_))));
    }

    #[test]
    fn non_url_dsn_is_invalid() {
        assert!(matches!(
            open_conn("user:pass@tcp(localhost:3306)/db"),
            Err(DriverError::InvalidField(_))
        ));
    }

    #[test]
    fn values_map_to_cells() {
        assert_eq!(parse_value(Value::NULL), CellValue::Null);
        assert_eq!(parse_value(Value::Bytes(b"abc".to_vec())), CellValue::Text("abc".into()));
        assert_eq!(parse_value(Value::UInt(7)), CellValue::Int(7));
        assert_eq!(parse_value(Value::UInt(u64::MAX)), CellValue::Text(u64::MAX.to_string()));
        assert_eq!(
            parse_value(Value::Date(2024, 1, 2, 3, 4, 5, 0)),
            CellValue::Text("2024-01-02 03:04:05.000000".into())
        );
    }
}
