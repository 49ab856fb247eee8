use postgres::{Client, Config, NoTls, SimpleQueryMessage, types::Type};

use super::{CellValue, DatabaseDriver, DatabaseSession, DriverError, RowSet, validate_sql};

#[derive(Debug, Clone, Copy)]
pub struct PostgresDriver;

impl DatabaseDriver for PostgresDriver {
    fn open(
        &self,
        dsn: &str,
    ) -> Result<Box<dyn DatabaseSession>, DriverError> {
        let client = open_conn(dsn)?;
        Ok(Box::new(PostgresSession::new(client)))
    }
}

struct PostgresSession {
    client: Client,
}

impl PostgresSession {
    fn new(client: Client) -> Self {
        Self { client }
    }
}

impl DatabaseSession for PostgresSession {
    fn ping(&mut self) -> Result<(), DriverError> {
        self.client
            .simple_query("SELECT 1")
            .map_err(|err| DriverError::Other(format!("校验查询失败: {}", err)))?;
        Ok(())
    }

    fn query(
        &mut self,
        sql: &str,
    ) -> Result<RowSet, DriverError> {
        validate_sql(sql)?;

        // 预编译只用于取得列名和类型，结果一律走文本协议
        let stmt = self
            .client
            .prepare(sql)
            .map_err(|err| DriverError::Other(format!("准备查询失败: {}", err)))?;
        let cols: Vec<String> = stmt.columns().iter().map(|col| col.name().to_string()).collect();
        let types: Vec<Type> = stmt.columns().iter().map(|col| col.type_().clone()).collect();

        let messages = self
            .client
            .simple_query(sql)
            .map_err(|err| DriverError::Other(format!("执行查询失败: {}", err)))?;

        let mut records: Vec<Vec<CellValue>> = vec![];
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                let record = (0..row.len())
                    .map(|idx| parse_value(row.get(idx), types.get(idx)))
                    .collect();
                records.push(record);
            }
        }

        Ok(RowSet { cols, rows: records })
    }
}

fn open_conn(dsn: &str) -> Result<Client, DriverError> {
    let dsn = dsn.trim();
    if dsn.is_empty() {
        return Err(DriverError::MissingField("DATASOCURE".into()));
    }

    let config: Config = dsn
        .parse()
        .map_err(|err| DriverError::InvalidField(format!("连接字符串解析失败: {}", err)))?;
    config
        .connect(NoTls)
        .map_err(|err| DriverError::Other(format!("连接失败: {}", err)))
}

fn parse_value(
    text: Option<&str>,
    ty: Option<&Type>,
) -> CellValue {
    let Some(text) = text else {
        return CellValue::Null;
    };

    let Some(ty) = ty else {
        return CellValue::Text(text.to_string());
    };

    match *ty {
        Type::INT2 | Type::INT4 | Type::INT8 => text
            .parse()
            .map(CellValue::Int)
            .unwrap_or_else(|_| CellValue::Text(text.to_string())),
        Type::FLOAT4 | Type::FLOAT8 => text
            .parse()
            .map(CellValue::Float)
            .unwrap_or_else(|_| CellValue::Text(text.to_string())),
        _ => CellValue::Text(text.to_string()),
    }
}
