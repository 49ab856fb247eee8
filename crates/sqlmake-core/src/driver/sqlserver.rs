use std::fmt::Display;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use tiberius::{Client, ColumnData, Config, FromSql};
use tokio::{
    net::TcpStream,
    runtime::{Builder, Runtime},
};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::{CellValue, DatabaseDriver, DatabaseSession, DriverError, RowSet, validate_sql};

/// SQL Server 驱动，DSN 为 ADO 连接字符串
#[derive(Debug, Clone, Copy)]
pub struct SQLServerDriver;

impl DatabaseDriver for SQLServerDriver {
    fn open(
        &self,
        dsn: &str,
    ) -> Result<Box<dyn DatabaseSession>, DriverError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| DriverError::Other(format!("创建运行时失败: {}", err)))?;
        let client = open_client(&runtime, dsn)?;
        Ok(Box::new(SQLServerSession { client, runtime }))
    }
}

// client 需先于 runtime 释放
struct SQLServerSession {
    client: Client<Compat<TcpStream>>,
    runtime: Runtime,
}

impl DatabaseSession for SQLServerSession {
    fn ping(&mut self) -> Result<(), DriverError> {
        let client = &mut self.client;
        self.runtime.block_on(async {
            client
                .simple_query("SELECT 1")
                .await
                .map_err(|err| DriverError::Other(format!("ping 失败: {}", err)))?
                .into_row()
                .await
                .map_err(|err| DriverError::Other(format!("ping 失败: {}", err)))?;
            Ok(())
        })
    }

    fn query(
        &mut self,
        sql: &str,
    ) -> Result<RowSet, DriverError> {
        validate_sql(sql)?;
        tracing::debug!(sql = %sql);

        let client = &mut self.client;
        self.runtime.block_on(async {
            let mut stream = client
                .simple_query(sql)
                .await
                .map_err(|err| DriverError::Other(format!("执行查询失败: {}", err)))?;

            let cols: Vec<String> = match stream
                .columns()
                .await
                .map_err(|err| DriverError::Other(format!("读取列信息失败: {}", err)))?
            {
                Some(columns) => columns.iter().map(|col| col.name().to_string()).collect(),
                None => vec![],
            };

            let rows = stream
                .into_first_result()
                .await
                .map_err(|err| DriverError::Other(format!("读取结果失败: {}", err)))?;
            let records: Vec<Vec<CellValue>> = rows
                .into_iter()
                .map(|row| row.into_iter().map(parse_value).collect())
                .collect();

            Ok(RowSet { cols, rows: records })
        })
    }
}

fn open_client(
    runtime: &Runtime,
    dsn: &str,
) -> Result<Client<Compat<TcpStream>>, DriverError> {
    let dsn = dsn.trim();
    if dsn.is_empty() {
        return Err(DriverError::MissingField("DATASOCURE".into()));
    }

    let config =
        Config::from_ado_string(dsn).map_err(|err| DriverError::InvalidField(format!("连接字符串解析失败: {}", err)))?;

    runtime.block_on(async move {
        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|err| DriverError::Other(format!("连接失败: {}", err)))?;
        tcp.set_nodelay(true)
            .map_err(|err| DriverError::Other(format!("连接失败: {}", err)))?;

        Client::connect(config, tcp.compat_write())
            .await
            .map_err(|err| DriverError::Other(format!("连接失败: {}", err)))
    })
}

fn parse_value(value: ColumnData<'static>) -> CellValue {
    match &value {
        ColumnData::U8(Some(int)) => CellValue::Int((*int).into()),
        ColumnData::I16(Some(int)) => CellValue::Int((*int).into()),
        ColumnData::I32(Some(int)) => CellValue::Int((*int).into()),
        ColumnData::I64(Some(int)) => CellValue::Int(*int),
        ColumnData::Bit(Some(bit)) => CellValue::Int((*bit).into()),
        ColumnData::F32(Some(float)) => CellValue::Float((*float).into()),
        ColumnData::F64(Some(float)) => CellValue::Float(*float),
        ColumnData::String(Some(text)) => CellValue::Text(text.to_string()),
        ColumnData::Guid(Some(guid)) => CellValue::Text(guid.to_string()),
        ColumnData::Numeric(Some(numeric)) => CellValue::Text(numeric.to_string()),
        ColumnData::Xml(Some(xml)) => CellValue::Text(xml.clone().into_owned().into_string()),
        ColumnData::Binary(Some(bytes)) => {
            CellValue::Text(bytes.iter().map(|b| format!("{:02x}", b)).collect::<String>())
        }
        ColumnData::DateTime(Some(_)) | ColumnData::SmallDateTime(Some(_)) | ColumnData::DateTime2(Some(_)) => {
            temporal(NaiveDateTime::from_sql(&value))
        }
        ColumnData::Date(Some(_)) => temporal(NaiveDate::from_sql(&value)),
        ColumnData::Time(Some(_)) => temporal(NaiveTime::from_sql(&value)),
        ColumnData::DateTimeOffset(Some(_)) => temporal(DateTime::<FixedOffset>::from_sql(&value)),
        _ => CellValue::Null,
    }
}

fn temporal<T: Display>(parsed: tiberius::Result<Option<T>>) -> CellValue {
    match parsed {
        Ok(Some(value)) => CellValue::Text(value.to_string()),
        _ => CellValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> Runtime {
        Builder::new_current_thread().enable_all().build().unwrap()
    }

    #[test]
    fn empty_dsn_is_missing() {
        assert!(matches!(
            open_client(&runtime(), " "),
            Err(DriverError::MissingField(_))
        ));
    }

    #[test]
    fn refused_connection_is_reported() {
        let result = open_client(&runtime(), "server=tcp:127.0.0.1,1;user=sa;password=secret");
        assert!(matches!(result, Err(DriverError::Other(_))));
    }

    #[test]
    fn values_map_to_cells() {
        assert_eq!(parse_value(ColumnData::I32(Some(42))), CellValue::Int(42));
        assert_eq!(parse_value(ColumnData::U8(Some(7))), CellValue::Int(7));
        assert_eq!(parse_value(ColumnData::Bit(Some(true))), CellValue::Int(1));
        assert_eq!(parse_value(ColumnData::F64(Some(1.5))), CellValue::Float(1.5));
        assert_eq!(
            parse_value(ColumnData::String(Some("Ann".into()))),
            CellValue::Text("Ann".into())
        );
        assert_eq!(
            parse_value(ColumnData::Binary(Some(vec![0x0a, 0xff].into()))),
            CellValue::Text("0aff".into())
        );
        assert_eq!(parse_value(ColumnData::I64(None)), CellValue::Null);
        assert_eq!(parse_value(ColumnData::String(None)), CellValue::Null);
    }
}
