use std::{io, path::Path};

use thiserror::Error;

use crate::{FileType, RowSet};

mod csv;
mod xlsx;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("超出表格上限: {0}")]
    Limit(String),
}

/// 将结果集完整写入 `path`，`header` 决定是否写列名行
pub fn write(
    rows: &RowSet,
    path: &Path,
    header: bool,
    file_type: FileType,
) -> Result<(), ExportError> {
    match file_type {
        FileType::Csv => self::csv::write_csv(rows, path, header),
        FileType::Xlsx => self::xlsx::write_xlsx(rows, path, header),
    }
}
