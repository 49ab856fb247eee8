use std::path::Path;

use rust_xlsxwriter::{Workbook, Worksheet};

use super::ExportError;
use crate::{CellValue, RowSet};

/// 单个工作表，数字按数值写入，NULL 留空
pub(super) fn write_xlsx(
    rows: &RowSet,
    path: &Path,
    header: bool,
) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let mut line: u32 = 0;
    if header && !rows.cols.is_empty() {
        for (idx, name) in rows.cols.iter().enumerate() {
            worksheet.write_string(line, column(idx)?, name.as_str())?;
        }
        line += 1;
    }

    for row in &rows.rows {
        for (idx, cell) in row.iter().enumerate() {
            write_cell(worksheet, line, column(idx)?, cell)?;
        }
        // 超过工作表行数上限时由 write_* 返回错误
        line = line.saturating_add(1);
    }

    workbook.save(path)?;
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    line: u32,
    col: u16,
    cell: &CellValue,
) -> Result<(), ExportError> {
    match cell {
        CellValue::Null => {}
        CellValue::Int(int) => {
            worksheet.write_number(line, col, *int as f64)?;
        }
        CellValue::Float(float) => {
            worksheet.write_number(line, col, *float)?;
        }
        CellValue::Text(text) => {
            worksheet.write_string(line, col, text.as_str())?;
        }
    }
    Ok(())
}

fn column(idx: usize) -> Result<u16, ExportError> {
    u16::try_from(idx).map_err(|_| ExportError::Limit(format!("列数 {}", idx + 1)))
}
