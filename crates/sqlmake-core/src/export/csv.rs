use std::path::Path;

use csv::WriterBuilder;

use super::ExportError;
use crate::RowSet;

/// 逗号分隔，NULL 写为空字段
pub(super) fn write_csv(
    rows: &RowSet,
    path: &Path,
    header: bool,
) -> Result<(), ExportError> {
    let mut writer = WriterBuilder::new().from_path(path)?;

    if header && !rows.cols.is_empty() {
        writer.write_record(&rows.cols)?;
    }

    for row in &rows.rows {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }

    writer.flush()?;
    Ok(())
}
