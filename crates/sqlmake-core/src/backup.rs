use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::scan::modified_seconds;

/// 备份文件名中的时间格式（本地时间）
pub const BACKUP_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("无法解析文件名: {0}")]
    InvalidName(PathBuf),
}

/// `a.sql` + `csv` + mtime -> `a.sql_20240102_030405.csv`
pub fn backup_name(
    stem: &str,
    ext: &str,
    modified: i64,
) -> String {
    let stamp = DateTime::from_timestamp(modified, 0)
        .map(|t| t.with_timezone(&Local).format(BACKUP_TIME_FORMAT).to_string())
        .unwrap_or_else(|| modified.to_string());
    format!("{}_{}.{}", stem, stamp, ext)
}

/// 将产出文件移入备份目录，名称带上该文件自身的修改时间
pub fn backup(
    artifact: &Path,
    bak_dir: &Path,
) -> Result<PathBuf, BackupError> {
    let stem = artifact.file_stem().and_then(|s| s.to_str());
    let ext = artifact.extension().and_then(|s| s.to_str());
    let (Some(stem), Some(ext)) = (stem, ext) else {
        return Err(BackupError::InvalidName(artifact.to_path_buf()));
    };

    let modified = modified_seconds(artifact)?;
    let target = bak_dir.join(backup_name(stem, ext, modified));
    fs::rename(artifact, &target)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use chrono::TimeZone;

    use super::*;

    fn local_seconds(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        min: u32,
        sec: u32,
    ) -> i64 {
        Local
            .with_ymd_and_hms(year, month, day, hour, min, sec)
            .earliest()
            .unwrap()
            .timestamp()
    }

    #[test]
    fn name_embeds_local_timestamp() {
        let modified = local_seconds(2024, 1, 2, 3, 4, 5);
        assert_eq!(backup_name("a.sql", "csv", modified), "a.sql_20240102_030405.csv");
        assert_eq!(backup_name("a.sql", "xlsx", modified), "a.sql_20240102_030405.xlsx");
    }

    #[test]
    fn name_uses_file_time_not_wall_clock() {
        let dir = tempfile::tempdir().unwrap();
        let bak = dir.path().join("bak");
        fs::create_dir(&bak).unwrap();
        let artifact = dir.path().join("a.sql.csv");
        fs::write(&artifact, "old").unwrap();

        let at = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).earliest().unwrap();
        fs::File::options()
            .write(true)
            .open(&artifact)
            .unwrap()
            .set_modified(SystemTime::from(at))
            .unwrap();

        let target = backup(&artifact, &bak).unwrap();
        assert_eq!(target, bak.join("a.sql_20240102_030405.csv"));
        assert!(!artifact.exists());
        assert_eq!(fs::read_to_string(&target).unwrap(), "old");
    }

    #[test]
    fn missing_bak_dir_fails_without_moving() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("a.sql.csv");
        fs::write(&artifact, "old").unwrap();

        assert!(matches!(
            backup(&artifact, &dir.path().join("missing")),
            Err(BackupError::Io(_))
        ));
        assert!(artifact.exists());
    }

    #[test]
    fn name_without_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("noext");
        fs::write(&artifact, "old").unwrap();

        assert!(matches!(
            backup(&artifact, dir.path()),
            Err(BackupError::InvalidName(_))
        ));
    }
}
