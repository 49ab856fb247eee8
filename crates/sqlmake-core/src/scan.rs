use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use thiserror::Error;

use crate::FileType;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("读取路径 {path} 有问题: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 一个 SQL 源文件，以文件名（含 `.sql`）作为标识
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceQuery {
    pub name: String,
    pub path: PathBuf,
    pub modified: i64,
}

impl SourceQuery {
    pub fn read_sql(&self) -> io::Result<String> {
        fs::read_to_string(&self.path)
    }
}

/// 产出目录的快照：文件名 -> 修改时间（Unix 秒）
///
/// 每次运行只建立一次，运行过程中新写出的文件不会反映在快照里。
#[derive(Debug, Clone, Default)]
pub struct OutputIndex {
    entries: HashMap<String, i64>,
}

impl OutputIndex {
    /// 目录不存在或无法读取时视为没有既有档案
    pub fn scan(
        dir: &Path,
        file_type: FileType,
    ) -> Self {
        let files = match list_files(dir, file_type.ext()) {
            Ok(files) => files,
            Err(ScanError::ReadDir { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("{} 不存在，视为没有既有档案", dir.display());
                return Self::default();
            }
            Err(e) => {
                tracing::error!("{}，视为没有既有档案", e);
                return Self::default();
            }
        };

        let mut entries = HashMap::new();
        for (name, path) in files {
            match modified_seconds(&path) {
                Ok(modified) => {
                    entries.insert(name, modified);
                }
                Err(e) => tracing::error!("{} 无法得到档案状况: {}", path.display(), e),
            }
        }
        Self { entries }
    }

    pub fn modified(
        &self,
        name: &str,
    ) -> Option<i64> {
        self.entries.get(name).copied()
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 列出目录下的 `*.sql`，按文件名排序
pub fn list_sources(dir: &Path) -> Result<Vec<SourceQuery>, ScanError> {
    let mut sources = vec![];
    for (name, path) in list_files(dir, "sql")? {
        match modified_seconds(&path) {
            Ok(modified) => sources.push(SourceQuery { name, path, modified }),
            Err(e) => tracing::error!("{} 无法得到档案状况: {}", path.display(), e),
        }
    }
    Ok(sources)
}

/// 文件修改时间，取整到秒
pub fn modified_seconds(path: &Path) -> io::Result<i64> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(unix_seconds(modified))
}

fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as i64,
        Err(err) => -(err.duration().as_secs() as i64),
    }
}

fn list_files(
    dir: &Path,
    ext: &str,
) -> Result<Vec<(String, PathBuf)>, ScanError> {
    let read_dir = fs::read_dir(dir).map_err(|source| ScanError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = vec![];
    for entry in read_dir {
        let entry = entry.map_err(|source| ScanError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(ext) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(|n| n.to_string()) else {
            tracing::warn!("忽略非 UTF-8 文件名: {}", path.display());
            continue;
        };
        files.push((name, path));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn sources_are_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.sql", "a.sql", "e.sql.bak", "notes.txt", "b.sql"] {
            fs::write(dir.path().join(name), "SELECT 1").unwrap();
        }
        fs::create_dir(dir.path().join("d.sql")).unwrap();

        let names: Vec<String> = list_sources(dir.path()).unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["a.sql", "b.sql", "c.sql"]);
    }

    #[test]
    fn missing_source_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            list_sources(&dir.path().join("nope")),
            Err(ScanError::ReadDir { .. })
        ));
    }

    #[test]
    fn missing_output_dir_is_an_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let index = OutputIndex::scan(&dir.path().join("csv"), FileType::Csv);
        assert!(index.is_empty());
    }

    #[test]
    fn index_only_holds_matching_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.sql.csv"), "x").unwrap();
        fs::write(dir.path().join("a.sql.xlsx"), "x").unwrap();

        let index = OutputIndex::scan(dir.path(), FileType::Csv);
        assert_eq!(index.len(), 1);
        assert!(index.contains("a.sql.csv"));
        assert!(!index.contains("a.sql.xlsx"));
    }

    #[test]
    fn index_records_whole_seconds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.sql.csv");
        fs::write(&path, "x").unwrap();
        let at = UNIX_EPOCH + Duration::from_millis(1_700_000_000_900);
        fs::File::options().write(true).open(&path).unwrap().set_modified(at).unwrap();

        let index = OutputIndex::scan(dir.path(), FileType::Csv);
        assert_eq!(index.modified("a.sql.csv"), Some(1_700_000_000));
    }

    #[test]
    fn index_is_a_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let index = OutputIndex::scan(dir.path(), FileType::Csv);
        fs::write(dir.path().join("late.sql.csv"), "x").unwrap();

        assert!(index.is_empty());
        assert_eq!(index.modified("late.sql.csv"), None);
    }
}
