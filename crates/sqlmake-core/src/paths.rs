use std::{
    fs::create_dir_all,
    path::{Path, PathBuf},
};

use crate::FileType;

/// 工作目录布局，默认以当前目录为根
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn current() -> Self {
        Self::new(".")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// SQL 源文件目录（./sql）
    pub fn sql_dir(&self) -> PathBuf {
        self.root.join("sql")
    }

    /// 产出文件目录（./csv 或 ./xlsx）
    pub fn output_dir(
        &self,
        file_type: FileType,
    ) -> PathBuf {
        self.root.join(file_type.ext())
    }

    /// 备份目录（./bak）
    pub fn bak_dir(&self) -> PathBuf {
        self.root.join("bak")
    }

    /// 产出文件名：源文件名 + 扩展名，如 `a.sql.csv`
    pub fn output_name(
        source_name: &str,
        file_type: FileType,
    ) -> String {
        format!("{}.{}", source_name, file_type.ext())
    }

    pub fn output_path(
        &self,
        source_name: &str,
        file_type: FileType,
    ) -> PathBuf {
        self.output_dir(file_type).join(Self::output_name(source_name, file_type))
    }

    /// 建立 sql、csv、xlsx、bak 目录，已存在或失败都忽略
    pub fn ensure_dirs(&self) {
        let _ = create_dir_all(self.sql_dir());
        for file_type in FileType::all() {
            let _ = create_dir_all(self.output_dir(*file_type));
        }
        let _ = create_dir_all(self.bak_dir());
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_keeps_source_extension() {
        let layout = Layout::new("/work");
        assert_eq!(
            layout.output_path("a.sql", FileType::Csv),
            PathBuf::from("/work/csv/a.sql.csv")
        );
        assert_eq!(
            layout.output_path("a.sql", FileType::Xlsx),
            PathBuf::from("/work/xlsx/a.sql.xlsx")
        );
    }

    #[test]
    fn ensure_dirs_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        layout.ensure_dirs();
        layout.ensure_dirs();

        for name in ["sql", "csv", "xlsx", "bak"] {
            assert!(dir.path().join(name).is_dir(), "{} should exist", name);
        }
    }
}
