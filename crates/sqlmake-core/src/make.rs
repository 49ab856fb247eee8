//! 产出文件是否需要重新生成的判定。
//!
//! 时间戳一律按整秒 Unix 时间比较。

/// 生成模式，每次运行由 MAKE_MODE 选定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MakeMode {
    /// 总是生成
    #[default]
    All,
    /// 源文件比产出文件旧（或同一秒）时跳过
    Modify,
    /// 产出文件已存在时跳过
    NoFile,
}

impl MakeMode {
    /// 大小写不敏感；无法识别的值按 `All` 处理
    pub fn parse(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "MAKE_MODIFY" | "MAKE_MODIFY_CSV" | "MAKE_MODIFY_XLSX" => MakeMode::Modify,
            "MAKE_NOFILE" | "MAKE_NOCSV" | "MAKE_NOXLSX" => MakeMode::NoFile,
            _ => MakeMode::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MakeMode::All => "MAKE_ALL",
            MakeMode::Modify => "MAKE_MODIFY",
            MakeMode::NoFile => "MAKE_NOFILE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 源文件不比产出文件新
    UpToDate,
    /// 产出文件已存在
    Exists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Generate,
    Skip(SkipReason),
}

impl Decision {
    pub fn is_generate(&self) -> bool {
        matches!(self, Decision::Generate)
    }
}

/// `output_modified` 为 `None` 表示产出文件不存在
pub fn decide(
    mode: MakeMode,
    source_modified: i64,
    output_modified: Option<i64>,
) -> Decision {
    match (mode, output_modified) {
        (MakeMode::All, _) => Decision::Generate,
        (_, None) => Decision::Generate,
        (MakeMode::Modify, Some(output)) if source_modified <= output => Decision::Skip(SkipReason::UpToDate),
        (MakeMode::Modify, Some(_)) => Decision::Generate,
        (MakeMode::NoFile, Some(_)) => Decision::Skip(SkipReason::Exists),
    }
}

/// 只有决定生成、已有产出文件且开启备份时才备份
pub fn needs_backup(
    decision: Decision,
    output_exists: bool,
    backup_enabled: bool,
) -> bool {
    decision.is_generate() && output_exists && backup_enabled
}
