use std::path::PathBuf;

use thiserror::Error;

use crate::{
    DatabaseSession, Decision, DriverError, DriverKind, Layout, MakeConfig, OutputIndex, ScanError, SkipReason,
    SourceQuery, backup, check_connection, decide, export, list_sources, needs_backup,
};

/// 中止整次运行的错误
#[derive(Error, Debug)]
pub enum RunError {
    #[error("DB 连线失败: {0}")]
    Driver(#[from] DriverError),

    #[error("{0}")]
    Scan(#[from] ScanError),
}

/// 单个 SQL 文件的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Generated,
    Skipped(SkipReason),
    ReadFailed,
    QueryFailed,
    WriteFailed,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<(String, FileOutcome)>,
    pub backups: Vec<PathBuf>,
    pub backup_failures: usize,
}

impl RunReport {
    pub fn outcome(
        &self,
        name: &str,
    ) -> Option<FileOutcome> {
        self.outcomes.iter().find(|(n, _)| n == name).map(|(_, o)| *o)
    }

    pub fn generated(&self) -> usize {
        self.count(|o| o == FileOutcome::Generated)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                FileOutcome::ReadFailed | FileOutcome::QueryFailed | FileOutcome::WriteFailed
            )
        })
    }

    fn count<F: Fn(FileOutcome) -> bool>(
        &self,
        pred: F,
    ) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(*o)).count()
    }
}

/// 按 DRIVER 建立连接并 ping
pub fn connect(config: &MakeConfig) -> Result<Box<dyn DatabaseSession>, DriverError> {
    let kind: DriverKind = config.driver.parse()?;
    tracing::info!("正在 DB 连线: {}", kind.label());
    let session = check_connection(kind, &config.datasource)?;
    tracing::info!("DB 连线成功");
    Ok(session)
}

/// 处理 sql 目录下的全部文件，单个文件失败不影响后续文件
pub fn run(
    session: &mut Box<dyn DatabaseSession>,
    config: &MakeConfig,
    layout: &Layout,
) -> Result<RunReport, RunError> {
    let file_type = config.file_type;
    tracing::debug!(
        "运行配置: make_mode={}, file_type={}, write_header={}, backup={}",
        config.make_mode.label(),
        file_type.ext(),
        config.write_header,
        config.backup
    );

    // 1. 读取路径，产出目录只在此时建立一次快照
    tracing::info!("正在读取路径");
    let sources = list_sources(&layout.sql_dir())?;
    let index = OutputIndex::scan(&layout.output_dir(file_type), file_type);
    tracing::info!(
        "读取路径完成，共 {} 个 SQL 档案，已有 {} 个 {}",
        sources.len(),
        index.len(),
        file_type.ext()
    );

    // 2. 逐个处理
    let mut report = RunReport::default();
    for source in &sources {
        let outcome = make_one(session, config, layout, &index, source, &mut report);
        report.outcomes.push((source.name.clone(), outcome));
    }

    tracing::info!(
        "执行完毕: 产生 {} 个，跳过 {} 个，失败 {} 个，备份 {} 个",
        report.generated(),
        report.skipped(),
        report.failed(),
        report.backups.len()
    );
    Ok(report)
}

fn make_one(
    session: &mut Box<dyn DatabaseSession>,
    config: &MakeConfig,
    layout: &Layout,
    index: &OutputIndex,
    source: &SourceQuery,
    report: &mut RunReport,
) -> FileOutcome {
    let file_type = config.file_type;
    let output_name = Layout::output_name(&source.name, file_type);
    let output_modified = index.modified(&output_name);

    // 1. 检查是否要产生
    let decision = decide(config.make_mode, source.modified, output_modified);
    match decision {
        Decision::Skip(SkipReason::UpToDate) => {
            tracing::info!("{} 更新时间不晚于 {}，不做产生动作", source.name, output_name);
            return FileOutcome::Skipped(SkipReason::UpToDate);
        }
        Decision::Skip(SkipReason::Exists) => {
            tracing::info!("{} 已经有 {}，不做产生动作", source.name, output_name);
            return FileOutcome::Skipped(SkipReason::Exists);
        }
        Decision::Generate => {}
    }

    // 2. 读取 SQL
    tracing::info!("正在读取 {}", source.path.display());
    let sql = match source.read_sql() {
        Ok(sql) => sql,
        Err(e) => {
            tracing::error!("读取 {} 发生错误: {}", source.path.display(), e);
            return FileOutcome::ReadFailed;
        }
    };
    tracing::info!("读取到 SQL: {}", sql.trim());

    // 3. 执行查询
    tracing::info!("正在执行 {}", source.name);
    let rows = match session.query(&sql) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("{} SQL 查询错误: {}\n{}", source.name, e, sql.trim());
            return FileOutcome::QueryFailed;
        }
    };
    tracing::debug!("{} 返回 {} 列 {} 行", source.name, rows.cols.len(), rows.len());

    // 4. 备份既有档案，失败不影响产生
    let output_path = layout.output_path(&source.name, file_type);
    if needs_backup(decision, output_modified.is_some(), config.backup) {
        tracing::debug!("{} 备份档案开始", source.name);
        match backup::backup(&output_path, &layout.bak_dir()) {
            Ok(target) => {
                tracing::info!("{} 顺利备份完毕: {}", output_path.display(), target.display());
                report.backups.push(target);
            }
            Err(e) => {
                tracing::error!("{} 备份 {} 档案发生错误: {}", output_path.display(), file_type.ext(), e);
                report.backup_failures += 1;
            }
        }
    } else if config.backup {
        tracing::debug!("{} 没有档案，不做备份", source.name);
    }

    // 5. 写出档案
    tracing::info!("产生 {} 中...", output_path.display());
    match export::write(&rows, &output_path, config.write_header, file_type) {
        Ok(()) => {
            tracing::info!("产生 {} 完成", output_path.display());
            FileOutcome::Generated
        }
        Err(e) => {
            tracing::error!("产生 {} 发生 ERROR: {}", output_path.display(), e);
            FileOutcome::WriteFailed
        }
    }
}
