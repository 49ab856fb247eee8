use std::process::exit;

use sqlmake_core::{Layout, MakeConfig, RunError, RunReport, connect, run};

mod logging;

fn main() {
    // 1. 载入设定档
    let config = match MakeConfig::load() {
        Ok(config) => config,
        Err(e) => {
            print_error("fatal", &e.to_string());
            exit(1);
        }
    };

    // 2. 初始化日志系统
    let layout = Layout::current();
    let log_guards = match logging::init_task_logging(layout.root(), config.display_mode) {
        Ok(guards) => guards,
        Err(e) => {
            print_error("fatal", &format!("打开日志文件失败: {}", e));
            exit(1);
        }
    };

    layout.ensure_dirs();
    tracing::info!("sqlmake 开始执行，版本: {}", env!("CARGO_PKG_VERSION"));
    tracing::debug!(
        "DRIVER={}, DISPLAY_MODE={}",
        config.driver,
        config.display_mode.label()
    );

    // 3. 连线并处理全部 SQL 档案
    let code = match execute(&config, &layout) {
        Ok(report) => {
            tracing::info!("sqlmake 执行完毕，共处理 {} 个档案", report.outcomes.len());
            0
        }
        Err(e) => {
            tracing::error!("{}", e);
            1
        }
    };

    // exit 不会执行析构，先刷新日志
    drop(log_guards);
    exit(code);
}

fn execute(
    config: &MakeConfig,
    layout: &Layout,
) -> Result<RunReport, RunError> {
    let mut session = connect(config)?;
    let report = run(&mut session, config, layout)?;

    drop(session);
    tracing::debug!("DB 连线已关闭");
    Ok(report)
}

fn print_error(
    severity: &str,
    message: &str,
) {
    eprintln!("{}: {}", severity, message);
}
