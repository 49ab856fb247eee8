use std::{io, path::Path};

use tracing::{Metadata, Subscriber};
use tracing_appender::{
    non_blocking,
    rolling::{InitError, RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::filter_fn,
    fmt::{MakeWriter, layer},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use sqlmake_core::{DisplayMode, LogStream};

const DEFAULT_DIRECTIVES: &str = concat!("warn,sqlmake_core=debug,", env!("CARGO_CRATE_NAME"), "=debug");

/// 日志写入线程的守卫，drop 时刷新缓冲
pub struct LogGuards {
    _info: non_blocking::WorkerGuard,
    _error: non_blocking::WorkerGuard,
}

/// 初始化日志系统：info.log、error.log 追加写入，终端输出由 DISPLAY_MODE 决定
pub fn init_task_logging(
    dir: &Path,
    mode: DisplayMode,
) -> Result<LogGuards, InitError> {
    let (info_writer, info_guard) = non_blocking(appender(dir, "info")?);
    let (error_writer, error_guard) = non_blocking(appender(dir, "error")?);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    build_subscriber(mode, filter, info_writer, error_writer, io::stdout, io::stderr).init();

    Ok(LogGuards {
        _info: info_guard,
        _error: error_guard,
    })
}

fn appender(
    dir: &Path,
    prefix: &str,
) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(dir)
}

fn stream(meta: &Metadata<'_>) -> LogStream {
    LogStream::of(meta.level())
}

fn build_subscriber<I, E, O, R>(
    mode: DisplayMode,
    filter: EnvFilter,
    info: I,
    error: E,
    stdout: O,
    stderr: R,
) -> impl Subscriber + Send + Sync + 'static
where
    I: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    E: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    O: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    R: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(filter)
        .with(
            layer()
                .with_writer(info)
                .with_ansi(false)
                .with_filter(filter_fn(move |meta| mode.to_info_log(stream(meta)))),
        )
        .with(
            layer()
                .with_writer(error)
                .with_ansi(false)
                .with_filter(filter_fn(move |meta| mode.to_error_log(stream(meta)))),
        )
        .with(
            layer()
                .with_writer(stdout)
                .with_filter(filter_fn(move |meta| mode.to_stdout(stream(meta)))),
        )
        .with(
            layer()
                .with_writer(stderr)
                .with_filter(filter_fn(move |meta| mode.to_stderr(stream(meta)))),
        )
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        io::Write,
        sync::{Arc, Mutex},
    };

    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for Capture {
        fn write(
            &mut self,
            buf: &[u8],
        ) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Sinks {
        info: Capture,
        error: Capture,
        stdout: Capture,
        stderr: Capture,
    }

    fn emit(mode: DisplayMode) -> Sinks {
        emit_with(mode, EnvFilter::new("debug"))
    }

    fn emit_with(
        mode: DisplayMode,
        filter: EnvFilter,
    ) -> Sinks {
        let sinks = Sinks {
            info: Capture::default(),
            error: Capture::default(),
            stdout: Capture::default(),
            stderr: Capture::default(),
        };
        let (info, error, stdout, stderr) = (
            sinks.info.clone(),
            sinks.error.clone(),
            sinks.stdout.clone(),
            sinks.stderr.clone(),
        );
        let subscriber = build_subscriber(
            mode,
            filter,
            move || info.clone(),
            move || error.clone(),
            move || stdout.clone(),
            move || stderr.clone(),
        );

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("info-line");
            tracing::error!("error-line");
            tracing::debug!("debug-line");
        });
        sinks
    }

    #[test]
    fn show_all_echoes_everything_to_stdout() {
        let sinks = emit(DisplayMode::ShowAll);
        let stdout = sinks.stdout.text();
        assert!(stdout.contains("info-line") && stdout.contains("error-line") && stdout.contains("debug-line"));
        assert!(sinks.stderr.text().is_empty());
        assert!(sinks.info.text().contains("debug-line"));
    }

    #[test]
    fn show_info_splits_console_streams() {
        let sinks = emit(DisplayMode::ShowInfo);
        let stdout = sinks.stdout.text();
        assert!(stdout.contains("info-line"));
        assert!(!stdout.contains("error-line") && !stdout.contains("debug-line"));

        let stderr = sinks.stderr.text();
        assert!(stderr.contains("error-line") && !stderr.contains("info-line"));
        assert!(sinks.info.text().contains("debug-line"));
    }

    #[test]
    fn default_directives_keep_own_lines() {
        let sinks = emit_with(DisplayMode::HideAll, EnvFilter::new(DEFAULT_DIRECTIVES));
        let info = sinks.info.text();
        assert!(info.contains("info-line") && info.contains("error-line"));
        assert!(sinks.error.text().contains("error-line"));
    }

    #[test]
    fn show_error_keeps_console_for_errors() {
        let sinks = emit(DisplayMode::ShowError);
        assert!(sinks.stdout.text().is_empty());
        let stderr = sinks.stderr.text();
        assert!(stderr.contains("error-line") && !stderr.contains("info-line"));

        let info = sinks.info.text();
        assert!(info.contains("info-line") && info.contains("error-line"));
        assert!(!info.contains("debug-line"));
    }

    #[test]
    fn hide_all_only_writes_files() {
        let sinks = emit(DisplayMode::HideAll);
        assert!(sinks.stdout.text().is_empty());
        assert!(sinks.stderr.text().is_empty());

        let error = sinks.error.text();
        assert!(error.contains("error-line"));
        assert!(!error.contains("info-line"));
    }

    #[test]
    fn appender_writes_plain_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = appender(dir.path(), "info").unwrap();
        writer.write_all(b"first\n").unwrap();
        writer.flush().unwrap();
        drop(writer);

        let mut writer = appender(dir.path(), "info").unwrap();
        writer.write_all(b"second\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("info.log")).unwrap(), "first\nsecond\n");
    }
}
