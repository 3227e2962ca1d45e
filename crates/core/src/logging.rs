//! Log filter selection and the persistent log file.
//!
//! The console gets the filter the user selected. The daily log file under
//! `<data_dir>/logs` also records the canvas and dataset debug events
//! (planned geometry, per-image conform steps) unless the user asked for a
//! verbosity or filter explicitly.

use std::fs;
use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};

pub const DEFAULT_LOG_FILTER: &str = "info";
pub const LOG_DIR_NAME: &str = "logs";
pub const LOG_RETENTION_FILES: usize = 14;
const LOG_FILE_PREFIX: &str = "ezprompts";
const LOG_FILE_SUFFIX: &str = "log";

/// Targets whose debug events the log file keeps by default.
pub const PIPELINE_TARGETS: [&str; 2] = ["ezprompts_core::canvas", "ezprompts_core::dataset"];

/// Where the selected filter came from, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSource {
    /// `--log-filter`
    Flag,
    /// `-v` / `-vv`
    Verbose,
    /// `RUST_LOG`
    Env,
    Default,
}

impl FilterSource {
    pub fn is_explicit(self) -> bool {
        matches!(self, Self::Flag | Self::Verbose)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingOptions {
    pub data_dir: Option<PathBuf>,
    pub verbose: u8,
    pub log_filter: Option<String>,
    pub rust_log: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilters {
    pub source: FilterSource,
    pub console: String,
    pub file: String,
}

#[derive(Debug)]
pub enum LogSink {
    File {
        dir: PathBuf,
        appender: RollingFileAppender,
    },
    ConsoleOnly {
        reason: String,
    },
}

#[derive(Debug)]
pub struct LoggingPlan {
    pub filters: LogFilters,
    pub sink: LogSink,
}

pub fn plan_logging(options: &LoggingOptions) -> LoggingPlan {
    LoggingPlan {
        filters: select_filters(options),
        sink: open_log_sink(options.data_dir.as_deref()),
    }
}

/// Pick the console and file filters. Blank filter strings count as unset.
pub fn select_filters(options: &LoggingOptions) -> LogFilters {
    let given = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|filter| !filter.is_empty())
            .map(str::to_string)
    };

    let (source, console) = match (given(&options.log_filter), options.verbose, given(&options.rust_log)) {
        (Some(filter), _, _) => (FilterSource::Flag, filter),
        (None, 0, Some(filter)) => (FilterSource::Env, filter),
        (None, 0, None) => (FilterSource::Default, DEFAULT_LOG_FILTER.to_string()),
        (None, 1, _) => (FilterSource::Verbose, "debug".to_string()),
        (None, _, _) => (FilterSource::Verbose, "trace".to_string()),
    };

    let file = if source.is_explicit() {
        console.clone()
    } else {
        with_pipeline_debug(&console)
    };

    LogFilters {
        source,
        console,
        file,
    }
}

/// Append `target=debug` for every pipeline target `filter` leaves unmentioned.
fn with_pipeline_debug(filter: &str) -> String {
    let mentions = |target: &str| {
        filter
            .split(',')
            .filter_map(|directive| directive.split('=').next())
            .any(|name| name.trim() == target)
    };

    std::iter::once(filter.to_string())
        .chain(
            PIPELINE_TARGETS
                .iter()
                .filter(|target| !mentions(target))
                .map(|target| format!("{target}=debug")),
        )
        .collect::<Vec<_>>()
        .join(",")
}

/// Open the daily rolling log file under `<data_dir>/logs`.
pub fn open_log_sink(data_dir: Option<&Path>) -> LogSink {
    let Some(data_dir) = data_dir else {
        return LogSink::ConsoleOnly {
            reason: "no data directory configured".to_string(),
        };
    };

    let dir = data_dir.join(LOG_DIR_NAME);
    if let Err(error) = fs::create_dir_all(&dir) {
        return LogSink::ConsoleOnly {
            reason: format!("cannot create {}: {error}", dir.display()),
        };
    }

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(LOG_RETENTION_FILES)
        .build(&dir)
        .map(|appender| LogSink::File {
            dir: dir.clone(),
            appender,
        })
        .unwrap_or_else(|error| LogSink::ConsoleOnly {
            reason: format!("cannot open log file in {}: {error}", dir.display()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, NamedTempFile};

    fn options(log_filter: Option<&str>, verbose: u8, rust_log: Option<&str>) -> LoggingOptions {
        LoggingOptions {
            data_dir: None,
            verbose,
            log_filter: log_filter.map(str::to_string),
            rust_log: rust_log.map(str::to_string),
        }
    }

    #[test]
    fn precedence_is_flag_then_verbose_then_env() {
        let cases = [
            (options(Some("ezprompts_core=trace"), 2, Some("warn")), FilterSource::Flag, "ezprompts_core=trace"),
            (options(None, 1, Some("warn")), FilterSource::Verbose, "debug"),
            (options(None, 3, None), FilterSource::Verbose, "trace"),
            (options(None, 0, Some("warn")), FilterSource::Env, "warn"),
            (options(None, 0, None), FilterSource::Default, "info"),
        ];
        for (options, source, console) in cases {
            let filters = select_filters(&options);
            assert_eq!(filters.source, source);
            assert_eq!(filters.console, console);
        }
    }

    #[test]
    fn blank_values_are_ignored() {
        let filters = select_filters(&options(Some("  "), 0, Some("")));
        assert_eq!(filters.source, FilterSource::Default);
    }

    #[test]
    fn file_keeps_pipeline_debug_for_implicit_filters() {
        let filters = select_filters(&options(None, 0, None));
        assert_eq!(
            filters.file,
            "info,ezprompts_core::canvas=debug,ezprompts_core::dataset=debug"
        );

        let filters = select_filters(&options(None, 0, Some("warn,ezprompts_core::canvas=trace")));
        assert_eq!(
            filters.file,
            "warn,ezprompts_core::canvas=trace,ezprompts_core::dataset=debug"
        );
    }

    #[test]
    fn file_follows_explicit_filters() {
        assert_eq!(select_filters(&options(Some("error"), 0, None)).file, "error");
        assert_eq!(select_filters(&options(None, 2, None)).file, "trace");
    }

    #[test]
    fn sink_needs_a_data_dir() {
        assert!(matches!(open_log_sink(None), LogSink::ConsoleOnly { .. }));
    }

    #[test]
    fn sink_writes_under_logs_dir() {
        let temp = tempdir().expect("temp dir should be created");
        let plan = plan_logging(&LoggingOptions {
            data_dir: Some(temp.path().to_path_buf()),
            ..Default::default()
        });
        match plan.sink {
            LogSink::File { dir, .. } => assert_eq!(dir, temp.path().join(LOG_DIR_NAME)),
            LogSink::ConsoleOnly { reason } => panic!("expected file sink, got: {reason}"),
        }
        assert!(temp.path().join(LOG_DIR_NAME).is_dir());
    }

    #[test]
    fn sink_falls_back_when_logs_dir_is_blocked() {
        let blocker = NamedTempFile::new().expect("temp file should be created");
        match open_log_sink(Some(blocker.path())) {
            LogSink::ConsoleOnly { reason } => assert!(reason.starts_with("cannot create")),
            LogSink::File { .. } => panic!("log dir under a regular file should fail"),
        }
    }
}
