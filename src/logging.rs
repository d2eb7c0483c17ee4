use flexi_logger::{
    colored_default_format, detailed_format, Cleanup, Criterion, Duplicate, FileSpec,
    FlexiLoggerError, Logger, LoggerHandle, Naming,
};

/// Start the global logger.
///
/// `RUST_LOG` wins over `level`. With a `log_dir` the output goes to rotating
/// files and is duplicated to stderr for warnings and errors.
pub fn setup_logging(level: &str, log_dir: Option<&str>) -> Result<LoggerHandle, FlexiLoggerError> {
    let logger = Logger::try_with_env_or_str(level)?;

    match log_dir {
        Some(dir) => logger
            .log_to_file(FileSpec::default().directory(dir).basename("user_auth"))
            .format_for_files(detailed_format)
            .format_for_stderr(colored_default_format)
            .duplicate_to_stderr(Duplicate::Warn)
            .rotate(
                Criterion::Size(10 * 1024 * 1024), // 10 MB
                Naming::Numbers,
                Cleanup::KeepLogFiles(7),
            )
            .start(),
        None => logger.format(colored_default_format).start(),
    }
}
