use std::sync::{Arc, OnceLock};

/// Receives the log output of `StickerKit`.
///
/// Records from `stickerkit` modules are forwarded at every level; records from dependencies
/// (HTTP stack, TLS) only at `Info` and above. Pack keys and derived keys never appear in a
/// message.
///
/// # Examples
///
/// ```rust
/// use stickerkit_core::logger::{LogLevel, Logger};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         eprintln!("[{level:?}] {message}");
///     }
/// }
/// ```
///
/// ## Swift
///
/// ```swift
/// final class StickerKitLoggerBridge: StickerKit.Logger {
///     static let shared = StickerKitLoggerBridge()
///
///     func log(level: StickerKit.LogLevel, message: String) {
///         Log.log(level.toCoreLevel(), message)
///     }
/// }
///
/// StickerKit.setLogger(logger: StickerKitLoggerBridge.shared) // once, at startup
/// ```
#[cfg_attr(feature = "ffi", uniffi::export(with_foreign))]
pub trait Logger: Sync + Send {
    /// Logs a message at the specified level.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum LogLevel {
    /// Very detailed messages, e.g. cache hits.
    Trace,
    /// Debugging information, e.g. cache misses and fetches.
    Debug,
    /// Progress information.
    Info,
    /// Potentially harmful situations, e.g. retried requests.
    Warn,
    /// Errors.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

/// `log::Log` implementation forwarding to [`LOGGER_INSTANCE`].
struct ForeignLogger;

impl ForeignLogger {
    fn should_forward(metadata: &log::Metadata, module_path: Option<&str>) -> bool {
        let from_stickerkit = module_path.is_some_and(|path| path.starts_with("stickerkit"));
        from_stickerkit || metadata.level() <= log::Level::Info
    }
}

impl log::Log for ForeignLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if !Self::should_forward(record.metadata(), record.module_path()) {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Installs `logger` as the destination of all `StickerKit` log output.
///
/// Only the first call has an effect; the logger cannot be replaced afterwards. If another
/// `log` implementation was already installed by the host process, records keep going there.
#[cfg_attr(feature = "ffi", uniffi::export)]
pub fn set_logger(logger: Arc<dyn Logger>) {
    static LOGGER: ForeignLogger = ForeignLogger;

    if LOGGER_INSTANCE.set(logger).is_err() {
        log::warn!("logger already set, ignoring");
        return;
    }

    match log::set_logger(&LOGGER) {
        Ok(()) => log::set_max_level(log::LevelFilter::Trace),
        Err(err) => log::warn!("failed to install foreign logger: {err}"),
    }
}
