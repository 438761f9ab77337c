//! The engine's logging plugin contract.
//!
//! Records are filtered by a process-wide level and a mask of enabled
//! source components, then handed to the active [`LoggerInterface`].
//! The default implementation forwards every record to `tracing`.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::ffi::CStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};

/// Severity of a record, ordered from the most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warning = 3,
    Error = 4,
}

impl TryFrom<i32> for LogLevel {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, i32> {
        match value {
            0 => Ok(LogLevel::Trace),
            1 => Ok(LogLevel::Debug),
            2 => Ok(LogLevel::Info),
            3 => Ok(LogLevel::Warning),
            4 => Ok(LogLevel::Error),
            other => Err(other),
        }
    }
}

/// Subsystem that emitted a record. Each component is a distinct bit
/// so a set of them fits in a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum LogSourceComponent {
    Unknown = 1 << 0,
    Rpc = 1 << 1,
    BlockReader = 1 << 2,
    FileHandle = 1 << 3,
    FileSystem = 1 << 4,
}

impl LogSourceComponent {
    pub const ALL: [LogSourceComponent; 5] = [
        Self::Unknown,
        Self::Rpc,
        Self::BlockReader,
        Self::FileHandle,
        Self::FileSystem,
    ];

    pub const fn bit(self) -> u32 {
        self as i32 as u32
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Rpc => "RPC",
            Self::BlockReader => "BlockReader",
            Self::FileHandle => "FileHandle",
            Self::FileSystem => "FileSystem",
        }
    }
}

/// Only the exact flag values convert; zero, multi-bit and unknown
/// bits are rejected.
impl TryFrom<i32> for LogSourceComponent {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, i32> {
        Self::ALL
            .into_iter()
            .find(|component| *component as i32 == value)
            .ok_or(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    level: LogLevel,
    component: LogSourceComponent,
    msg: String,
    file_name: &'static CStr,
    file_line: u32,
}

impl LogMessage {
    pub fn new(
        level: LogLevel,
        component: LogSourceComponent,
        msg: impl Into<String>,
        file_name: &'static CStr,
        file_line: u32,
    ) -> Self {
        Self {
            level,
            component,
            msg: msg.into(),
            file_name,
            file_line,
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn component(&self) -> LogSourceComponent {
        self.component
    }

    pub fn msg_string(&self) -> &str {
        &self.msg
    }

    pub fn file_name(&self) -> &'static CStr {
        self.file_name
    }

    pub fn file_line(&self) -> u32 {
        self.file_line
    }
}

/// A destination for log records.
pub trait LoggerInterface: Send + Sync {
    fn write(&self, msg: &LogMessage);
}

/// Forwards records to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl LoggerInterface for TracingLogger {
    fn write(&self, msg: &LogMessage) {
        let component = msg.component().name();
        let file = msg.file_name().to_string_lossy();
        let line = msg.file_line();
        let text = msg.msg_string();
        match msg.level() {
            LogLevel::Trace => tracing::trace!(component, %file, line, "{text}"),
            LogLevel::Debug => tracing::debug!(component, %file, line, "{text}"),
            LogLevel::Info => tracing::info!(component, %file, line, "{text}"),
            LogLevel::Warning => tracing::warn!(component, %file, line, "{text}"),
            LogLevel::Error => tracing::error!(component, %file, line, "{text}"),
        }
    }
}

const ALL_COMPONENTS: u32 = (1 << 5) - 1;

static LEVEL: AtomicI32 = AtomicI32::new(LogLevel::Info as i32);
static ENABLED_COMPONENTS: AtomicU32 = AtomicU32::new(ALL_COMPONENTS);
static LOGGER: Lazy<RwLock<Arc<dyn LoggerInterface>>> =
    Lazy::new(|| RwLock::new(Arc::new(TracingLogger)));

/// Process-wide logging state.
pub struct LogManager;

impl LogManager {
    /// Replaces the active logger.
    pub fn set_logger_implementation(logger: Box<dyn LoggerInterface>) {
        *LOGGER.write() = Arc::from(logger);
    }

    pub fn enable_log_for_component(component: LogSourceComponent) {
        ENABLED_COMPONENTS.fetch_or(component.bit(), Ordering::SeqCst);
    }

    pub fn disable_log_for_component(component: LogSourceComponent) {
        ENABLED_COMPONENTS.fetch_and(!component.bit(), Ordering::SeqCst);
    }

    pub fn is_component_enabled(component: LogSourceComponent) -> bool {
        ENABLED_COMPONENTS.load(Ordering::SeqCst) & component.bit() != 0
    }

    pub fn set_log_level(level: LogLevel) {
        LEVEL.store(level as i32, Ordering::SeqCst);
    }

    pub fn log_level() -> LogLevel {
        LogLevel::try_from(LEVEL.load(Ordering::SeqCst)).unwrap_or(LogLevel::Info)
    }

    pub fn should_log(level: LogLevel, component: LogSourceComponent) -> bool {
        level >= Self::log_level() && Self::is_component_enabled(component)
    }

    /// Hands `msg` to the active logger, without filtering.
    pub fn write(msg: &LogMessage) {
        // The logger may itself log; never call it with the lock held.
        let logger = Arc::clone(&*LOGGER.read());
        logger.write(msg);
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __hdfs_source_file {
    () => {
        match ::std::ffi::CStr::from_bytes_with_nul(concat!(file!(), "\0").as_bytes()) {
            Ok(name) => name,
            Err(_) => c"",
        }
    };
}

/// Emits a record through [`LogManager`] if the level and component
/// are enabled.
///
/// ```
/// use hdfspp::hdfs_log;
/// use hdfspp::logging::{LogLevel, LogSourceComponent};
///
/// hdfs_log!(LogLevel::Info, LogSourceComponent::FileSystem, "connected to {}", "nn:8020");
/// ```
#[macro_export]
macro_rules! hdfs_log {
    ($level:expr, $component:expr, $($arg:tt)+) => {{
        let level: $crate::logging::LogLevel = $level;
        let component: $crate::logging::LogSourceComponent = $component;
        if $crate::logging::LogManager::should_log(level, component) {
            $crate::logging::LogManager::write(&$crate::logging::LogMessage::new(
                level,
                component,
                format!($($arg)+),
                $crate::__hdfs_source_file!(),
                line!(),
            ));
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serial_test::serial;
    use std::thread::{self, ThreadId};

    #[derive(Default)]
    struct Capture(Mutex<Vec<LogMessage>>);

    /// Keeps only the records emitted by the thread that installed it.
    struct Shared(Arc<Capture>, ThreadId);

    impl LoggerInterface for Shared {
        fn write(&self, msg: &LogMessage) {
            if thread::current().id() == self.1 {
                self.0.0.lock().push(msg.clone());
            }
        }
    }

    fn reset() {
        LogManager::set_logger_implementation(Box::new(TracingLogger));
        LogManager::set_log_level(LogLevel::Info);
        for component in LogSourceComponent::ALL {
            LogManager::enable_log_for_component(component);
        }
    }

    #[test]
    fn level_conversion_is_a_closed_range() {
        assert_eq!(LogLevel::try_from(0), Ok(LogLevel::Trace));
        assert_eq!(LogLevel::try_from(4), Ok(LogLevel::Error));
        assert_eq!(LogLevel::try_from(-1), Err(-1));
        assert_eq!(LogLevel::try_from(5), Err(5));
    }

    #[test]
    fn component_conversion_requires_a_single_known_bit() {
        assert_eq!(LogSourceComponent::try_from(1), Ok(LogSourceComponent::Unknown));
        assert_eq!(
            LogSourceComponent::try_from(16),
            Ok(LogSourceComponent::FileSystem)
        );
        for rejected in [0, 3, 6, 17, 32, 64, -16, i32::MIN] {
            assert_eq!(LogSourceComponent::try_from(rejected), Err(rejected));
        }
    }

    #[test]
    #[serial(logging)]
    fn macro_respects_level_and_components() {
        reset();
        let capture = Arc::new(Capture::default());
        LogManager::set_logger_implementation(Box::new(Shared(Arc::clone(&capture), thread::current().id())));

        crate::hdfs_log!(LogLevel::Debug, LogSourceComponent::Rpc, "dropped");
        crate::hdfs_log!(LogLevel::Warning, LogSourceComponent::Rpc, "kept {}", 1);

        LogManager::disable_log_for_component(LogSourceComponent::Rpc);
        crate::hdfs_log!(LogLevel::Error, LogSourceComponent::Rpc, "muted");
        crate::hdfs_log!(LogLevel::Error, LogSourceComponent::FileSystem, "other");

        let records = capture.0.lock().clone();
        reset();

        let texts: Vec<_> = records.iter().map(|r| r.msg_string().to_owned()).collect();
        assert_eq!(texts, ["kept 1", "other"]);
        assert_eq!(records[0].level(), LogLevel::Warning);
        assert!(records[0].file_name().to_string_lossy().ends_with("logging.rs"));
        assert!(records[0].file_line() > 0);
    }

    #[test_log::test]
    #[serial(logging)]
    fn tracing_logger_accepts_every_level() {
        reset();
        LogManager::set_log_level(LogLevel::Trace);
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
        ] {
            crate::hdfs_log!(level, LogSourceComponent::Unknown, "level {level:?}");
        }
        reset();
    }
}
