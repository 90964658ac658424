mod timing;

pub use timing::{format_duration, PhaseTiming, StartupClock, StartupReport};

use crate::config::Config;
use crate::errors::ConfigError;
use std::str::FromStr;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Container internals that only speak up for errors.
pub const NOISY_TARGETS: &[&str] = &[
    "unimbus::infrastructure::container",
    "unimbus::infrastructure::loader",
];

/// 日志格式配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 人类可读格式
    Pretty,
    /// JSON 格式
    Json,
    /// 紧凑格式
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: Level,
    /// 输出格式
    pub format: LogFormat,
    /// 是否显示目标模块
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否启用 ANSI 颜色
    pub ansi: bool,
    /// Targets pinned to `ERROR`
    pub noisy_targets: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            show_target: true,
            show_thread_ids: false,
            ansi: true,
            noisy_targets: NOISY_TARGETS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Pretty,
            show_thread_ids: true,
            ..Self::default()
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        Self {
            format: LogFormat::Json,
            show_target: false,
            ansi: false,
            ..Self::default()
        }
    }

    /// 创建测试环境配置
    pub fn testing() -> Self {
        Self {
            level: Level::ERROR,
            show_target: false,
            ansi: false,
            ..Self::default()
        }
    }

    /// Reads `unimbus.log.level`, `unimbus.log.format` and `unimbus.log.target`.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut logging = Self::default();
        if let Some(level) = config.get_optional_value::<Level>("unimbus.log.level")? {
            logging.level = level;
        }
        if let Some(format) = config.get_optional_value::<LogFormat>("unimbus.log.format")? {
            logging.format = format;
        }
        if let Some(show_target) = config.get_optional_value::<bool>("unimbus.log.target")? {
            logging.show_target = show_target;
        }
        Ok(logging)
    }

    fn filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(self.level).into())
            .from_env_lossy();
        for target in &self.noisy_targets {
            match format!("{}=error", target).parse::<Directive>() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(e) => eprintln!("ignoring invalid log target '{}': {}", target, e),
            }
        }
        filter
    }
}

static BOOTSTRAP: Once = Once::new();

/// Installs the global subscriber once per process.
///
/// Returns `true` only for the call that actually installed it. Later calls
/// (and a subscriber installed by someone else) leave logging untouched.
pub fn bootstrap(config: &LoggingConfig) -> bool {
    let mut installed = false;
    BOOTSTRAP.call_once(|| {
        installed = init_logging(config).is_ok();
    });
    installed
}

/// 初始化日志系统
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = config.filter();
    match config.format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_target(config.show_target)
                .with_thread_ids(config.show_thread_ids)
                .with_ansi(config.ansi);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Json | LogFormat::Compact => {
            // json 输出未启用, 降级到紧凑格式
            let fmt_layer = fmt::layer()
                .compact()
                .with_target(config.show_target)
                .with_thread_ids(config.show_thread_ids)
                .with_ansi(config.ansi);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    tracing::debug!(
        level = %config.level,
        format = ?config.format,
        "Logging system initialized"
    );

    Ok(())
}
