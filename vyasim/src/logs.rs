// logs.rs
use tracing::Level;
use tracing_subscriber::{
    Registry, filter::LevelFilter, layer::SubscriberExt, reload, util::SubscriberInitExt,
};
use vyaconfig::get_config;

/// Handle used to change the log level while running.
pub type LevelHandle = reload::Handle<LevelFilter, Registry>;

/// Installs the global subscriber: reloadable level filter seeded from
/// `host.logger.min_level`, console output when `host.logger.enable_console`.
pub fn init_logging() -> LevelHandle {
    let config = get_config();

    let log_level = match config.get_log_min_level() {
        Ok(l) => match string_to_level(&l) {
            Some(lev) => level_to_levelfilter(lev),
            None => LevelFilter::INFO,
        },
        Err(_) => LevelFilter::INFO,
    };

    let (filter, reload_handle) = reload::Layer::new(log_level);
    let subscriber = Registry::default().with(filter);

    let enable_console = config.get_log_enable_console().unwrap_or(true);
    if enable_console {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true),
            )
            .init();
    } else {
        subscriber.init();
    }

    reload_handle
}

/// Switches the active level, e.g. from `VYASIM_LEVEL`.
pub fn set_level(handle: &LevelHandle, level: &str) -> anyhow::Result<()> {
    let level = string_to_level(level)
        .ok_or_else(|| anyhow::anyhow!("unknown log level '{}'", level))?;
    handle.reload(level_to_levelfilter(level))?;
    Ok(())
}

fn string_to_level(s: &str) -> Option<Level> {
    match s.to_uppercase().as_str() {
        "ERROR" => Some(Level::ERROR),
        "WARN" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" => Some(Level::TRACE),
        _ => None,
    }
}

fn level_to_levelfilter(level: Level) -> LevelFilter {
    match level {
        Level::ERROR => LevelFilter::ERROR,
        Level::WARN => LevelFilter::WARN,
        Level::INFO => LevelFilter::INFO,
        Level::DEBUG => LevelFilter::DEBUG,
        Level::TRACE => LevelFilter::TRACE,
    }
}
