//! Tracing subscriber setup shared by the pipeline binaries
//!
//! The subscriber is installed before configuration is read, so the
//! config loader's own messages are visible. The configured level is
//! applied afterwards through a reload handle, unless `RUST_LOG` or a
//! command-line level already pinned it.

use crate::config::LoggingConfig;
use tracing::warn;
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Handle to the installed filter
pub struct LogControl {
    handle: reload::Handle<EnvFilter, Registry>,
    crate_target: String,
    pinned: bool,
}

impl LogControl {
    /// Switch to the level from the configuration file
    pub fn apply_config(&self, logging: &LoggingConfig) {
        if self.pinned {
            return;
        }
        let filter = directives(&self.crate_target, &logging.level);
        if let Err(e) = self.handle.modify(|f| *f = EnvFilter::new(filter)) {
            warn!("Failed to apply configured log level '{}': {}", logging.level, e);
        }
    }
}

fn directives(crate_target: &str, level: &str) -> String {
    format!("{crate_target}={level},hprep_common={level}")
}

/// Install the global subscriber writing to stderr
///
/// `RUST_LOG` takes precedence, then `cli_level`, then "info" until
/// [`LogControl::apply_config`] is called.
pub fn init_tracing(crate_target: &str, cli_level: Option<&str>) -> LogControl {
    let (filter, pinned) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => match cli_level {
            Some(level) => (EnvFilter::new(directives(crate_target, level)), true),
            None => (EnvFilter::new(directives(crate_target, "info")), false),
        },
    };
    let (filter, handle) = reload::Layer::new(filter);

    // A subscriber may already be installed (tests); keep the first one.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    LogControl {
        handle,
        crate_target: crate_target.to_string(),
        pinned,
    }
}
