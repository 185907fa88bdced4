//! Tracing subscriber setup.
//!
//! The bridge emits events under two targets: `pyhost::exec` for calls,
//! attribute access and imports, and `pyhost::mem` for acquiring and releasing
//! Python references. Select them with filter directives, for example
//! `PYHOST_LOG=pyhost::mem=trace`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::{LogConfig, LogFormat},
    error::{Error, Result},
};

/// Installs the global tracing subscriber described by `config`.
///
/// Fails with a configuration error if a directive does not parse or a global
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };
    installed.map_err(|err| Error::Config(format!("cannot install log subscriber: {err}")))
}

fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    let mut filter = EnvFilter::default().add_directive(config.level.as_tracing().into());
    if let Some(directives) = &config.filter {
        for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            let directive = directive
                .parse()
                .map_err(|err| Error::Config(format!("invalid filter directive '{directive}': {err}")))?;
            filter = filter.add_directive(directive);
        }
    }
    Ok(filter)
}
