//! tracing-subscriber setup.

use moltclaw_core::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// Level precedence: `RUST_LOG`, then `-v`, then `logging.level`, then
/// `info`. `logging.filters` are added on top.
pub fn init(verbose: bool, config: Option<&LoggingConfig>) -> anyhow::Result<()> {
    let level = if verbose {
        "debug".to_string()
    } else {
        config
            .and_then(|c| c.level.clone())
            .unwrap_or_else(|| "info".to_string())
    };

    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
    for directive in config.map(|c| c.filters.as_slice()).unwrap_or_default() {
        filter = filter.add_directive(directive.parse()?);
    }

    let json = config.is_some_and(|c| c.format == "json");
    let stdout = config.is_some_and(|c| c.output == "stdout");

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match (json, stdout) {
        (true, true) => builder.json().with_writer(std::io::stdout).try_init(),
        (true, false) => builder.json().with_writer(std::io::stderr).try_init(),
        (false, true) => builder.with_writer(std::io::stdout).try_init(),
        (false, false) => builder.with_writer(std::io::stderr).try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))
}
