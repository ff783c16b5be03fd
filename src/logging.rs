//! Log output for the command line tools.
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Targets that log at the chosen level unless `RUST_LOG` says otherwise.
const TARGETS: [&str; 3] = ["chip_tools", "chips_to_json", "extract_images"];

/// Builds the default filter directives, e.g. `chip_tools=info,chips_to_json=info,...`.
pub fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    TARGETS.iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs a formatting subscriber on standard output, filtered by `RUST_LOG` when set.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directives(verbose).into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
