use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` takes precedence over `default_level`.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,branchboard={default_level}"))
    });

    let layer = tracing_subscriber::fmt::layer().with_target(false);
    #[cfg(debug_assertions)]
    let layer = layer.with_file(true).with_line_number(true);

    // a second init (tests, embedding) is not an error worth surfacing
    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
}
