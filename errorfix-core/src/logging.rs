use tracing_subscriber::EnvFilter;

/// Initialize logging (call once early in the binary).
///
/// `RUST_LOG` controls the filter and defaults to `info`. JSON output keeps
/// fields machine-readable for log shippers.
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let _ = if json {
        builder
            .json()
            .with_current_span(true)
            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
            .try_init()
    } else {
        builder.try_init()
    };
}
