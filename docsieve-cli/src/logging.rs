use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber. `RUST_LOG` wins when set; otherwise
/// `verbose` picks between info and debug for the docsieve crates.
pub fn init(verbose: bool) {
    let fallback = if verbose {
        "docsieve_core=debug,docsieve=debug"
    } else {
        "docsieve_core=info,docsieve=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // A second init (tests, embedding) is not an error worth surfacing
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
