use clap::Parser;
use monitorctl::LogFormat;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

fn main() -> Result<(), anyhow::Error> {
    let cli = monitorctl::Cli::parse();

    let default_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    match cli.log_format {
        LogFormat::Text => tracing_subscriber::fmt::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
        // Without flattening, fields (including the message) are nested
        // inside of a `"fields"` object.
        LogFormat::Json => tracing_subscriber::fmt::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .flatten_event(true)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
            .with_current_span(true)
            .with_span_list(false)
            .init(),
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .build()?;

    let handle = runtime.spawn(async move { cli.run().await });
    let result = runtime.block_on(handle);

    // An incomplete spawned future could otherwise block indefinitely.
    runtime.shutdown_background();

    result?
}
