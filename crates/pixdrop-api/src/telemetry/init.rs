use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter. With `json` set, events are written as one
/// JSON object per line; otherwise a compact console format is used.
pub fn init_telemetry(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pixdrop=debug,tower_http=debug".into());

    let json_fmt = json.then(|| tracing_subscriber::fmt::layer().json().with_target(false));
    let console_fmt = (!json).then(|| {
        tracing_subscriber::fmt::layer().event_format(
            Format::default()
                .compact()
                .with_target(false)
                .without_time(),
        )
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_fmt)
        .with(console_fmt)
        .try_init()?;

    tracing::info!(json, "Tracing initialized");
    Ok(())
}
