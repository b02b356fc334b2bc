//! Tracing subscriber setup

use crate::states::Data;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter used when `RUST_LOG` is not set
const DEFAULT_FILTER: &str = "info,discord_event_points=debug";

/// Install the global tracing subscriber
///
/// Production emits JSON lines. Development pretty prints and also serves `tokio-console`.
pub(crate) fn setup_logging(data: &Data) -> anyhow::Result<()> {
	let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

	if data.config.production {
		tracing_subscriber::registry()
			.with(fmt::layer().json().with_filter(filter))
			.try_init()?;
	} else {
		tracing_subscriber::registry()
			.with(console_subscriber::spawn())
			.with(fmt::layer().pretty().with_filter(filter))
			.try_init()?;
	}

	tracing::debug!(production = data.config.production, "logging initialized");

	Ok(())
}
