//! Constant values shared across the bot

use std::time::Duration;

/// Bounds enforced on user input
pub(crate) mod limits {
	/// Lowest accepted event multiplier
	pub(crate) const MIN_MULTIPLIER: u32 = 1;
	/// Highest accepted event multiplier
	pub(crate) const MAX_MULTIPLIER: u32 = 5;
}

/// Default values for optional configuration
pub(crate) mod defaults {
	/// Where the ledger document lives when `LEDGER_PATH` is not set
	pub(crate) const LEDGER_PATH: &str = "data.json";
	/// Name of the role that grants access to the `log` command
	pub(crate) const EVENT_HOST_ROLE: &str = "Event Host";
	/// Locale used when the interaction one has no bundle
	pub(crate) const LOCALE: &str = "en-US";
}

/// Letter that ends every tier role label, as in `12p`
pub(crate) const TIER_SUFFIX: char = 'p';

/// Upper bound for a single remote role management call
pub(crate) const ROLE_CALL_TIMEOUT: Duration = Duration::from_secs(10);
