//! Log an event: award points to every participant and refresh their tier role

use crate::{
	auth::{Capabilities, LogPolicy},
	constants::limits,
	mentions::{self, MemberDirectory},
	roles::{RoleDirectory, TierRoles},
	store::{PointsStore, StorageError},
};
use futures::future::join_all;
use poise::serenity_prelude::{ChannelId, Mentionable, RoleId, UserId};
use tokio::sync::Mutex;

/// Why an event was refused before any effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rejection {
	/// The caller does not pass the configured [`LogPolicy`]
	Unauthorized(LogPolicy),
	/// The multiplier is outside of the accepted bounds
	MultiplierOutOfRange,
	/// No log channel was ever configured
	LogChannelUnset,
	/// The configured log channel does not exist anymore
	LogChannelInvalid,
}

impl Rejection {
	/// The translation key of the message shown to the caller
	pub(crate) const fn translation_key(self) -> &'static str {
		match self {
			Self::Unauthorized(LogPolicy::Administrator) => "log-unauthorized-administrator",
			Self::Unauthorized(LogPolicy::Anyone | LogPolicy::EventHost) => {
				"log-unauthorized-event-host"
			}
			Self::MultiplierOutOfRange => "log-multiplier-out-of-range",
			Self::LogChannelUnset => "log-channel-unset",
			Self::LogChannelInvalid => "log-channel-invalid",
		}
	}
}

/// Whether the configured log channel can receive records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogChannelState {
	/// Never configured
	Unset,
	/// Configured but no longer resolving to a guild channel
	Gone(ChannelId),
	/// Ready to receive records
	Live(ChannelId),
}

/// Check the caller against the policy
pub(crate) const fn authorize(
	policy: LogPolicy,
	capabilities: &Capabilities,
) -> Result<(), Rejection> {
	if policy.permits(capabilities) {
		Ok(())
	} else {
		Err(Rejection::Unauthorized(policy))
	}
}

/// Check the multiplier is within bounds
pub(crate) fn check_multiplier(multiplier: i64) -> Result<u32, Rejection> {
	u32::try_from(multiplier)
		.ok()
		.filter(|value| (limits::MIN_MULTIPLIER..=limits::MAX_MULTIPLIER).contains(value))
		.ok_or(Rejection::MultiplierOutOfRange)
}

/// Check a log channel is available
pub(crate) const fn check_log_channel(state: LogChannelState) -> Result<ChannelId, Rejection> {
	match state {
		LogChannelState::Unset => Err(Rejection::LogChannelUnset),
		LogChannelState::Gone(_) => Err(Rejection::LogChannelInvalid),
		LogChannelState::Live(channel) => Ok(channel),
	}
}

/// The outcome of a logged event, posted to the log channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EventRecord {
	/// The event host
	pub(crate) host: UserId,
	/// The event co-host
	pub(crate) co_host: UserId,
	/// Resolved attendees in input order
	pub(crate) attendees: Vec<UserId>,
	/// Points awarded to each participant
	pub(crate) multiplier: u32,
	/// Attendee tokens that matched nobody
	pub(crate) unresolved: usize,
	/// Participants whose tier role could not be updated
	pub(crate) role_failures: Vec<UserId>,
}

impl EventRecord {
	/// Every participant occurrence, host and co-host first
	pub(crate) fn participants(&self) -> impl Iterator<Item = UserId> + '_ {
		[self.host, self.co_host]
			.into_iter()
			.chain(self.attendees.iter().copied())
	}

	/// Format the record for the log channel
	pub(crate) fn render(&self) -> String {
		let attendees = if self.attendees.is_empty() {
			"*none*".to_owned()
		} else {
			self.attendees
				.iter()
				.map(|attendee| attendee.mention().to_string())
				.collect::<Vec<_>>()
				.join(" ")
		};

		format!(
			"**Host:** {}\n**Co-host:** {}\n**Attendees:** {attendees}\nEach participant got {} point(s).",
			self.host.mention(),
			self.co_host.mention(),
			self.multiplier,
		)
	}
}

/// A distinct participant with the total the tier role must reflect
#[derive(Debug, Clone, Copy)]
struct PendingSync {
	/// The participant
	user: UserId,
	/// Their current total
	total: u64,
	/// Their tracked tier role
	tracked: Option<RoleId>,
}

/// Resolve attendees, award points, persist them and refresh tier roles
///
/// The ledger lock is only held while the in-memory ledger is touched and flushed,
/// never across remote role calls. Tier roles are refreshed under `role_sync`, with
/// the totals read once it is held, so overlapping events settle on the latest total.
#[tracing::instrument(skip(ledger, role_sync, guild))]
pub(crate) async fn apply_event(
	ledger: &Mutex<PointsStore>,
	role_sync: &Mutex<()>,
	guild: &(impl MemberDirectory + RoleDirectory + ?Sized),
	host: UserId,
	co_host: UserId,
	attendees: &str,
	multiplier: u32,
) -> Result<EventRecord, StorageError> {
	let resolution = mentions::resolve(attendees, guild).await;

	let mut record = EventRecord {
		host,
		co_host,
		attendees: resolution.members,
		multiplier,
		unresolved: resolution.unresolved,
		role_failures: Vec::new(),
	};

	let mut distinct: Vec<UserId> = Vec::new();
	{
		let mut ledger = ledger.lock().await;

		for participant in record.participants() {
			ledger.increment(participant, u64::from(multiplier));
			if !distinct.contains(&participant) {
				distinct.push(participant);
			}
		}
		ledger.save().await?;
	}

	let _role_sync = role_sync.lock().await;

	let pending = {
		let ledger = ledger.lock().await;

		distinct
			.into_iter()
			.map(|user| PendingSync {
				user,
				total: ledger.points(user),
				tracked: ledger.tier_role(user),
			})
			.collect::<Vec<_>>()
	};

	let totals: Vec<u64> = pending.iter().map(|sync| sync.total).collect();
	let tiers = match TierRoles::prepare(guild, &totals).await {
		Ok(tiers) => tiers,
		Err(error) => {
			tracing::warn!(error = %error, "could not list guild roles, skipping tier role sync");
			record
				.role_failures
				.extend(pending.iter().map(|sync| sync.user));

			return Ok(record);
		}
	};

	let tiers = &tiers;
	let outcomes = join_all(pending.iter().map(|sync| async move {
		let outcome = tiers.attach(guild, sync.user, sync.total, sync.tracked).await;
		(sync, outcome)
	}))
	.await;

	let mut ledger = ledger.lock().await;
	for (sync, outcome) in outcomes {
		match outcome {
			Ok(role) => ledger.set_tier_role(sync.user, Some(role)),
			Err(error) => {
				tracing::warn!(
					user_id = sync.user.get(),
					total = sync.total,
					error = %error,
					"skipping tier role sync",
				);
				record.role_failures.push(sync.user);
			}
		}
	}
	ledger.save().await?;

	Ok(record)
}
