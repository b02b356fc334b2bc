//! Keep the points tier role of members in sync with their total

use crate::constants::{ROLE_CALL_TIMEOUT, TIER_SUFFIX};
use poise::{
	async_trait,
	serenity_prelude::{self as serenity, RoleId, UserId},
};
use std::{collections::HashMap, future::Future};

/// A role as seen in the guild role list
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GuildRole {
	/// The role id
	pub(crate) id: RoleId,
	/// The role label
	pub(crate) name: String,
}

/// Failures of a remote role management call
#[derive(Debug, thiserror::Error)]
pub(crate) enum RoleSyncError {
	/// The bot lacks the permission to manage this role
	#[error("missing permission to manage roles")]
	Forbidden,
	/// The platform did not answer in time
	#[error("role management call timed out")]
	Timeout,
	/// The tier role could neither be found nor created
	#[error("tier role `{0}` is unavailable")]
	Unavailable(String),
	/// Any other platform error
	#[error(transparent)]
	Platform(#[from] serenity::Error),
}

/// Role management capability over a guild
#[async_trait]
pub(crate) trait RoleDirectory: Send + Sync {
	/// Every role of the guild
	async fn guild_roles(&self) -> Result<Vec<GuildRole>, RoleSyncError>;

	/// Create a role with the given label and no permissions
	async fn create_role(&self, name: &str) -> Result<GuildRole, RoleSyncError>;

	/// Roles currently held by a member
	async fn member_roles(&self, user: UserId) -> Result<Vec<RoleId>, RoleSyncError>;

	/// Attach a role to a member
	async fn add_member_role(&self, user: UserId, role: RoleId) -> Result<(), RoleSyncError>;

	/// Detach a role from a member
	async fn remove_member_role(&self, user: UserId, role: RoleId) -> Result<(), RoleSyncError>;
}

/// Label of the tier role for a point total
pub(crate) fn tier_label(total: u64) -> String {
	format!("{total}{TIER_SUFFIX}")
}

/// Whether a role label looks like a tier role, that is a positive integer followed by the tier suffix
pub(crate) fn is_tier_label(name: &str) -> bool {
	name.strip_suffix(TIER_SUFFIX).is_some_and(|digits| {
		!digits.is_empty()
			&& !digits.starts_with('0')
			&& digits.bytes().all(|byte| byte.is_ascii_digit())
	})
}

/// Run a remote call under [`ROLE_CALL_TIMEOUT`]
async fn bounded<T>(
	call: impl Future<Output = Result<T, RoleSyncError>> + Send,
) -> Result<T, RoleSyncError> {
	tokio::time::timeout(ROLE_CALL_TIMEOUT, call)
		.await
		.map_err(|_| RoleSyncError::Timeout)?
}

/// Find a role by its exact label
pub(crate) async fn find_role(
	roles: &(impl RoleDirectory + ?Sized),
	name: &str,
) -> Result<Option<GuildRole>, RoleSyncError> {
	let guild_roles = bounded(roles.guild_roles()).await?;

	Ok(guild_roles.into_iter().find(|role| role.name == name))
}

/// Attach the role labelled `name` to `user`, creating the role if needed
pub(crate) async fn grant_role(
	roles: &(impl RoleDirectory + ?Sized),
	user: UserId,
	name: &str,
) -> Result<RoleId, RoleSyncError> {
	let guild_roles = bounded(roles.guild_roles()).await?;

	let role = match guild_roles.into_iter().find(|role| role.name == name) {
		Some(role) => role,
		None => {
			tracing::info!(role = name, "creating missing role");
			bounded(roles.create_role(name)).await?
		}
	};
	bounded(roles.add_member_role(user, role.id)).await?;

	Ok(role.id)
}

/// Tier roles of a batch of totals, each label found or created once
///
/// Callers must not prepare two batches of the same guild at once, or a missing
/// label may be created twice.
#[derive(Debug)]
pub(crate) struct TierRoles {
	/// Guild roles, including the ones created for this batch
	known: Vec<GuildRole>,
	/// Tier role of each total that could be found or created
	targets: HashMap<u64, RoleId>,
}

impl TierRoles {
	/// List the guild roles once and create every missing tier label, in order
	///
	/// A label that cannot be created is logged and left out, its members then fail
	/// with [`RoleSyncError::Unavailable`] in [`TierRoles::attach`].
	#[tracing::instrument(skip_all)]
	pub(crate) async fn prepare(
		roles: &(impl RoleDirectory + ?Sized),
		totals: &[u64],
	) -> Result<Self, RoleSyncError> {
		let mut known = bounded(roles.guild_roles()).await?;
		let mut targets = HashMap::new();

		for &total in totals {
			if targets.contains_key(&total) {
				continue;
			}

			let label = tier_label(total);
			let role = match known.iter().find(|role| role.name == label) {
				Some(role) => role.id,
				None => {
					tracing::info!(role = label.as_str(), "creating missing tier role");

					match bounded(roles.create_role(&label)).await {
						Ok(role) => {
							let id = role.id;
							known.push(role);
							id
						}
						Err(error) => {
							tracing::warn!(role = label.as_str(), error = %error, "could not create tier role");
							continue;
						}
					}
				}
			};

			targets.insert(total, role);
		}

		Ok(Self { known, targets })
	}

	/// Make `user` hold exactly the tier role matching `total`
	///
	/// `tracked` is the tier role the ledger remembers for that user. It is removed along
	/// with any other tier-shaped role, so stale tiers never accumulate.
	#[tracing::instrument(skip(self, roles))]
	pub(crate) async fn attach(
		&self,
		roles: &(impl RoleDirectory + ?Sized),
		user: UserId,
		total: u64,
		tracked: Option<RoleId>,
	) -> Result<RoleId, RoleSyncError> {
		let target = *self
			.targets
			.get(&total)
			.ok_or_else(|| RoleSyncError::Unavailable(tier_label(total)))?;

		let held = bounded(roles.member_roles(user)).await?;

		let stale = held.iter().copied().filter(|&role| {
			role != target
				&& (Some(role) == tracked
					|| self
						.known
						.iter()
						.any(|known| known.id == role && is_tier_label(&known.name)))
		});

		for role in stale {
			tracing::debug!(role = %role, "removing stale tier role");
			bounded(roles.remove_member_role(user, role)).await?;
		}

		if !held.contains(&target) {
			bounded(roles.add_member_role(user, target)).await?;
		}

		Ok(target)
	}
}
