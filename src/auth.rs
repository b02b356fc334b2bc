//! Who may log events and hand out the event host role

use poise::serenity_prelude::{Permissions, RoleId};
use std::str::FromStr;

/// Parse failure of a policy name
#[derive(Debug, thiserror::Error)]
#[error("unknown policy `{0}`")]
pub(crate) struct UnknownPolicy(String);

/// What the invoking member is allowed to do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Capabilities {
	/// Holds the `ADMINISTRATOR` permission
	pub(crate) administrator: bool,
	/// Holds the `MANAGE_ROLES` permission
	pub(crate) manage_roles: bool,
	/// Holds the event host role
	pub(crate) event_host: bool,
}

impl Capabilities {
	/// Derive capabilities from resolved permissions and held roles
	pub(crate) fn from_member(
		permissions: Option<Permissions>,
		held: &[RoleId],
		event_host_role: Option<RoleId>,
	) -> Self {
		let permissions = permissions.unwrap_or_else(Permissions::empty);

		Self {
			administrator: permissions.administrator(),
			manage_roles: permissions.manage_roles(),
			event_host: event_host_role.is_some_and(|role| held.contains(&role)),
		}
	}
}

/// Gate of the `log` command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum LogPolicy {
	/// Every guild member
	Anyone,
	/// Event hosts and administrators
	#[default]
	EventHost,
	/// Administrators only
	Administrator,
}

impl LogPolicy {
	/// Whether a member with `capabilities` passes this gate
	pub(crate) const fn permits(self, capabilities: &Capabilities) -> bool {
		match self {
			Self::Anyone => true,
			Self::EventHost => capabilities.event_host || capabilities.administrator,
			Self::Administrator => capabilities.administrator,
		}
	}

	/// Whether checking this gate needs the event host role to be looked up
	pub(crate) const fn needs_event_host(self) -> bool {
		matches!(self, Self::EventHost)
	}
}

impl FromStr for LogPolicy {
	type Err = UnknownPolicy;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value {
			"anyone" => Ok(Self::Anyone),
			"event-host" => Ok(Self::EventHost),
			"administrator" => Ok(Self::Administrator),
			other => Err(UnknownPolicy(other.to_owned())),
		}
	}
}

/// Gate of the `givehost` command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum GrantPolicy {
	/// Members allowed to manage roles
	#[default]
	ManageRoles,
	/// Administrators only
	Administrator,
}

impl GrantPolicy {
	/// Whether a member with `capabilities` passes this gate
	pub(crate) const fn permits(self, capabilities: &Capabilities) -> bool {
		match self {
			Self::ManageRoles => capabilities.manage_roles || capabilities.administrator,
			Self::Administrator => capabilities.administrator,
		}
	}
}

impl FromStr for GrantPolicy {
	type Err = UnknownPolicy;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value {
			"manage-roles" => Ok(Self::ManageRoles),
			"administrator" => Ok(Self::Administrator),
			other => Err(UnknownPolicy(other.to_owned())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const HOST: Capabilities = Capabilities {
		administrator: false,
		manage_roles: false,
		event_host: true,
	};
	const ADMIN: Capabilities = Capabilities {
		administrator: true,
		manage_roles: false,
		event_host: false,
	};
	const MANAGER: Capabilities = Capabilities {
		administrator: false,
		manage_roles: true,
		event_host: false,
	};

	#[test]
	fn log_policies() {
		let nobody = Capabilities::default();

		assert!(LogPolicy::Anyone.permits(&nobody));
		assert!(!LogPolicy::EventHost.permits(&nobody));
		assert!(LogPolicy::EventHost.permits(&HOST));
		assert!(LogPolicy::EventHost.permits(&ADMIN));
		assert!(!LogPolicy::Administrator.permits(&HOST));
		assert!(LogPolicy::Administrator.permits(&ADMIN));
	}

	#[test]
	fn grant_policies() {
		assert!(GrantPolicy::ManageRoles.permits(&MANAGER));
		assert!(GrantPolicy::ManageRoles.permits(&ADMIN));
		assert!(!GrantPolicy::ManageRoles.permits(&HOST));
		assert!(!GrantPolicy::Administrator.permits(&MANAGER));
	}

	#[test]
	fn capabilities_from_member() {
		let role = RoleId::new(5);

		let caps = Capabilities::from_member(
			Some(Permissions::MANAGE_ROLES),
			&[RoleId::new(4), role],
			Some(role),
		);
		assert_eq!(
			caps,
			Capabilities {
				administrator: false,
				manage_roles: true,
				event_host: true,
			}
		);

		let caps = Capabilities::from_member(None, &[role], None);
		assert_eq!(caps, Capabilities::default());
	}

	#[test]
	fn parses_policy_names() {
		assert_eq!("anyone".parse::<LogPolicy>().unwrap(), LogPolicy::Anyone);
		assert_eq!(
			"administrator".parse::<GrantPolicy>().unwrap(),
			GrantPolicy::Administrator
		);
		assert!("sometimes".parse::<LogPolicy>().is_err());
	}
}
