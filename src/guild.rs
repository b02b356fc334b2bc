//! Member and role directories backed by the `Discord` REST api

use crate::{
	mentions::MemberDirectory,
	roles::{GuildRole, RoleDirectory, RoleSyncError},
};
use poise::{
	async_trait,
	serenity_prelude::{self as serenity, EditRole, GuildId, Http, HttpError, Permissions, RoleId, UserId},
};
use std::sync::Arc;

/// Audit log reason attached to the role changes made by the bot
const AUDIT_REASON: &str = "Points tier update";

/// Upper bound of members returned by a name search
const SEARCH_LIMIT: u64 = 100;

/// A handle on one guild through the bot HTTP client
#[derive(Clone)]
pub(crate) struct GuildHandle {
	/// The shared serenity HTTP client
	http: Arc<Http>,
	/// The guild all calls target
	guild_id: GuildId,
}

impl GuildHandle {
	/// Create a handle on `guild_id`
	pub(crate) const fn new(http: Arc<Http>, guild_id: GuildId) -> Self {
		Self { http, guild_id }
	}
}

/// Tell permission denials apart from other platform failures
fn classify(error: serenity::Error) -> RoleSyncError {
	match &error {
		serenity::Error::Http(HttpError::UnsuccessfulRequest(response))
			if response.status_code.as_u16() == 403 =>
		{
			RoleSyncError::Forbidden
		}
		_ => RoleSyncError::Platform(error),
	}
}

#[async_trait]
impl MemberDirectory for GuildHandle {
	async fn member_by_id(&self, user_id: UserId) -> Option<UserId> {
		match self.guild_id.member(&*self.http, user_id).await {
			Ok(member) => Some(member.user.id),
			Err(error) => {
				tracing::debug!(user_id = user_id.get(), error = ?error, "member lookup failed");
				None
			}
		}
	}

	async fn member_by_display_name(&self, name: &str) -> Option<UserId> {
		let members = match self
			.guild_id
			.search_members(&*self.http, name, Some(SEARCH_LIMIT))
			.await
		{
			Ok(members) => members,
			Err(error) => {
				tracing::debug!(name, error = ?error, "member search failed");
				return None;
			}
		};

		// The search is a prefix match on usernames and nicknames
		members
			.into_iter()
			.find(|member| member.display_name() == name || member.user.name == name)
			.map(|member| member.user.id)
	}
}

#[async_trait]
impl RoleDirectory for GuildHandle {
	async fn guild_roles(&self) -> Result<Vec<GuildRole>, RoleSyncError> {
		let roles = self.guild_id.roles(&*self.http).await.map_err(classify)?;

		Ok(roles
			.into_values()
			.map(|role| GuildRole {
				id: role.id,
				name: role.name,
			})
			.collect())
	}

	async fn create_role(&self, name: &str) -> Result<GuildRole, RoleSyncError> {
		let role = self
			.guild_id
			.create_role(
				&*self.http,
				EditRole::new()
					.name(name)
					.permissions(Permissions::empty())
					.audit_log_reason(AUDIT_REASON),
			)
			.await
			.map_err(classify)?;

		Ok(GuildRole {
			id: role.id,
			name: role.name,
		})
	}

	async fn member_roles(&self, user: UserId) -> Result<Vec<RoleId>, RoleSyncError> {
		let member = self
			.guild_id
			.member(&*self.http, user)
			.await
			.map_err(classify)?;

		Ok(member.roles)
	}

	async fn add_member_role(&self, user: UserId, role: RoleId) -> Result<(), RoleSyncError> {
		self.http
			.add_member_role(self.guild_id, user, role, Some(AUDIT_REASON))
			.await
			.map_err(classify)
	}

	async fn remove_member_role(&self, user: UserId, role: RoleId) -> Result<(), RoleSyncError> {
		self.http
			.remove_member_role(self.guild_id, user, role, Some(AUDIT_REASON))
			.await
			.map_err(classify)
	}
}
