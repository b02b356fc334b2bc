//! In-memory guild used by unit tests

#![allow(clippy::unwrap_used, clippy::missing_docs_in_private_items)]

use crate::{
	mentions::MemberDirectory,
	roles::{GuildRole, RoleDirectory, RoleSyncError},
};
use poise::{
	async_trait,
	serenity_prelude::{RoleId, UserId},
};
use std::{collections::HashMap, sync::Mutex, time::Duration};

#[derive(Default)]
struct State {
	next_role_id: u64,
	roles: Vec<GuildRole>,
	members: HashMap<UserId, Member>,
	created_roles: usize,
	mutations: usize,
	deny_role_creation: bool,
	latency: Option<Duration>,
}

struct Member {
	display_name: String,
	roles: Vec<RoleId>,
}

/// A guild whose members and roles live in memory
#[derive(Default)]
pub(crate) struct FakeGuild {
	state: Mutex<State>,
}

impl FakeGuild {
	pub(crate) fn with_members(members: &[(u64, &str)]) -> Self {
		let guild = Self::default();

		{
			let mut state = guild.state.lock().unwrap();
			state.next_role_id = 10_000;
			for (id, name) in members {
				state.members.insert(
					UserId::new(*id),
					Member {
						display_name: (*name).to_owned(),
						roles: Vec::new(),
					},
				);
			}
		}

		guild
	}

	pub(crate) fn add_role(&self, name: &str) -> RoleId {
		let mut state = self.state.lock().unwrap();
		state.next_role_id += 1;
		let id = RoleId::new(state.next_role_id);
		state.roles.push(GuildRole {
			id,
			name: name.to_owned(),
		});

		id
	}

	pub(crate) fn grant(&self, user: UserId, role: RoleId) {
		let mut state = self.state.lock().unwrap();
		state.members.get_mut(&user).unwrap().roles.push(role);
	}

	pub(crate) fn role_name(&self, role: RoleId) -> Option<String> {
		let state = self.state.lock().unwrap();
		state
			.roles
			.iter()
			.find(|known| known.id == role)
			.map(|known| known.name.clone())
	}

	pub(crate) fn held_role_names(&self, user: UserId) -> Vec<String> {
		let state = self.state.lock().unwrap();
		state.members[&user]
			.roles
			.iter()
			.filter_map(|role| {
				state
					.roles
					.iter()
					.find(|known| known.id == *role)
					.map(|known| known.name.clone())
			})
			.collect()
	}

	pub(crate) fn created_roles(&self) -> usize {
		self.state.lock().unwrap().created_roles
	}

	/// Number of role create, attach and detach calls served so far
	pub(crate) fn mutations(&self) -> usize {
		self.state.lock().unwrap().mutations
	}

	pub(crate) fn deny_role_creation(&self) {
		self.state.lock().unwrap().deny_role_creation = true;
	}

	pub(crate) fn set_latency(&self, latency: Duration) {
		self.state.lock().unwrap().latency = Some(latency);
	}

	async fn wait(&self) {
		let latency = self.state.lock().unwrap().latency;
		if let Some(latency) = latency {
			tokio::time::sleep(latency).await;
		}
	}
}

#[async_trait]
impl MemberDirectory for FakeGuild {
	async fn member_by_id(&self, user_id: UserId) -> Option<UserId> {
		let state = self.state.lock().unwrap();
		state.members.contains_key(&user_id).then_some(user_id)
	}

	async fn member_by_display_name(&self, name: &str) -> Option<UserId> {
		let state = self.state.lock().unwrap();
		state
			.members
			.iter()
			.find(|(_, member)| member.display_name == name)
			.map(|(id, _)| *id)
	}
}

#[async_trait]
impl RoleDirectory for FakeGuild {
	async fn guild_roles(&self) -> Result<Vec<GuildRole>, RoleSyncError> {
		self.wait().await;
		Ok(self.state.lock().unwrap().roles.clone())
	}

	async fn create_role(&self, name: &str) -> Result<GuildRole, RoleSyncError> {
		self.wait().await;
		if self.state.lock().unwrap().deny_role_creation {
			return Err(RoleSyncError::Forbidden);
		}

		let id = self.add_role(name);
		let mut state = self.state.lock().unwrap();
		state.created_roles += 1;
		state.mutations += 1;

		Ok(GuildRole {
			id,
			name: name.to_owned(),
		})
	}

	async fn member_roles(&self, user: UserId) -> Result<Vec<RoleId>, RoleSyncError> {
		self.wait().await;
		Ok(self.state.lock().unwrap().members[&user].roles.clone())
	}

	async fn add_member_role(&self, user: UserId, role: RoleId) -> Result<(), RoleSyncError> {
		self.wait().await;
		let mut state = self.state.lock().unwrap();
		state.mutations += 1;
		let roles = &mut state.members.get_mut(&user).unwrap().roles;
		if !roles.contains(&role) {
			roles.push(role);
		}

		Ok(())
	}

	async fn remove_member_role(&self, user: UserId, role: RoleId) -> Result<(), RoleSyncError> {
		self.wait().await;
		let mut state = self.state.lock().unwrap();
		state.mutations += 1;
		state
			.members
			.get_mut(&user)
			.unwrap()
			.roles
			.retain(|held| *held != role);

		Ok(())
	}
}
