//! `Discord` client commands

use crate::{
	auth::Capabilities,
	guild::GuildHandle,
	roles,
	states::{ApplicationContext, Command, Context, ContextPolyfill, Error, FrameworkError, InteractionError},
	translation::Translate,
};
use anyhow::{anyhow, Context as _};
use fluent::fluent_args;
use poise::{
	serenity_prelude::{self as serenity, GuildId, Http},
	BoxFuture,
};
use std::sync::Arc;
use uuid::Uuid;

mod hello;
mod host;
mod log;
mod setup;

pub(crate) use hello::hello;
pub(crate) use host::givehost;
pub(crate) use log::log;
pub(crate) use setup::setlogchannel;

/// Execute before each command
pub(crate) fn pre_command(ctx: Context) -> BoxFuture<()> {
	Box::pin(async move {
		tracing::info!(
			user_id = ctx.author().id.get(),
			username = &ctx.author().name,
			command_id = ctx.command().identifying_name,
			"Command invocation",
		);
	})
}

/// Execute on a error during code execution
pub(crate) fn command_on_error(error: FrameworkError) -> BoxFuture<()> {
	Box::pin(async move {
		let error = match error {
			FrameworkError::Command { error, ctx, .. } => handle_interaction_error(ctx, error)
				.await
				.context("failed to send error message"),

			FrameworkError::EventHandler { error, event, .. } => {
				tracing::error!(
					error = ?error,
					event = ?event,
					"event handler",
				);

				Ok(())
			}

			FrameworkError::CommandCheckFailed { ctx, error, .. } => match error {
				Some(err) => handle_interaction_error(ctx, err)
					.await
					.context("failed to send error message"),
				None => Err(anyhow!("No error provided")),
			},

			FrameworkError::MissingBotPermissions {
				ctx,
				missing_permissions,
				..
			} => ctx
				.shout(ctx.translate(
					"error-bot-missing-permissions",
					Some(fluent_args!["permissions" => missing_permissions.to_string()]),
				))
				.await
				.map(|_| ())
				.context("Failed to send missing bot permissions message"),

			FrameworkError::MissingUserPermissions {
				ctx,
				missing_permissions,
				..
			} => {
				let text = missing_permissions.map_or_else(
					|| ctx.translate("error-user-missing-unknown-permissions", None),
					|permission| {
						ctx.translate(
							"error-user-missing-permissions",
							Some(fluent_args!["permissions" => permission.to_string()]),
						)
					},
				);

				ctx.shout(text)
					.await
					.map(|_| ())
					.context("Failed to send missing user permissions message")
			}

			FrameworkError::GuildOnly { ctx, .. } => ctx
				.shout(ctx.translate("error-guild-only", None))
				.await
				.map(|_| ())
				.context("Failed to send guild only message"),

			error => {
				tracing::error!(error = ?error, "framework");

				Ok(())
			}
		};

		if let Err(error) = error {
			tracing::error!(error = ?error);
		}
	})
}

/// Execute after every successful command
pub(crate) fn post_command(ctx: Context) -> BoxFuture<()> {
	Box::pin(async move {
		tracing::debug!(
			user_id = ctx.author().id.get(),
			username = &ctx.author().name,
			command_id = ctx.command().identifying_name,
			"Command invocation successful",
		);
	})
}

/// Handle our custom command interaction error
async fn handle_interaction_error(
	ctx: Context<'_>,
	error: InteractionError,
) -> serenity::Result<()> {
	let error_identifier = Uuid::new_v4().hyphenated().to_string();

	tracing::error!(
		user_id = ctx.author().id.get(),
		username = ctx.author().name,
		error_id = error_identifier,
		error = ?error,
		command_id = ctx.command().identifying_name,
		"interaction body or check",
	);

	let key = match error {
		Error::Storage(_) => "error-storage-with-id",
		Error::Serenity(_) | Error::Other(_) => "error-internal-with-id",
	};

	ctx.shout(ctx.translate(key, Some(fluent_args!["id" => error_identifier])))
		.await?;

	Ok(())
}

/// Register slash commands in the development guild, or globally without one
pub(crate) async fn register_(
	http: &Http,
	guild_id: Option<GuildId>,
	commands: &[Command],
) -> Result<(), serenity::Error> {
	let commands_collector = poise::builtins::create_application_commands(commands);

	match guild_id {
		Some(guild_id) => {
			guild_id.set_commands(http, commands_collector).await?;
		}
		None => {
			serenity::Command::set_global_commands(http, commands_collector).await?;
		}
	}

	Ok(())
}

/// Role directory over the guild of the interaction
fn guild_handle(ctx: &ApplicationContext<'_>, guild_id: GuildId) -> GuildHandle {
	GuildHandle::new(Arc::clone(&ctx.serenity_context.http), guild_id)
}

/// Capabilities of the member invoking the interaction
///
/// The event host role is only looked up when `with_event_host` is set.
async fn caller_capabilities(
	ctx: &ApplicationContext<'_>,
	guild: &GuildHandle,
	with_event_host: bool,
) -> Capabilities {
	let Some(member) = ctx.interaction.member.as_deref() else {
		return Capabilities::default();
	};

	let event_host_role = if with_event_host {
		match roles::find_role(guild, &ctx.data.config.event_host_role).await {
			Ok(role) => role.map(|role| role.id),
			Err(error) => {
				tracing::warn!(error = %error, "could not look up the event host role");
				None
			}
		}
	} else {
		None
	};

	Capabilities::from_member(member.permissions, &member.roles, event_host_role)
}
