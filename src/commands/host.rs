//! Hand out the event host role

use super::{caller_capabilities, guild_handle};
use crate::{
	roles,
	states::{ApplicationContext, ApplicationContextPolyfill, InteractionResult},
	translation::Translate,
};
use fluent::fluent_args;
use poise::{
	command,
	serenity_prelude::{self as serenity, Mentionable},
};

/// Allow a member to log events
#[command(slash_command, guild_only, required_bot_permissions = "MANAGE_ROLES")]
#[tracing::instrument(skip(ctx, member), fields(caller_id = %ctx.interaction.user.id, member_id = %member.user.id))]
pub(crate) async fn givehost(
	ctx: ApplicationContext<'_>,
	#[description = "Member becoming an event host"] member: serenity::Member,
) -> InteractionResult {
	let guild = guild_handle(&ctx, ctx.guild_only_id());

	let capabilities = caller_capabilities(&ctx, &guild, false).await;
	if !ctx.data.config.grant_policy.permits(&capabilities) {
		ctx.shout(ctx.translate("givehost-unauthorized", None))
			.await?;

		return Ok(());
	}

	let role_name = &ctx.data.config.event_host_role;
	let granted = {
		let _role_sync = ctx.data.role_sync.lock().await;
		roles::grant_role(&guild, member.user.id, role_name).await
	};

	match granted {
		Ok(role_id) => {
			tracing::info!(role_id = role_id.get(), "granted event host role");

			ctx.shout(ctx.translate(
				"givehost-success",
				Some(fluent_args!["member" => member.mention().to_string()]),
			))
			.await?;
		}
		Err(error) => {
			tracing::warn!(error = %error, "could not grant event host role");

			ctx.shout(ctx.translate(
				"givehost-role-failed",
				Some(fluent_args![
					"role" => role_name.as_str(),
					"reason" => error.to_string()
				]),
			))
			.await?;
		}
	}

	Ok(())
}
