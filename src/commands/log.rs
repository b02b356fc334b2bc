//! Log an event and award points to its participants

use super::{caller_capabilities, guild_handle};
use crate::{
	event_log::{self, LogChannelState, Rejection},
	guild::GuildHandle,
	states::{ApplicationContext, ApplicationContextPolyfill, InteractionResult},
	translation::Translate,
};
use fluent::fluent_args;
use poise::{
	command,
	serenity_prelude::{self as serenity, Channel, ChannelId},
};

/// Log an event: every participant earns `multiplier` points
#[command(slash_command, guild_only, required_bot_permissions = "MANAGE_ROLES")]
#[tracing::instrument(skip(ctx, host, co), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn log(
	ctx: ApplicationContext<'_>,
	#[description = "The event host"] host: serenity::Member,
	#[description = "The event co-host"] co: serenity::Member,
	#[description = "Attendees separated by spaces, as mentions, ids or names"] attendees: String,
	#[description = "Points each participant earns, from 1 to 5"] multiplier: Option<i64>,
) -> InteractionResult {
	ctx.defer_response(true).await?;

	let guild = guild_handle(&ctx, ctx.guild_only_id());

	let (multiplier, log_channel) = match validate(&ctx, &guild, multiplier.unwrap_or(1)).await {
		Ok(validated) => validated,
		Err(rejection) => {
			tracing::info!(rejection = ?rejection, "event rejected");
			ctx.shout(ctx.translate(rejection.translation_key(), None))
				.await?;

			return Ok(());
		}
	};

	let record = event_log::apply_event(
		&ctx.data.ledger,
		&ctx.data.role_sync,
		&guild,
		host.user.id,
		co.user.id,
		&attendees,
		multiplier,
	)
	.await?;

	log_channel
		.say(ctx.serenity_context, record.render())
		.await?;

	let mut acknowledgement = ctx.translate("log-success", None);
	if record.unresolved > 0 {
		acknowledgement.push('\n');
		acknowledgement.push_str(&ctx.translate(
			"log-dropped-attendees",
			Some(fluent_args!["count" => record.unresolved]),
		));
	}
	if !record.role_failures.is_empty() {
		acknowledgement.push('\n');
		acknowledgement.push_str(&ctx.translate(
			"log-role-failures",
			Some(fluent_args!["count" => record.role_failures.len()]),
		));
	}

	ctx.shout(acknowledgement).await?;

	Ok(())
}

/// Check the caller, the multiplier and the log channel, in that order
async fn validate(
	ctx: &ApplicationContext<'_>,
	guild: &GuildHandle,
	multiplier: i64,
) -> Result<(u32, ChannelId), Rejection> {
	let policy = ctx.data.config.log_policy;
	let capabilities = caller_capabilities(ctx, guild, policy.needs_event_host()).await;
	event_log::authorize(policy, &capabilities)?;

	let multiplier = event_log::check_multiplier(multiplier)?;

	let configured = ctx.data.ledger.lock().await.log_channel();
	let state = match configured {
		None => LogChannelState::Unset,
		Some(channel) => match channel.to_channel(ctx.serenity_context).await {
			Ok(Channel::Guild(_)) => LogChannelState::Live(channel),
			Ok(_) => LogChannelState::Gone(channel),
			Err(error) => {
				tracing::debug!(channel_id = channel.get(), error = ?error, "log channel lookup failed");
				LogChannelState::Gone(channel)
			}
		},
	};
	let log_channel = event_log::check_log_channel(state)?;

	Ok((multiplier, log_channel))
}
