//! Configure where event records are posted

use crate::{
	states::{ApplicationContext, ApplicationContextPolyfill, InteractionResult},
	translation::Translate,
};
use fluent::fluent_args;
use poise::{
	command,
	serenity_prelude::{self as serenity, Mentionable},
};

/// Set the channel receiving event logs
#[command(slash_command, guild_only, default_member_permissions = "MANAGE_GUILD")]
#[tracing::instrument(skip(ctx, channel), fields(caller_id = %ctx.interaction.user.id, channel_id = %channel.id))]
pub(crate) async fn setlogchannel(
	ctx: ApplicationContext<'_>,
	#[description = "Channel receiving event logs"]
	#[channel_types("Text")]
	channel: serenity::GuildChannel,
) -> InteractionResult {
	{
		let mut ledger = ctx.data.ledger.lock().await;
		ledger.set_log_channel(channel.id);
		ledger.save().await?;
	}

	tracing::info!(channel_id = channel.id.get(), "log channel updated");

	ctx.shout(ctx.translate(
		"setlogchannel-success",
		Some(fluent_args!["channel" => channel.mention().to_string()]),
	))
	.await?;

	Ok(())
}
