//! `Discord` client events handlers

use crate::{
	commands::register_,
	states::{ArcData, FrameworkContext, InteractionResult},
};
use anyhow::Context;
use poise::serenity_prelude::{self, FullEvent};

/// Serenity listener to react to `Discord` events
pub(crate) async fn event_handler(
	ctx: &serenity_prelude::Context,
	event: &FullEvent,
	framework: FrameworkContext<'_>,
	data: &ArcData,
) -> InteractionResult {
	match event {
		FullEvent::Ready { data_about_bot } => {
			register_(
				&ctx.http,
				data.config.discord_development_guild,
				&framework.options.commands,
			)
			.await
			.context("Could not register commands")?;

			tracing::info!("`{}` is ready!", data_about_bot.user.name);

			Ok(())
		}

		FullEvent::GuildRoleDelete {
			guild_id,
			removed_role_id,
			..
		} => {
			let mut ledger = data.ledger.lock().await;
			let cleared = ledger.forget_tier_role(*removed_role_id);

			if cleared > 0 {
				tracing::info!(
					guild_id = guild_id.get(),
					role_id = removed_role_id.get(),
					cleared,
					"Forgetting deleted tier role",
				);

				ledger.save().await?;
			}

			Ok(())
		}

		_ => {
			tracing::trace!(event = ?event, "missed event");

			Ok(())
		}
	}
}
