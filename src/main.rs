//! Discord event points bot

mod auth;
mod commands;
mod constants;
mod event_log;
mod events;
mod guild;
mod logging;
mod mentions;
mod roles;
mod states;
mod store;
#[cfg(test)]
mod testing;
mod translation;

use crate::{
	commands::{command_on_error, post_command, pre_command},
	events::event_handler,
	logging::setup_logging,
	states::{ArcData, Data, Framework},
};
use anyhow::anyhow;
use poise::serenity_prelude::{ClientBuilder, GatewayIntents};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::instrument;

/// Build the `poise` [framework](poise::Framework)
#[instrument]
fn build_framework(data: ArcData) -> Framework {
	let commands = {
		use commands::{givehost, hello, log, setlogchannel};

		let mut commands = vec![hello(), setlogchannel(), givehost(), log()];

		data.translations
			.apply_translations_to_interactions(&mut commands);

		commands
	};

	Framework::builder()
		.setup(move |_ctx, _ready, _framework| Box::pin(async move { Ok(data) }))
		.options(poise::FrameworkOptions {
			pre_command,
			on_error: command_on_error,
			post_command,
			event_handler: |ctx, event, fw, data| Box::pin(event_handler(ctx, event, fw, data)),
			commands,
			..Default::default()
		})
		.build()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let data = Arc::new(Data::new().await?);

	setup_logging(&data)?;

	let mut client = ClientBuilder::new(
		data.config.discord_token.expose_secret(),
		GatewayIntents::GUILDS | GatewayIntents::GUILD_MEMBERS,
	)
	.framework(build_framework(Arc::clone(&data)))
	.await?;

	if let Err(error) = client.start().await {
		return Err(anyhow!("Client exited with error: {}", error));
	}

	Ok(())
}
