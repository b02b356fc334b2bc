//! Liveness check for the bot

use crate::{
	states::{ApplicationContext, InteractionResult},
	translation::Translate,
};
use poise::{command, send_application_reply, CreateReply};

/// Say hello
#[command(slash_command)]
#[tracing::instrument(skip(ctx), fields(caller_id = %ctx.interaction.user.id))]
pub(crate) async fn hello(ctx: ApplicationContext<'_>) -> InteractionResult {
	send_application_reply(
		ctx,
		CreateReply::default().content(ctx.translate("hello-response", None)),
	)
	.await?;

	Ok(())
}
