//! Handles all the states of the bot and initial configuration

use crate::{
	auth::{GrantPolicy, LogPolicy},
	constants::defaults,
	store::{PointsStore, StorageError},
	translation::Translations,
};
use anyhow::{anyhow, Context as _};
use dotenvy::dotenv;
use poise::{
	async_trait, send_application_reply,
	serenity_prelude::{self as serenity, GuildId},
	CreateReply, ReplyHandle,
};
use secrecy::SecretString;
use std::{
	env::{self, VarError},
	fmt::Display,
	path::PathBuf,
	str::FromStr,
	sync::Arc,
};
use tokio::sync::Mutex;
use unic_langid::LanguageIdentifier;

/// App global configuration
#[derive(Debug)]
pub(crate) struct Config {
	/// The token needed to access the `Discord` Api
	pub(crate) discord_token: SecretString,
	/// Register commands in this guild only, for development
	pub(crate) discord_development_guild: Option<GuildId>,
	/// Location of the points ledger document
	pub(crate) ledger_path: PathBuf,

	/// Who may use the `log` command
	pub(crate) log_policy: LogPolicy,
	/// Who may use the `givehost` command
	pub(crate) grant_policy: GrantPolicy,
	/// Name of the event host role
	pub(crate) event_host_role: String,

	/// The default locale to use
	pub(crate) default_locale: LanguageIdentifier,
	/// Whether or not to use production defaults
	///
	/// Currently only affects logging
	pub(crate) production: bool,
}

/// Resolve an environment variable or return an appropriate error
fn required_env_var(name: &str) -> anyhow::Result<String> {
	match env::var(name) {
		Ok(val) => Ok(val),
		Err(VarError::NotPresent) => Err(anyhow!("{} must be set in the environnement", name)),
		Err(VarError::NotUnicode(_)) => {
			Err(anyhow!("{} does not contains Unicode valid text", name))
		}
	}
}

/// Parse an optional environment variable, falling back to `default` when unset
fn optional_env_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
	T: FromStr,
	T::Err: Display,
{
	match env::var(name) {
		Ok(val) => val
			.parse::<T>()
			.map_err(|error| anyhow!("{} environnement variable is invalid: {}", name, error)),
		Err(VarError::NotPresent) => Ok(default),
		Err(VarError::NotUnicode(_)) => {
			Err(anyhow!("{} does not contains Unicode valid text", name))
		}
	}
}

impl Config {
	/// Parse the config from the environment, loading a `.env` file if there is one
	fn from_env() -> anyhow::Result<Self> {
		if let Err(error) = dotenv() {
			// Hosting platforms usually inject variables directly
			tracing::debug!(error = ?error, "no `.env` file loaded");
		}

		let discord_development_guild = match env::var("DISCORD_DEV_GUILD") {
			Ok(id) => Some(GuildId::new(
				id.parse::<u64>()
					.ok()
					.filter(|&id| id != 0)
					.ok_or_else(|| {
						anyhow!("DISCORD_DEV_GUILD environnement variable must be a non-zero `u64`")
					})?,
			)),
			Err(_) => None,
		};

		let default_locale = optional_env_var(
			"DEFAULT_LOCALE",
			defaults::LOCALE
				.parse::<LanguageIdentifier>()
				.context("invalid default locale")?,
		)?;

		Ok(Self {
			discord_token: SecretString::from(required_env_var("DISCORD_TOKEN")?),
			discord_development_guild,
			ledger_path: optional_env_var("LEDGER_PATH", PathBuf::from(defaults::LEDGER_PATH))?,

			log_policy: optional_env_var("LOG_POLICY", LogPolicy::default())?,
			grant_policy: optional_env_var("GRANT_POLICY", GrantPolicy::default())?,
			event_host_role: optional_env_var(
				"EVENT_HOST_ROLE",
				defaults::EVENT_HOST_ROLE.to_owned(),
			)?,

			default_locale,
			production: optional_env_var("PRODUCTION", false)?,
		})
	}
}

/// App global data
#[derive(Debug)]
pub(crate) struct Data {
	/// An instance of the parsed initial config
	pub(crate) config: Config,
	/// The points ledger, shared by every command handler
	pub(crate) ledger: Mutex<PointsStore>,
	/// Held while roles are created or tier roles are changed
	pub(crate) role_sync: Mutex<()>,
	/// The translations for the client
	pub(crate) translations: Translations,
}

impl Data {
	/// Parse the config and load the ledger and translations
	pub(crate) async fn new() -> anyhow::Result<Self> {
		let config = Config::from_env()?;

		let ledger = PointsStore::load(&config.ledger_path)
			.await
			.context("failed to load the ledger")?;

		let translations = Translations::from_folder("translations", config.default_locale.clone())
			.context("failed to load translations")?;

		Ok(Self {
			config,
			ledger: Mutex::new(ledger),
			role_sync: Mutex::new(()),
			translations,
		})
	}
}

/// Trait for sending ephemeral messages
#[async_trait]
pub(crate) trait ApplicationContextPolyfill<'a>: Send + Sync {
	/// Send an ephemeral message to the user
	async fn shout(
		&self,
		content: impl Into<String> + Send,
	) -> Result<ReplyHandle<'_>, serenity::Error>;

	/// Get a [`GuildId`] in a `guild_only` interaction context
	///
	/// # Panics
	/// If used in a non `guild_only` interaction context
	fn guild_only_id(&self) -> GuildId;
}

#[async_trait]
impl<'a> ApplicationContextPolyfill<'a> for ApplicationContext<'a> {
	#[inline]
	async fn shout(
		&self,
		content: impl Into<String> + Send,
	) -> Result<ReplyHandle<'_>, serenity::Error> {
		send_application_reply(*self, CreateReply::default().content(content).ephemeral(true))
			.await
	}

	#[inline]
	fn guild_only_id(&self) -> GuildId {
		if self.command.guild_only {
			self.interaction.guild_id.expect("guild_only interactions")
		} else {
			panic!("Should be used only in guild_only interactions")
		}
	}
}

/// Trait for sending ephemeral messages
#[async_trait]
pub(crate) trait ContextPolyfill: Send + Sync {
	/// Send an ephemeral message to the user
	async fn shout(
		&self,
		content: impl Into<String> + Send,
	) -> Result<ReplyHandle<'_>, serenity::Error>;
}

#[async_trait]
impl ContextPolyfill for Context<'_> {
	#[inline]
	async fn shout(
		&self,
		content: impl Into<String> + Send,
	) -> Result<ReplyHandle<'_>, serenity::Error> {
		self.send(CreateReply::default().content(content).ephemeral(true))
			.await
	}
}

/// Common wrapper for the [`Data`]
pub(crate) type ArcData = Arc<Data>;
/// Common interaction or event error type
pub(crate) type InteractionError = Error;
/// Common interaction or event return type
pub(crate) type InteractionResult = Result<(), InteractionError>;

/// A [`poise::Command`] type alias with our common types
pub(crate) type Command = poise::Command<ArcData, InteractionError>;
/// A [`poise::Context`] type alias with our common types, provided to each command
pub(crate) type Context<'a> = poise::Context<'a, ArcData, InteractionError>;
/// A [`poise::ApplicationContext`] type alias with our common types, provided to each slash command
pub(crate) type ApplicationContext<'a> = poise::ApplicationContext<'a, ArcData, InteractionError>;

/// A [`poise::Framework`] type alias with our common types
pub(crate) type Framework = poise::Framework<ArcData, InteractionError>;
/// A [`poise::FrameworkContext`] type alias with our common types
pub(crate) type FrameworkContext<'a> = poise::FrameworkContext<'a, ArcData, InteractionError>;
/// A [`poise::FrameworkError`] type alias with our common types
pub(crate) type FrameworkError<'a> = poise::FrameworkError<'a, ArcData, InteractionError>;

/// An error in an interaction or an event
#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
	/// A serenity error
	#[error(transparent)]
	Serenity(#[from] serenity::Error),
	/// The ledger could not be persisted
	#[error(transparent)]
	Storage(#[from] StorageError),
	/// Collects any other general purpose error
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}
