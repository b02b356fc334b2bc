//! Fluent Project translation system

use crate::states::{ApplicationContext, Command, Context};
use anyhow::anyhow;
use fluent::{bundle, FluentArgs, FluentMessage, FluentResource};
use intl_memoizer::concurrent::IntlLangMemoizer as ConcurrentIntlLangMemoizer;
use std::{
	collections::HashMap,
	fmt::{Debug, Formatter},
	fs::{read_dir, read_to_string},
	path::Path,
};
use unic_langid::LanguageIdentifier;

/// The concurrent Fluent bundle used to cache the language results
type FluentBundle = bundle::FluentBundle<FluentResource, ConcurrentIntlLangMemoizer>;

/// Manages the client internationalization
pub(crate) struct Translations {
	/// The fallback locale
	fallback: LanguageIdentifier,
	/// The available locales
	bundles: HashMap<LanguageIdentifier, FluentBundle>,
}

impl Debug for Translations {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Translations")
			.field("fallback", &self.fallback)
			.field("bundles", &self.bundles.keys())
			.finish()
	}
}

/// Parse the content of a Fluent file into a bundle for `locale`
fn parse_bundle(locale: LanguageIdentifier, source: String) -> anyhow::Result<FluentBundle> {
	let resource = FluentResource::try_new(source)
		.map_err(|(_, errors)| anyhow!("failed to parse `{}` bundle: {:?}", locale, errors))?;

	let mut bundle = FluentBundle::new_concurrent(vec![locale]);
	// Keep messages free of unicode isolation marks, `Discord` renders them
	bundle.set_use_isolating(false);
	bundle
		.add_resource(resource)
		.map_err(|errors| anyhow!("failed to add resource to bundle: {:?}", errors))?;

	Ok(bundle)
}

/// Reads and parses the given Fluent file, named after its locale
fn read_fluent_file(path: &Path) -> anyhow::Result<(LanguageIdentifier, FluentBundle)> {
	let locale: LanguageIdentifier = path
		.file_stem()
		.ok_or_else(|| anyhow!("Invalid `.ftl` file"))?
		.to_str()
		.ok_or_else(|| anyhow!("Invalid UTF-8 filename"))?
		.parse()?;

	let bundle = parse_bundle(locale.clone(), read_to_string(path)?)?;

	Ok((locale, bundle))
}

impl Translations {
	/// Load all available translations from the given directory
	pub(crate) fn from_folder(folder: &str, fallback: LanguageIdentifier) -> anyhow::Result<Self> {
		let mut bundles = HashMap::new();

		for entry in read_dir(folder)? {
			let path = entry?.path();
			if !matches!(path.extension(), Some(ext) if ext == "ftl") {
				continue;
			}

			let (locale, bundle) = read_fluent_file(&path)?;
			bundles.insert(locale, bundle);
		}

		Self::new(bundles, fallback)
	}

	/// Build translations from parsed bundles
	fn new(
		bundles: HashMap<LanguageIdentifier, FluentBundle>,
		fallback: LanguageIdentifier,
	) -> anyhow::Result<Self> {
		if !bundles.contains_key(&fallback) {
			return Err(anyhow!("fallback locale bundle not found"));
		}

		Ok(Self { fallback, bundles })
	}

	/// Get a translation from the given key or an error
	pub(crate) fn translate_checked(
		&self,
		locale: &LanguageIdentifier,
		key: &str,
		args: Option<&FluentArgs>,
	) -> anyhow::Result<String> {
		let bundle = match self.bundles.get(locale) {
			Some(bundle) => bundle,
			None => self
				.bundles
				.get(&self.fallback)
				.ok_or_else(|| anyhow!("failed to load fallback locale bundle"))?,
		};

		let pattern = bundle
			.get_message(key)
			.ok_or_else(|| anyhow!("unknown fluent key `{}`", key))?
			.value()
			.ok_or_else(|| anyhow!("message `{}` has no value", key))?;

		let mut errors = Vec::new();
		let formatted = bundle.format_pattern(pattern, args, &mut errors);

		for error in errors {
			tracing::error!("fluent format pattern error {}", error);
		}

		Ok(formatted.into_owned())
	}

	/// Localize the name, description and parameters of every command
	///
	/// Each command is a message named after it, with a `description` attribute and,
	/// for each parameter, a `<parameter>` and a `<parameter>-description` attribute.
	pub(crate) fn apply_translations_to_interactions(&self, commands: &mut [Command]) {
		for command in commands {
			for (locale, bundle) in &self.bundles {
				let Some(message) = bundle.get_message(&command.name) else {
					tracing::error!(
						"translation for command `{}` with locale `{}` does not exist",
						command.name,
						locale
					);

					continue;
				};

				Self::apply_translations_to_command(locale, bundle, &message, command);
			}
		}
	}

	/// Apply the translations of one locale to the given command
	fn apply_translations_to_command(
		locale: &LanguageIdentifier,
		bundle: &FluentBundle,
		message: &FluentMessage,
		command: &mut Command,
	) {
		let render = |pattern| {
			let mut errors = Vec::new();
			let formatted = bundle.format_pattern(pattern, None, &mut errors).into_owned();
			for error in errors {
				tracing::error!("fluent format pattern error {}", error);
			}

			formatted
		};

		let command_name = command.name.clone();
		let apply_attribute = |attribute: &str, localizations: &mut HashMap<String, String>| {
			match message.get_attribute(attribute) {
				Some(translation) => {
					localizations.insert(locale.to_string(), render(translation.value()));
				}
				None => tracing::error!(
					"translation for command `{}` with locale `{}` does not have a `{}` attribute",
					command_name,
					locale,
					attribute
				),
			}
		};

		if let Some(name) = message.value() {
			command
				.name_localizations
				.insert(locale.to_string(), render(name));
		}

		apply_attribute("description", &mut command.description_localizations);

		for parameter in &mut command.parameters {
			apply_attribute(&parameter.name, &mut parameter.name_localizations);
			apply_attribute(
				&format!("{}-description", parameter.name),
				&mut parameter.description_localizations,
			);
		}
	}
}

/// Unwrap a translation or log the failure and use the key itself
fn resolve_or_key(result: anyhow::Result<String>, key: &str, args: Option<&FluentArgs>) -> String {
	match result {
		Ok(string) => string,
		Err(error) => {
			tracing::error!(key = key, args = ?args, error = ?error, "translation error");
			key.to_owned()
		}
	}
}

/// Trait for client internationalisation
pub(crate) trait Translate {
	/// Get the translation for the given message with a locale provided by self context
	fn translate_checked(&self, key: &str, args: Option<&FluentArgs>) -> anyhow::Result<String>;

	/// Get a translated key of the key itself in case it is not found
	fn translate(&self, key: &str, args: Option<FluentArgs>) -> String {
		resolve_or_key(self.translate_checked(key, args.as_ref()), key, args.as_ref())
	}
}

impl Translate for ApplicationContext<'_> {
	fn translate_checked(&self, key: &str, args: Option<&FluentArgs>) -> anyhow::Result<String> {
		let locale: LanguageIdentifier = self.interaction.locale.parse()?;

		self.data.translations.translate_checked(&locale, key, args)
	}
}

impl Translate for Context<'_> {
	fn translate_checked(&self, key: &str, args: Option<&FluentArgs>) -> anyhow::Result<String> {
		let translations = &self.data().translations;
		let locale: LanguageIdentifier = match self.locale() {
			Some(locale) => locale.parse()?,
			None => translations.fallback.clone(),
		};

		translations.translate_checked(&locale, key, args)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use fluent::fluent_args;
	use unic_langid::langid;

	fn translations() -> Translations {
		let en = langid!("en-US");
		let fr = langid!("fr");

		let mut bundles = HashMap::new();
		bundles.insert(
			en.clone(),
			parse_bundle(en.clone(), "hello = Hello\nlog-success = Logged, {$dropped} dropped\n".into()).unwrap(),
		);
		bundles.insert(fr.clone(), parse_bundle(fr, "hello = Bonjour\n".into()).unwrap());

		Translations::new(bundles, en).unwrap()
	}

	#[test]
	fn translates_with_locale_and_falls_back() {
		let translations = translations();

		assert_eq!(
			translations.translate_checked(&langid!("fr"), "hello", None).unwrap(),
			"Bonjour"
		);
		assert_eq!(
			translations.translate_checked(&langid!("de"), "hello", None).unwrap(),
			"Hello"
		);
		assert!(translations.translate_checked(&langid!("fr"), "log-success", None).is_err());
	}

	#[test]
	fn formats_arguments_and_defaults_to_key() {
		let translations = translations();
		let args = fluent_args!["dropped" => 2];

		let en = langid!("en-US");

		assert_eq!(
			translations.translate_checked(&en, "log-success", Some(&args)).unwrap(),
			"Logged, 2 dropped"
		);
		assert_eq!(
			resolve_or_key(
				translations.translate_checked(&en, "missing-key", None),
				"missing-key",
				None
			),
			"missing-key"
		);
	}

	#[test]
	fn shipped_translations_load() {
		let translations =
			Translations::from_folder("translations", langid!("en-US")).unwrap();

		for key in [
			"hello-response",
			"log-unauthorized-event-host",
			"log-unauthorized-administrator",
			"log-multiplier-out-of-range",
			"log-channel-unset",
			"log-channel-invalid",
			"error-internal-with-id",
		] {
			assert!(translations.translate_checked(&langid!("en-US"), key, None).is_ok(), "{key}");
		}
	}

	#[test]
	fn commands_are_localized_in_every_shipped_locale() {
		let translations =
			Translations::from_folder("translations", langid!("en-US")).unwrap();
		let mut commands = vec![
			crate::commands::hello(),
			crate::commands::setlogchannel(),
			crate::commands::givehost(),
			crate::commands::log(),
		];

		translations.apply_translations_to_interactions(&mut commands);

		for command in &commands {
			for locale in ["en-US", "fr"] {
				assert!(command.name_localizations.contains_key(locale), "{}", command.name);
				assert!(
					command.description_localizations.contains_key(locale),
					"{}",
					command.name
				);

				for parameter in &command.parameters {
					assert!(parameter.name_localizations.contains_key(locale), "{}", parameter.name);
					assert!(
						parameter.description_localizations.contains_key(locale),
						"{}",
						parameter.name
					);
				}
			}
		}

		let log = commands.iter().find(|command| command.name == "log").unwrap();
		assert_eq!(log.name_localizations["fr"], "evenement");
	}

	#[test]
	fn missing_fallback_is_an_error() {
		assert!(Translations::new(HashMap::new(), langid!("en-US")).is_err());
	}
}
