//! Turn a free-text attendee list into guild members

use poise::{async_trait, serenity_prelude::UserId};

/// Lookup capability over the members of a guild
///
/// A failed lookup is reported as `None`, the same as an unknown member.
#[async_trait]
pub(crate) trait MemberDirectory: Send + Sync {
	/// Find a guild member by id
	async fn member_by_id(&self, user_id: UserId) -> Option<UserId>;

	/// Find a guild member by their exact display name
	async fn member_by_display_name(&self, name: &str) -> Option<UserId>;
}

/// One whitespace-separated entry of an attendee list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttendeeToken<'a> {
	/// `<@123>` or `<@!123>`
	Mention(UserId),
	/// A bare numeric id
	NumericId(UserId),
	/// Anything else, matched against display names
	DisplayName(&'a str),
}

impl<'a> AttendeeToken<'a> {
	/// Classify a single token
	pub(crate) fn parse(token: &'a str) -> Self {
		if let Some(id) = parse_mention(token) {
			return Self::Mention(id);
		}

		match parse_id(token) {
			Some(id) => Self::NumericId(id),
			None => Self::DisplayName(token),
		}
	}

	/// Resolve the token against the guild members
	async fn resolve(self, directory: &(impl MemberDirectory + ?Sized)) -> Option<UserId> {
		match self {
			Self::Mention(id) | Self::NumericId(id) => directory.member_by_id(id).await,
			Self::DisplayName(name) => directory.member_by_display_name(name).await,
		}
	}
}

/// Parse a user mention, with or without the nickname marker
fn parse_mention(token: &str) -> Option<UserId> {
	let inner = token.strip_prefix("<@")?.strip_suffix('>')?;
	let digits = inner.strip_prefix('!').unwrap_or(inner);

	if !digits.bytes().all(|byte| byte.is_ascii_digit()) {
		return None;
	}

	parse_id(digits)
}

/// Parse a non-zero snowflake
fn parse_id(token: &str) -> Option<UserId> {
	token
		.parse::<u64>()
		.ok()
		.filter(|&id| id != 0)
		.map(UserId::new)
}

/// The outcome of resolving an attendee list
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Resolution {
	/// Resolved members, in input order
	pub(crate) members: Vec<UserId>,
	/// Number of tokens that matched nobody
	pub(crate) unresolved: usize,
}

/// Resolve every token of `raw` against `directory`, dropping the unknown ones
#[tracing::instrument(skip(directory))]
pub(crate) async fn resolve(raw: &str, directory: &(impl MemberDirectory + ?Sized)) -> Resolution {
	let mut resolution = Resolution::default();

	for token in raw.split_whitespace() {
		match AttendeeToken::parse(token).resolve(directory).await {
			Some(member) => resolution.members.push(member),
			None => {
				tracing::debug!(token, "dropping unresolved attendee");
				resolution.unresolved += 1;
			}
		}
	}

	resolution
}
