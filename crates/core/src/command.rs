//! `+compilebot` command grammar.
//!
//! A command is a single chat message made of three parts:
//!
//! ```text
//! +compilebot <language> ```<code>```
//! ^ prefix    ^ token    ^ fenced body (may span lines)
//! ```
//!
//! Each part has its own rule so edge cases (missing closing fence,
//! nested fences, odd language tokens) can be checked in isolation.
//! [`parse`] composes them.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CommandError;

/// Literal prefix every command starts with, including the separating space.
pub const COMMAND_PREFIX: &str = "+compilebot ";

/// Code fence delimiter.
pub const FENCE: &str = "```";

static LANGUAGE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]+$").expect("valid regex"));

/// A validated command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Lowercase language token, e.g. `"go"`.
    pub language: String,
    /// Source code with the surrounding backticks trimmed.
    pub code: String,
}

/// Whether a message is addressed to the bot at all.
///
/// Messages that fail this check (including ones shorter than the prefix)
/// are ignored without a reply.
pub fn is_command(raw: &str) -> bool {
    raw.starts_with(COMMAND_PREFIX)
}

/// Validate a command message and extract its language and code.
///
/// The allow-list is not consulted here; callers decide which languages
/// they accept.
pub fn parse(raw: &str) -> Result<Command, CommandError> {
    let rest = raw
        .strip_prefix(COMMAND_PREFIX)
        .ok_or(CommandError::Syntax)?;
    let (language, body) = split_language(rest).ok_or(CommandError::Syntax)?;

    if !is_language_token(language) || !is_fenced_block(body) {
        return Err(CommandError::Syntax);
    }

    let code = extract_code(raw)?;

    Ok(Command {
        language: language.to_string(),
        code: code.to_string(),
    })
}

/// Split the text after the prefix into the language token and the body.
///
/// The token is everything up to the first space.
pub fn split_language(rest: &str) -> Option<(&str, &str)> {
    rest.split_once(' ')
}

/// A language token is one lowercase ASCII word.
pub fn is_language_token(token: &str) -> bool {
    LANGUAGE_TOKEN_RE.is_match(token)
}

/// The body must open and close with a fence. Trailing whitespace after
/// the closing fence is tolerated.
pub fn is_fenced_block(body: &str) -> bool {
    let body = body.trim_end();
    body.len() >= 2 * FENCE.len() && body.starts_with(FENCE) && body.ends_with(FENCE)
}

/// Locate the span from the first fence to the last fence in `raw` and
/// trim backticks from both ends.
///
/// Fences inside the span are kept verbatim.
pub fn extract_code(raw: &str) -> Result<&str, CommandError> {
    let start = raw.find(FENCE).ok_or(CommandError::Extraction)?;
    let end = raw
        .rfind(FENCE)
        .filter(|&end| end >= start + FENCE.len())
        .ok_or(CommandError::Extraction)?;

    Ok(raw[start..end + FENCE.len()].trim_matches('`'))
}
