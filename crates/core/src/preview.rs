//! Bounded excerpts of untrusted payloads for log fields.

/// Characters kept by [`log_preview`].
pub const LOG_PREVIEW_CHARS: usize = 64;

/// At most [`LOG_PREVIEW_CHARS`] characters of `text`, cut on a char
/// boundary. Pair it with the full byte length in the same event.
pub fn log_preview(text: &str) -> &str {
    match text.char_indices().nth(LOG_PREVIEW_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
