//! In-band lead marker stripping.
//!
//! The backend signals a captured lead by appending a sentinel token to its
//! reply text, optionally followed by `: <payload>` (which may end in a
//! bracketed list). The marker is a versioned protocol between this relay
//! and the backend: only an end-anchored suffix is recognized, so an
//! occurrence of the token in the middle of an answer is left untouched.

/// Default marker; overridable through `backend.sentinel_token`.
pub const DEFAULT_SENTINEL_TOKEN: &str = "LEAD_CAPTURED";

/// Strips a trailing sentinel suffix from `text`.
///
/// Returns the cleaned, whitespace-trimmed text plus whether the sentinel
/// was present. Recognized suffix shapes, anchored at end of text:
/// - `<token>`
/// - `<token>: <anything>` (the payload runs to end of text on one line)
///
/// A colon payload never spans lines. If a newline follows `<token>:`, the
/// occurrence is part of the answer, not a marker.
pub fn strip_sentinel(text: &str, token: &str) -> (String, bool) {
    if token.is_empty() {
        return (text.trim().to_string(), false);
    }

    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find(token) {
        let start = search_from + offset;
        let rest = &text[start + token.len()..];
        if rest.trim().is_empty() || (rest.starts_with(':') && !rest.contains('\n')) {
            return (text[..start].trim().to_string(), true);
        }
        search_from = start + token.len();
    }

    (text.trim().to_string(), false)
}
