//! Ownership marker codec.
//!
//! A managed entry carries the token `CRONTOPUS:<id>`, either as a trailing
//! crontab comment or as task metadata. The token format is a compatibility
//! contract with external tooling and must not change.
//!
//! Pure functions only: no I/O, no async.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::error::SchedulerError;

/// Literal keyword every marker starts with.
pub const MARKER_KEYWORD: &str = "CRONTOPUS";
/// Keyword plus delimiter, as it appears in native entries.
pub const MARKER_PREFIX: &str = "CRONTOPUS:";
/// Upper bound on id length.
pub const MAX_ID_LEN: usize = 128;

/// Ids must survive every native channel unescaped: no whitespace, no `#`,
/// no `%` (crontab newline), no `:` or `\` (task path separators).
pub static JOB_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Safety: this is a compile-time constant pattern and cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,127}$").expect("valid regex")
});

/// Returns `true` if `id` can be embedded in a marker.
#[must_use]
pub fn is_valid_id(id: &str) -> bool {
    JOB_ID_RE.is_match(id)
}

/// Encode `id` into its marker token.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidEntry` if `id` is empty or contains
/// characters outside the marker alphabet.
pub fn encode(id: &str) -> Result<String, SchedulerError> {
    if id.is_empty() {
        return Err(SchedulerError::invalid(id, "id must not be empty"));
    }
    if !is_valid_id(id) {
        return Err(SchedulerError::invalid(
            id,
            format!(
                "id must match {} (letters, digits, '.', '_', '-'; at most {MAX_ID_LEN} chars)",
                JOB_ID_RE.as_str()
            ),
        ));
    }
    Ok(format!("{MARKER_PREFIX}{id}"))
}

/// Decode a marker token. `None` means "not a marker" and is never an error.
///
/// The token must be exactly `CRONTOPUS:<id>` and re-encode byte-for-byte.
#[must_use]
pub fn decode(token: &str) -> Option<String> {
    let id = token.strip_prefix(MARKER_PREFIX)?;
    let reencoded = encode(id).ok()?;
    (reencoded == token).then(|| id.to_string())
}

/// Returns `true` if `text` mentions the marker keyword at all.
///
/// Used to flag entries that look managed but failed to decode.
#[must_use]
pub fn resembles_marker(text: &str) -> bool {
    text.contains(MARKER_KEYWORD)
}
