//! Rate-limit cooldown extraction from server notice text.
//!
//! The server announces cooldowns inside free-form `servermsg` notices such
//! as `"please wait 4 seconds"`. This is the one place the client matches on
//! exact notice text, so the marker and number format here are wire
//! compatibility, not presentation.

/// Substring that marks a server notice as a rate-limit cooldown.
const RATE_LIMIT_MARKER: &str = "please wait";

/// Extract the cooldown duration from a server notice.
///
/// Returns the number of seconds to hold outbound messages, or `None` when
/// the notice is not a rate-limit cooldown. The reported wait is floored by
/// the server, so one second is added on top.
#[must_use]
pub fn cooldown_secs(message: &str) -> Option<u64> {
    if !message.contains(RATE_LIMIT_MARKER) {
        return None;
    }
    let digits: String = message
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    let reported: u64 = digits.parse().ok()?;
    Some(reported + 1)
}
