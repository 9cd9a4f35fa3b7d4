use lazy_static::lazy_static;
use std::collections::HashMap;

/// Prefix of every message surfaced through the notifier.
pub const MESSAGE_PREFIX: &str = "vscode-ytmusic";

const UNAUTHORIZED_HINT: &str = "Unauthorized. Did you enter the auth code correctly?";

lazy_static! {
    static ref FRIENDLY_MESSAGES: HashMap<&'static str, &'static str> = HashMap::from([
        (
            "xhr poll error",
            "Could not connect - XHR Poll Error. Is the Youtube Music Desktop Player running?",
        ),
        (
            "connect error",
            "Could not connect. Is the Youtube Music Desktop Player running with the companion server enabled?",
        ),
        (
            "timeout",
            "The Youtube Music Desktop Player did not answer in time.",
        ),
        ("Unauthorized", UNAUTHORIZED_HINT),
        ("Unathorized", UNAUTHORIZED_HINT),
        ("UNAUTHORIZED", UNAUTHORIZED_HINT),
        (
            "AUTHORIZATION_DISABLED",
            "Authorization is disabled. Please open settings and head to the Integration tab and enable \"Companion server\" and \"Enable companion authorization\".",
        ),
        (
            "AUTHORIZATION_INVALID",
            "While trying to authorize, the server returned an invalid response. Please try again.",
        ),
        (
            "AUTHORIZATION_DENIED",
            "Authorization denied. While trying to authorize, please click on \"Allow\".",
        ),
        (
            "AUTHORIZATION_TIMEOUT",
            "Authorization timed out. Please approve the request in the Youtube Music Desktop Player and try again.",
        ),
        (
            "Too Many Requests",
            "Youtube Music Desktop App rate limited your requests. Please try again in one minute.",
        ),
    ]);
}

/// Rewrites a known raw error string into actionable guidance; unknown
/// strings are returned verbatim.
pub fn friendly_message(raw: &str) -> &str {
    FRIENDLY_MESSAGES.get(raw).copied().unwrap_or(raw)
}

/// Text handed to the notifier for a raw error.
pub fn user_facing(raw: &str) -> String {
    format!("{}: {}", MESSAGE_PREFIX, friendly_message(raw))
}
