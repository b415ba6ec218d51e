/// Number of leading key characters shown when a key is echoed back.
pub const KEY_PREFIX_LEN: usize = 8;

/// Leading characters of an API key, safe to display.
///
/// Keys longer than [`KEY_PREFIX_LEN`] show exactly that many characters.
/// Shorter keys show only their first half so the full secret never appears.
pub fn key_prefix(full_key: &str) -> String {
    let len = full_key.chars().count();
    let take = if len > KEY_PREFIX_LEN {
        KEY_PREFIX_LEN
    } else {
        len / 2
    };
    full_key.chars().take(take).collect()
}

/// Display form of a key: prefix followed by an ellipsis.
pub fn masked_key(full_key: &str) -> String {
    format!("{}...", key_prefix(full_key))
}
