//! Turns the free-text search box into the tokens the catalog is queried with.

/// Joiner used in stored file names where the user types a space.
pub const TOKEN_JOINER: &str = "_";

/// Lowercases `raw`, splits it on whitespace and joins any remaining spaces
/// inside a word with [`TOKEN_JOINER`].
///
/// Blank input yields no tokens; each route decides what that means.
pub fn tokenize(raw: &str) -> Vec<String> {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        // Words never contain a space after `split_whitespace`, so this only
        // matters if the splitting rule changes.
        .map(|word| word.replace(' ', TOKEN_JOINER))
        .collect()
}

/// Reverses the joiner substitution for messages shown to the user.
pub fn restore_spaces(token: &str) -> String {
    token.replace(TOKEN_JOINER, " ")
}
