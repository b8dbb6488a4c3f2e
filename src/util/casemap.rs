//! RFC 1459 case folding.
//!
//! Channel names, nicks and list masks compare case-insensitively, with
//! `{}|^` as the lower-case forms of `[]\~`. Every map key in the registry
//! is a folded name.

/// Fold one character.
#[inline]
pub const fn irc_lower_char(c: char) -> char {
    match c {
        'A'..='Z' => c.to_ascii_lowercase(),
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        _ => c,
    }
}

/// The registry key for a channel name or nick.
pub fn irc_to_lower(s: &str) -> String {
    s.chars().map(irc_lower_char).collect()
}

/// Whether two names or masks fold to the same key.
pub fn irc_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.chars().map(irc_lower_char).eq(b.chars().map(irc_lower_char))
}
