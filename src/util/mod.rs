//! Name folding and hostmask helpers shared by the channel engine.

pub mod casemap;
pub mod mask;

pub use casemap::{irc_eq, irc_to_lower};
pub use mask::{matches_hostmask, normalize_mask, wildcard_match};

/// Validate a channel name.
///
/// Names start with `#` or `&` and may not contain spaces, commas, BEL,
/// NUL or other control characters.
pub fn is_valid_channel(name: &str, max_len: usize) -> bool {
    if name.len() < 2 || name.len() > max_len {
        return false;
    }
    if !name.starts_with(['#', '&']) {
        return false;
    }
    name.chars().all(|c| c != ' ' && c != ',' && !c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names() {
        assert!(is_valid_channel("#rust", 200));
        assert!(is_valid_channel("&local", 200));
        assert!(is_valid_channel("##rust_1700000000", 200));
        assert!(!is_valid_channel("#", 200));
        assert!(!is_valid_channel("rust", 200));
        assert!(!is_valid_channel("#a b", 200));
        assert!(!is_valid_channel("#a,b", 200));
        assert!(!is_valid_channel("#a\x07", 200));
        assert!(!is_valid_channel("#toolong", 5));
    }
}
