//! Hostmask wildcard matching and ban mask normalization.

use super::casemap::irc_lower_char;

/// Match `text` against a glob `pattern` (`*` and `?`), IRC case-insensitively.
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().map(irc_lower_char).collect();
    let text: Vec<char> = text.chars().map(irc_lower_char).collect();

    let mut p = 0;
    let mut t = 0;
    let mut star_p = None;
    let mut star_t = 0;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star_p = Some(p);
            star_t = t;
            p += 1;
        } else if let Some(sp) = star_p {
            // Backtrack: let the last '*' swallow one more char.
            p = sp + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }

    p == pattern.len()
}

/// Match a `nick!user@host` string against a ban-style pattern.
#[inline]
pub fn matches_hostmask(pattern: &str, hostmask: &str) -> bool {
    wildcard_match(pattern, hostmask)
}

/// Collapse runs of `*` into a single `*`.
fn collapse(mask: &str) -> String {
    let mut out = String::with_capacity(mask.len());
    let mut prev_star = false;
    for c in mask.chars() {
        if c == '*' {
            if prev_star {
                continue;
            }
            prev_star = true;
        } else {
            prev_star = false;
        }
        out.push(c);
    }
    out
}

fn or_star(part: &str) -> &str {
    if part.is_empty() { "*" } else { part }
}

/// Normalize a user-supplied ban mask into a full `nick!user@host` triple.
///
/// - `nick!user@host` is kept, empty parts become `*`
/// - `user@host` becomes `*!user@host`
/// - `nick!user` becomes `nick!user@*`
/// - a bare fragment containing `.` or `:` is a host: `*!*@fragment`
/// - any other bare fragment is a nick: `fragment!*@*`
pub fn normalize_mask(mask: &str) -> String {
    let mask = collapse(mask.trim());

    let full = match (mask.find('!'), mask.find('@')) {
        (Some(bang), Some(at)) if bang < at => {
            let nick = &mask[..bang];
            let user = &mask[bang + 1..at];
            let host = &mask[at + 1..];
            format!("{}!{}@{}", or_star(nick), or_star(user), or_star(host))
        }
        (_, Some(at)) => {
            let user = &mask[..at];
            let host = &mask[at + 1..];
            format!("*!{}@{}", or_star(user), or_star(host))
        }
        (Some(bang), None) => {
            let nick = &mask[..bang];
            let user = &mask[bang + 1..];
            format!("{}!{}@*", or_star(nick), or_star(user))
        }
        (None, None) if mask.contains('.') || mask.contains(':') => format!("*!*@{}", mask),
        (None, None) => format!("{}!*@*", or_star(&mask)),
    };

    collapse(&full)
}
