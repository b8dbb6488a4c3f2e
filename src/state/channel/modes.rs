//! Channel-wide mode state: boolean flags plus key and limit.

use bitflags::bitflags;

bitflags! {
    /// Boolean channel modes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModeFlags: u32 {
        const SECRET      = 1 << 0;
        const PRIVATE     = 1 << 1;
        const MODERATED   = 1 << 2;
        const TOPIC_LIMIT = 1 << 3;
        const INVITE_ONLY = 1 << 4;
        const NO_PRIVMSGS = 1 << 5;
        const KEYED       = 1 << 6;
        // Reserved slot, never set or rendered.
        const BANNED      = 1 << 7;
        const HIDE_OPS    = 1 << 8;
        const LIMITED     = 1 << 9;
    }
}

/// Letters of the parameterless flags, in render order.
const SIMPLE_LETTERS: [(ModeFlags, char); 7] = [
    (ModeFlags::SECRET, 's'),
    (ModeFlags::PRIVATE, 'p'),
    (ModeFlags::MODERATED, 'm'),
    (ModeFlags::TOPIC_LIMIT, 't'),
    (ModeFlags::INVITE_ONLY, 'i'),
    (ModeFlags::NO_PRIVMSGS, 'n'),
    (ModeFlags::HIDE_OPS, 'a'),
];

impl ModeFlags {
    /// The parameterless flag for a mode letter.
    pub fn from_simple_letter(c: char) -> Option<ModeFlags> {
        SIMPLE_LETTERS
            .iter()
            .find(|(_, l)| *l == c)
            .map(|(f, _)| *f)
    }

    /// Parse a run of parameterless letters such as `"nt"`, ignoring others.
    pub fn from_simple_letters(letters: &str) -> ModeFlags {
        letters
            .chars()
            .filter_map(ModeFlags::from_simple_letter)
            .fold(ModeFlags::empty(), |acc, f| acc | f)
    }
}

/// Rendered mode string and its parameters, e.g. `("+ntlk", ["10", "key"])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedModes {
    pub letters: String,
    pub params: Vec<String>,
}

impl RenderedModes {
    /// Join letters and parameters into one line.
    pub fn to_line(&self) -> String {
        if self.params.is_empty() {
            self.letters.clone()
        } else {
            format!("{} {}", self.letters, self.params.join(" "))
        }
    }
}

/// One `+x`/`-x` step of a mode diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeStep {
    pub adding: bool,
    pub letter: char,
    pub param: Option<String>,
}

/// Flags, key and limit of one channel.
///
/// `KEYED` is set exactly when `key` is non-empty, `LIMITED` exactly when
/// `limit` is non-zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeState {
    flags: ModeFlags,
    key: String,
    limit: u32,
}

impl ModeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flags(flags: ModeFlags) -> Self {
        let mut state = Self::new();
        state.set_flags(flags, true);
        state
    }

    pub fn flags(&self) -> ModeFlags {
        self.flags
    }

    pub fn has(&self, flag: ModeFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Set or clear parameterless flags. Returns true if anything changed.
    ///
    /// `KEYED`, `LIMITED` and `BANNED` are ignored here; they follow the
    /// key and limit setters.
    pub fn set_flags(&mut self, flags: ModeFlags, on: bool) -> bool {
        let flags = flags - (ModeFlags::KEYED | ModeFlags::LIMITED | ModeFlags::BANNED);
        let before = self.flags;
        self.flags.set(flags, on);
        before != self.flags
    }

    pub fn key(&self) -> Option<&str> {
        if self.key.is_empty() { None } else { Some(&self.key) }
    }

    /// Set the key; an empty key clears it.
    pub fn set_key(&mut self, key: &str) {
        self.key = key.to_string();
        self.flags.set(ModeFlags::KEYED, !self.key.is_empty());
    }

    pub fn clear_key(&mut self) {
        self.set_key("");
    }

    pub fn limit(&self) -> Option<u32> {
        if self.limit == 0 { None } else { Some(self.limit) }
    }

    /// Set the user limit; zero clears it.
    pub fn set_limit(&mut self, limit: u32) {
        self.limit = limit;
        self.flags.set(ModeFlags::LIMITED, limit != 0);
    }

    pub fn clear_limit(&mut self) {
        self.set_limit(0);
    }

    /// Render as `+letters` plus parameters.
    ///
    /// Key and limit values are only included when `show_params` is true;
    /// non-members see that `k`/`l` are set but not their values.
    pub fn render(&self, show_params: bool) -> RenderedModes {
        let mut letters = String::from("+");
        let mut params = Vec::with_capacity(2);

        for (flag, letter) in SIMPLE_LETTERS {
            if self.flags.contains(flag) {
                letters.push(letter);
            }
        }
        if let Some(limit) = self.limit() {
            letters.push('l');
            if show_params {
                params.push(limit.to_string());
            }
        }
        if let Some(key) = self.key() {
            letters.push('k');
            if show_params {
                params.push(key.to_string());
            }
        }

        RenderedModes { letters, params }
    }

    /// Union of two mode states: every flag of either side, the larger
    /// limit, and the lexically greater key.
    pub fn union(&self, other: &ModeState) -> ModeState {
        let mut merged = self.clone();
        merged.set_flags(other.flags, true);
        if other.limit > merged.limit {
            merged.set_limit(other.limit);
        }
        if other.key > merged.key {
            merged.set_key(&other.key);
        }
        merged
    }

    /// Steps that turn `self` into `new`: removals first, then additions.
    pub fn diff(&self, new: &ModeState) -> Vec<ModeStep> {
        let mut steps = Vec::new();

        for (flag, letter) in SIMPLE_LETTERS {
            if self.has(flag) && !new.has(flag) {
                steps.push(ModeStep { adding: false, letter, param: None });
            }
        }
        if self.limit != 0 && new.limit == 0 {
            steps.push(ModeStep { adding: false, letter: 'l', param: None });
        }
        if !self.key.is_empty() && self.key != new.key {
            steps.push(ModeStep {
                adding: false,
                letter: 'k',
                param: Some(self.key.clone()),
            });
        }

        for (flag, letter) in SIMPLE_LETTERS {
            if !self.has(flag) && new.has(flag) {
                steps.push(ModeStep { adding: true, letter, param: None });
            }
        }
        if new.limit != 0 && new.limit != self.limit {
            steps.push(ModeStep {
                adding: true,
                letter: 'l',
                param: Some(new.limit.to_string()),
            });
        }
        if !new.key.is_empty() && new.key != self.key {
            steps.push(ModeStep {
                adding: true,
                letter: 'k',
                param: Some(new.key.clone()),
            });
        }

        steps
    }

    /// Parse a burst mode string (`+ntkl key 10`).
    ///
    /// Only additions are meaningful in a burst. List letters return their
    /// masks alongside the state, as `(letter, mask)` in order.
    pub fn from_burst(tokens: &[String], params: &[String]) -> (ModeState, Vec<(char, String)>) {
        let mut state = ModeState::new();
        let mut masks = Vec::new();
        let mut params = params.iter();
        let mut adding = true;

        for c in tokens.iter().flat_map(|t| t.chars()) {
            match c {
                '+' => adding = true,
                '-' => adding = false,
                'k' => {
                    if let Some(key) = params.next() {
                        if adding {
                            state.set_key(key);
                        }
                    }
                }
                'l' => {
                    if adding {
                        if let Some(limit) = params.next().and_then(|p| p.parse::<u32>().ok()) {
                            state.set_limit(limit);
                        }
                    }
                }
                'b' | 'e' | 'I' => {
                    if let Some(mask) = params.next() {
                        if adding {
                            masks.push((c, mask.clone()));
                        }
                    }
                }
                'o' | 'h' | 'v' => {
                    params.next();
                }
                other => {
                    if let Some(flag) = ModeFlags::from_simple_letter(other) {
                        state.set_flags(flag, adding);
                    }
                }
            }
        }

        (state, masks)
    }
}
