use std::collections::HashSet;
use std::fmt::Display;
use std::sync::LazyLock;

use regex::Regex;

pub const MAX_SLUG_CHARS: usize = 60;

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9а-я\s-]").expect("slug charset regex"));
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s-]+").expect("slug separator regex"));

/// Turns heading text into an anchor fragment.
///
/// Latin and Cyrillic letters, digits and hyphens survive; `ё` folds into
/// `е`; whitespace runs become one hyphen. The result never starts or ends
/// with a hyphen and is at most [`MAX_SLUG_CHARS`] characters long.
pub fn slugify(text: impl Display) -> String {
    let lowered = text.to_string().to_lowercase().replace('ё', "е");
    let stripped = DISALLOWED.replace_all(&lowered, "");
    let joined = SEPARATORS.replace_all(stripped.trim(), "-");
    let cut: String = joined
        .trim_matches('-')
        .chars()
        .take(MAX_SLUG_CHARS)
        .collect();
    cut.trim_end_matches('-').to_string()
}

/// Anchors handed out during a single page render.
#[derive(Debug, Default)]
pub struct AnchorRegistry {
    used: HashSet<String>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `base` if it is still free, otherwise the first free
    /// `base-2`, `base-3`, ... The returned anchor is registered.
    pub fn assign(&mut self, base: &str) -> String {
        let mut anchor = base.to_string();
        let mut k = 2u64;
        while self.used.contains(&anchor) {
            anchor = format!("{base}-{k}");
            k += 1;
        }
        self.used.insert(anchor.clone());
        anchor
    }
}
