//! Hashtag extraction.

use regex::Regex;

/// `#` at start of text or after ASCII whitespace, then one or more of `[A-Za-z0-9_.-]`.
/// Unicode separators such as no-break space are not boundaries.
const HASHTAG_PATTERN: &str = r"(?:^|[\t\n\f\r ])#([A-Za-z0-9_.\-]+)";

/// Precompiled hashtag matcher. Build once and share; matching is read-only.
#[derive(Clone, Debug)]
pub struct Tokenizer {
    re: Regex,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            re: Regex::new(HASHTAG_PATTERN).expect("valid regex"),
        }
    }

    /// Tag bodies (without `#`) in order of appearance, duplicates kept, case as written.
    pub fn extract<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.re
            .captures_iter(text)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
    }

    pub fn tags(&self, text: &str) -> Vec<String> {
        self.extract(text).map(str::to_string).collect()
    }

    /// Case-sensitive membership of an exact tag.
    pub fn contains(&self, text: &str, tag: &str) -> bool {
        self.extract(text).any(|t| t == tag)
    }
}
