//! Keyword scan for destructive shell commands in generated answers.
//!
//! This is a heuristic: plain substring matching over the lower-cased answer.
//! It flags obvious cases for the reader and is not a sandbox or a parser.

#[cfg(test)]
mod tests;

use tracing::warn;

/// Substrings that mark an answer as potentially dangerous.
pub const DEFAULT_DENYLIST: &[&str] = &[
    "rm -rf",
    "mkfs",
    "dd ",
    "shutdown",
    "reboot",
    "kill -9",
    ">: ",
    ":(){:",
    "truncate",
    "chmod 000",
    "chown -R",
];

pub const WARNING_BANNER: &str =
    "⚠️ Warning: this answer contains a potentially dangerous command. Review it carefully before running it.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyScanner {
    keywords: Vec<String>,
}

impl Default for SafetyScanner {
    fn default() -> Self {
        Self::new(DEFAULT_DENYLIST.iter().copied())
    }
}

impl SafetyScanner {
    /// Build a scanner from a denylist; entries are lower-cased and blank ones dropped.
    #[inline]
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.trim().is_empty())
                .collect(),
        }
    }

    #[inline]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// The first denylisted substring found in `text`, ignoring case.
    #[inline]
    pub fn first_match(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.keywords
            .iter()
            .find(|keyword| lowered.contains(keyword.as_str()))
            .map(String::as_str)
    }

    #[inline]
    pub fn scan(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }

    /// Append [`WARNING_BANNER`] when the text is flagged.
    ///
    /// Returns the possibly annotated text and whether it was flagged.
    pub fn annotate(&self, text: &str) -> (String, bool) {
        match self.first_match(text) {
            Some(keyword) => {
                warn!("Answer flagged as dangerous (matched {:?})", keyword);
                (format!("{text}\n\n{WARNING_BANNER}"), true)
            }
            None => (text.to_string(), false),
        }
    }
}
