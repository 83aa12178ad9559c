//! Allow-list of languages the execution worker accepts.

use std::collections::BTreeSet;
use std::fmt;

/// Languages accepted when no list is configured.
pub const DEFAULT_LANGUAGES: &[&str] = &["go", "python"];

/// Fixed set of language tokens a command may name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageAllowList {
    languages: BTreeSet<String>,
}

impl LanguageAllowList {
    pub fn new<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            languages: languages.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma-separated list such as `"go, python"`.
    ///
    /// Entries are trimmed and lowercased; empty entries are skipped.
    pub fn from_csv(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty()),
        )
    }

    pub fn contains(&self, language: &str) -> bool {
        self.languages.contains(language)
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }
}

impl Default for LanguageAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGES.iter().copied())
    }
}

impl fmt::Display for LanguageAllowList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.languages.iter().map(String::as_str).collect();
        f.write_str(&joined.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_go_and_python() {
        let list = LanguageAllowList::default();
        assert!(list.contains("go"));
        assert!(list.contains("python"));
        assert!(!list.contains("ruby"));
        assert_eq!(list.to_string(), "go,python");
    }

    #[test]
    fn csv_is_trimmed_and_lowercased() {
        let list = LanguageAllowList::from_csv(" Go, rust ,,python");
        assert_eq!(list.len(), 3);
        assert!(list.contains("go"));
        assert!(list.contains("rust"));
        assert!(!list.contains("Go"));
    }

    #[test]
    fn empty_csv_gives_empty_list() {
        assert!(LanguageAllowList::from_csv(" , ").is_empty());
    }
}
