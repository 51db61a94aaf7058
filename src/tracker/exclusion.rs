use std::collections::HashSet;

use super::listing::normalize_title;

/// Normalized titles that could not be opened. Only ever grows.
#[derive(Debug, Default, Clone)]
pub struct ExclusionSet {
    titles: HashSet<String>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed title. Returns false when it was already excluded.
    pub fn insert(&mut self, title: &str) -> bool {
        self.titles.insert(normalize_title(title))
    }

    pub fn contains(&self, title: &str) -> bool {
        self.contains_key(&normalize_title(title))
    }

    /// Membership test for an already-normalized key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.titles.contains(key)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.titles.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_dedups_case_and_whitespace() {
        let mut set = ExclusionSet::new();
        assert!(set.insert("Boat Airdopes 141"));
        assert!(!set.insert("  boat airdopes 141 "));
        assert!(!set.insert("BOAT AIRDOPES 141"));
        assert_eq!(set.len(), 1);
        assert!(set.contains("boat AIRDOPES 141"));
    }

    #[test]
    fn test_escaped_and_raw_titles_share_a_key() {
        let mut set = ExclusionSet::new();
        set.insert("Salt & Pepper <Set>");
        assert!(set.contains("salt &amp; pepper &lt;set&gt;"));
        assert_eq!(set.len(), 1);
    }
}
