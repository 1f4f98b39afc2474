//! Subject search filter.

/// Case-insensitive substring match on the decoded subject, the way an IMAP
/// `SEARCH SUBJECT` behaves. An empty filter matches every message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectFilter {
    needle: String,
}

impl SubjectFilter {
    pub fn new(pattern: &str) -> Self {
        Self {
            needle: pattern.trim().to_lowercase(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    pub fn matches(&self, subject: &str) -> bool {
        self.needle.is_empty() || subject.to_lowercase().contains(&self.needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_case_insensitive() {
        let f = SubjectFilter::new("project update");
        assert!(f.matches("Re: Project Update"));
        assert!(f.matches("PROJECT UPDATE for Q3"));
        assert!(!f.matches("Budget"));
    }

    #[test]
    fn test_empty_matches_all() {
        let f = SubjectFilter::new("   ");
        assert!(f.is_empty());
        assert!(f.matches(""));
        assert!(f.matches("anything"));
    }

    #[test]
    fn test_unicode() {
        let f = SubjectFilter::new("CAFÉ");
        assert!(f.matches("Re: café con leña"));
    }
}
