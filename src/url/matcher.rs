use regex::Regex;

/// An ordered set of exclusion patterns
///
/// Each pattern is a regular expression that must match the whole candidate
/// string, not just a substring of it. `.*\.pdf` excludes
/// `https://example.com/report.pdf`, while `\.pdf` excludes nothing.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    /// Compiles the given patterns
    ///
    /// # Arguments
    ///
    /// * `patterns` - Regular expressions, each anchored at both ends
    ///
    /// # Returns
    ///
    /// * `Ok(PatternSet)` - All patterns compiled
    /// * `Err(regex::Error)` - The first pattern that failed to compile
    ///
    /// # Examples
    ///
    /// ```
    /// use web_fetcher::url::PatternSet;
    ///
    /// let set = PatternSet::new(&[r".*\.pdf".to_string()]).unwrap();
    /// assert!(set.matches_any("https://example.com/report.pdf"));
    /// assert!(!set.matches_any("https://example.com/report.html"));
    /// ```
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(&format!("^(?:{})$", p.as_ref())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Returns true if any pattern matches the whole candidate
    pub fn matches_any(&self, candidate: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(candidate))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}
