//! Builder for LIKE match patterns
//!
//! Produces the `%`-wildcard pattern string consumed by `where_like`. The
//! MongoDB translator converts the same pattern into a regular expression.

/// Composable match pattern for LIKE conditions
///
/// ```
/// use reginald_core::Pattern;
///
/// let pattern = Pattern::new().starts_with("a").contains("b");
/// assert_eq!(pattern.build(), "a%b%");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pattern {
    literal: Option<String>,
    starts_with: Option<String>,
    ends_with: Option<String>,
    contains: Option<String>,
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `pattern` verbatim, overriding any component calls
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.literal = Some(pattern.into());
        self
    }

    pub fn starts_with(mut self, prefix: impl Into<String>) -> Self {
        self.starts_with = Some(prefix.into());
        self
    }

    pub fn ends_with(mut self, suffix: impl Into<String>) -> Self {
        self.ends_with = Some(suffix.into());
        self
    }

    pub fn contains(mut self, inner: impl Into<String>) -> Self {
        self.contains = Some(inner.into());
        self
    }

    /// Assemble the wildcard pattern; a literal pattern wins over components
    pub fn build(&self) -> String {
        if let Some(literal) = &self.literal {
            return literal.clone();
        }
        let mut result = String::new();
        if let Some(prefix) = &self.starts_with {
            result.push_str(prefix);
        }
        result.push('%');
        if let Some(suffix) = &self.ends_with {
            result.push_str(suffix);
        }
        if let Some(inner) = &self.contains {
            result.push_str(inner);
            result.push('%');
        }
        result
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_and_contains() {
        let pattern = Pattern::new().starts_with("a").contains("b");
        assert_eq!(pattern.build(), "a%b%");
    }

    #[test]
    fn test_ends_with() {
        assert_eq!(Pattern::new().ends_with("son").build(), "%son");
    }

    #[test]
    fn test_contains_only() {
        assert_eq!(Pattern::new().contains("mid").build(), "%mid%");
    }

    #[test]
    fn test_literal_pattern_wins() {
        let pattern = Pattern::new().starts_with("a").with_pattern("x%");
        assert_eq!(pattern.build(), "x%");
    }

    #[test]
    fn test_empty_pattern_is_wildcard() {
        assert_eq!(Pattern::new().build(), "%");
    }
}
