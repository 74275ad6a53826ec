//! Single find/replace rewrite applied to request paths before forwarding.

use crate::ProxyError;

/// A `find:replace` rule. The empty rule leaves paths untouched.
#[derive(Debug, Clone, Default)]
pub struct Strip {
    find: String,
    replace: String,
}

impl Strip {
    /// Parse a `find:replace` pattern. `find:` removes the first occurrence
    /// of `find`; a non-empty pattern without a colon is rejected.
    pub fn parse(pattern: &str) -> Result<Strip, ProxyError> {
        if pattern.is_empty() {
            return Ok(Strip::default());
        }
        match pattern.split_once(':') {
            Some((find, replace)) => Ok(Strip {
                find: find.to_string(),
                replace: replace.to_string(),
            }),
            None => Err(ProxyError::Config(format!(
                "incorrect strip format: '{}' example 'foo:bar'",
                pattern
            ))),
        }
    }

    /// Replace the first occurrence of the configured pattern in `path`.
    pub fn apply(&self, path: &str) -> String {
        if self.find.is_empty() {
            return path.to_string();
        }
        path.replacen(&self.find, &self.replace, 1)
    }
}
