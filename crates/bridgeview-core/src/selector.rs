//! Device id matching.
//!
//! A selector string picks one device among several attached. It is treated
//! as a regular expression first, with a literal string-equality fallback so
//! that serials containing regex metacharacters (or selectors that fail to
//! compile at all) still match themselves exactly.

use regex::Regex;

/// A compiled device-id matching rule.
///
/// A candidate serial matches when the selector, compiled as an anchored
/// regular expression, fully matches it — or when the serial is exactly
/// string-equal to the raw selector. A selector never matches anything
/// beyond a device's own declared serial.
#[derive(Debug, Clone)]
pub struct DeviceSelector {
    raw: String,
    pattern: Option<Regex>,
}

impl DeviceSelector {
    /// Compiles a selector.
    ///
    /// A malformed pattern is not an error: the selector degrades to
    /// literal-only matching.
    pub fn new(selector: &str) -> Self {
        // Anchor so the pattern must cover the whole serial, not a substring.
        let pattern = Regex::new(&format!("^(?:{selector})$")).ok();
        Self {
            raw: selector.to_string(),
            pattern,
        }
    }

    /// The raw selector string this was compiled from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Tests a device serial against this selector.
    pub fn matches(&self, serial: &str) -> bool {
        if serial == self.raw {
            return true;
        }
        self.pattern
            .as_ref()
            .is_some_and(|p| p.is_match(serial))
    }
}

impl std::fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
