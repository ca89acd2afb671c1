//! Code list membership for identifier elements
//!
//! An `Id` element definition may carry a code list; parsing then accepts
//! only enumerated codes. Lists are built once at catalog load and only
//! ever queried, so the membership set is frozen at construction:
//! case-insensitive lists fold their codes to uppercase up front and every
//! lookup is a single hash probe.

use std::collections::HashSet;

/// An enumerated set of codes an identifier element may carry
#[derive(Debug, Clone)]
pub struct CodeList {
    /// Name/identifier of the code list
    pub name: String,
    case_sensitive: bool,
    codes: HashSet<String>,
}

impl CodeList {
    /// Create a code list from its allowed codes.
    pub fn with_codes(name: impl Into<String>, codes: Vec<impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            case_sensitive: true,
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    /// Set case sensitivity.
    ///
    /// An insensitive list folds its codes to uppercase once, here.
    #[must_use]
    pub fn case_sensitive(mut self, sensitive: bool) -> Self {
        self.case_sensitive = sensitive;
        if !sensitive {
            self.codes = self.codes.drain().map(|code| code.to_uppercase()).collect();
        }
        self
    }

    /// Whether a raw value is a member.
    pub fn contains(&self, code: &str) -> bool {
        if self.case_sensitive {
            self.codes.contains(code)
        } else {
            self.codes.contains(&code.to_uppercase())
        }
    }
}
