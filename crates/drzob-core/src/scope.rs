//! OAuth scope sets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An ordered, duplicate-free collection of OAuth scope strings.
///
/// Order is the order in which scopes were first added; it is preserved when
/// building the space-delimited `scope` parameter sent to the authorization
/// server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeSet(Vec<String>);

impl ScopeSet {
    /// Creates a scope set, dropping blank entries and duplicates.
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        for scope in scopes {
            set.insert(scope);
        }
        set
    }

    /// Parses a space-delimited OAuth `scope` value.
    pub fn from_space_delimited(value: &str) -> Self {
        Self::new(value.split_whitespace())
    }

    /// Adds a scope if it is not already present.
    ///
    /// Returns true if the scope was added.
    pub fn insert(&mut self, scope: impl Into<String>) -> bool {
        let scope = scope.into();
        let scope = scope.trim();
        if scope.is_empty() || self.contains(scope) {
            return false;
        }
        self.0.push(scope.to_string());
        true
    }

    /// Returns true if the scope is present.
    pub fn contains(&self, scope: &str) -> bool {
        self.0.iter().any(|s| s == scope)
    }

    /// Returns true if every scope in `other` is present in `self`.
    pub fn covers(&self, other: &ScopeSet) -> bool {
        other.iter().all(|scope| self.contains(scope))
    }

    /// Returns the scopes of `self` followed by the new scopes of `other`.
    pub fn union(&self, other: &ScopeSet) -> ScopeSet {
        let mut merged = self.clone();
        for scope in other.iter() {
            merged.insert(scope);
        }
        merged
    }

    /// Returns the scopes joined with single spaces.
    pub fn to_space_delimited(&self) -> String {
        self.0.join(" ")
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_space_delimited())
    }
}

impl<S: Into<String>> FromIterator<S> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALENDAR: &str = "https://www.googleapis.com/auth/calendar";
    const CONTACTS: &str = "https://www.googleapis.com/auth/contacts.readonly";

    #[test]
    fn new_drops_duplicates_and_blanks() {
        let scopes = ScopeSet::new([CALENDAR, "", "  ", CALENDAR, CONTACTS]);
        assert_eq!(scopes.len(), 2);
        assert_eq!(scopes.iter().collect::<Vec<_>>(), vec![CALENDAR, CONTACTS]);
    }

    #[test]
    fn space_delimited_roundtrip_keeps_order() {
        let scopes = ScopeSet::from_space_delimited(&format!("{CONTACTS}  {CALENDAR}"));
        assert_eq!(scopes.to_space_delimited(), format!("{CONTACTS} {CALENDAR}"));
    }

    #[test]
    fn covers_checks_every_scope() {
        let granted = ScopeSet::new([CALENDAR, CONTACTS]);
        assert!(granted.covers(&ScopeSet::new([CALENDAR])));
        assert!(granted.covers(&ScopeSet::default()));
        assert!(!ScopeSet::new([CALENDAR]).covers(&granted));
    }

    #[test]
    fn union_appends_missing_scopes() {
        let merged = ScopeSet::new([CALENDAR]).union(&ScopeSet::new([CONTACTS, CALENDAR]));
        assert_eq!(merged.iter().collect::<Vec<_>>(), vec![CALENDAR, CONTACTS]);
    }

    #[test]
    fn serializes_as_plain_list() {
        let json = serde_json::to_string(&ScopeSet::new([CALENDAR])).unwrap();
        assert_eq!(json, format!("[\"{CALENDAR}\"]"));
    }
}
