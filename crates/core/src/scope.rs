//! Data scopes: named categories of user data.
//!
//! A scope gates two things at once: whether its data is included in the
//! context snapshot, and whether the read tools over that data are offered
//! to the model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A named category of user data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scope {
    Sessions,
    Templates,
    ExerciseHistory,
    Notes,
    Settings,
    Spaces,
}

impl Scope {
    pub const ALL: [Scope; 6] = [
        Scope::Sessions,
        Scope::Templates,
        Scope::ExerciseHistory,
        Scope::Notes,
        Scope::Settings,
        Scope::Spaces,
    ];

    /// Wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Sessions => "sessions",
            Scope::Templates => "templates",
            Scope::ExerciseHistory => "exerciseHistory",
            Scope::Notes => "notes",
            Scope::Settings => "settings",
            Scope::Spaces => "spaces",
        }
    }

    /// Parse a scope name. Accepts the wire name and snake_case.
    pub fn parse(s: &str) -> Option<Scope> {
        match s.trim() {
            "sessions" => Some(Scope::Sessions),
            "templates" => Some(Scope::Templates),
            "exerciseHistory" | "exercise_history" => Some(Scope::ExerciseHistory),
            "notes" => Some(Scope::Notes),
            "settings" => Some(Scope::Settings),
            "spaces" => Some(Scope::Spaces),
            _ => None,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of scopes enabled for a turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeSet(BTreeSet<Scope>);

impl ScopeSet {
    /// No scopes enabled: context sharing is off.
    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    /// Every scope enabled.
    pub fn all() -> Self {
        Self(Scope::ALL.into_iter().collect())
    }

    pub fn with(mut self, scope: Scope) -> Self {
        self.0.insert(scope);
        self
    }

    pub fn insert(&mut self, scope: Scope) {
        self.0.insert(scope);
    }

    pub fn contains(&self, scope: Scope) -> bool {
        self.0.contains(&scope)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Scope> + '_ {
        self.0.iter().copied()
    }

    /// Build from scope names, ignoring unknown ones.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(names.into_iter().filter_map(|n| Scope::parse(n.as_ref())).collect())
    }
}

impl FromIterator<Scope> for ScopeSet {
    fn from_iter<T: IntoIterator<Item = Scope>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_both_spellings() {
        assert_eq!(Scope::parse("exerciseHistory"), Some(Scope::ExerciseHistory));
        assert_eq!(Scope::parse("exercise_history"), Some(Scope::ExerciseHistory));
        assert_eq!(Scope::parse("weather"), None);
    }

    #[test]
    fn from_names_skips_unknown() {
        let set = ScopeSet::from_names(["sessions", "bogus", "spaces"]);
        assert!(set.contains(Scope::Sessions));
        assert!(set.contains(Scope::Spaces));
        assert!(!set.contains(Scope::Notes));
    }

    #[test]
    fn serializes_as_sorted_array() {
        let set = ScopeSet::none().with(Scope::Spaces).with(Scope::Sessions);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["sessions","spaces"]"#);
    }
}
