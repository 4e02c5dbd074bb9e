use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

/// The calculus the engine searches in. `Classical` runs the connection
/// calculus unmodified; the rest layer prefix unification on top, each
/// varying only `_pre_eq`, the enabled `pre_unify` rewriting cases, and the
/// admissible-pair rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Logic {
    Classical,
    Intuitionistic,
    D,
    T,
    S4,
    S5,
}

impl Logic {
    /// Case-insensitive parse from a CLI string, rejecting anything else as
    /// a `ConfigError` rather than panicking deep inside search setup.
    pub fn parse(s: &str) -> ConfigResult<Logic> {
        match s.to_ascii_lowercase().as_str() {
            "classical" => Ok(Logic::Classical),
            "intuitionistic" => Ok(Logic::Intuitionistic),
            "d" => Ok(Logic::D),
            "t" => Ok(Logic::T),
            "s4" => Ok(Logic::S4),
            "s5" => Ok(Logic::S5),
            other => Err(ConfigError::new(format!("unknown logic '{other}'"))),
        }
    }

    pub fn is_classical(&self) -> bool {
        matches!(self, Logic::Classical)
    }
}

/// Governs how eigenvariables constrain prefix admissibility. Unused under
/// `Logic::Classical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Constant,
    Cumulative,
    Varying,
}

impl Domain {
    pub fn parse(s: &str) -> ConfigResult<Domain> {
        match s.to_ascii_lowercase().as_str() {
            "constant" => Ok(Domain::Constant),
            "cumulative" => Ok(Domain::Cumulative),
            "varying" => Ok(Domain::Varying),
            other => Err(ConfigError::new(format!("unknown domain '{other}'"))),
        }
    }
}

/// Search configuration. Deserializable from an optional YAML settings
/// file; CLI flags (`bin/prove.rs`) override whatever the file set.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub positive_start_clauses: bool,
    pub iterative_deepening: bool,
    pub iterative_deepening_initial_depth: i32,
    pub restricted_backtracking: bool,
    pub backtrack_after: u32,
    pub logic: Logic,
    pub domain: Domain,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            positive_start_clauses: true,
            iterative_deepening: false,
            iterative_deepening_initial_depth: 1,
            restricted_backtracking: false,
            backtrack_after: 2,
            logic: Logic::Classical,
            domain: Domain::Constant,
        }
    }
}

impl Settings {
    /// Parses a settings YAML document, then validates it. Unknown keys are
    /// ignored by `serde_yaml`; unknown `logic`/`domain` strings surface as
    /// `ConfigError` through `Logic`/`Domain`'s own `Deserialize` (they only
    /// accept their fixed lowercase spellings).
    pub fn from_yaml(text: &str) -> ConfigResult<Settings> {
        let settings: Settings =
            serde_yaml::from_str(text).map_err(|e| ConfigError::new(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects combinations the engine cannot honor: a `backtrack_after`
    /// threshold only makes sense when `restricted_backtracking` is
    /// actually on.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.restricted_backtracking && self.backtrack_after == 0 {
            // backtrack_after is only consulted when restricted_backtracking
            // is set, but a threshold of 0 would silently reject every retry
            // the moment it's turned on, which is never what's intended.
            return Err(ConfigError::new(
                "backtrack_after must be at least 1 when restricted_backtracking is enabled",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let s = Settings::default();
        assert!(s.positive_start_clauses);
        assert!(!s.iterative_deepening);
        assert_eq!(s.iterative_deepening_initial_depth, 1);
        assert!(!s.restricted_backtracking);
        assert_eq!(s.backtrack_after, 2);
        assert_eq!(s.logic, Logic::Classical);
        assert_eq!(s.domain, Domain::Constant);
    }

    #[test]
    fn logic_parses_case_insensitively() {
        assert_eq!(Logic::parse("S4").unwrap(), Logic::S4);
        assert_eq!(Logic::parse("intuitionistic").unwrap(), Logic::Intuitionistic);
        assert!(Logic::parse("bogus").is_err());
    }

    #[test]
    fn settings_from_yaml_overrides_defaults() {
        let s = Settings::from_yaml("logic: s5\ndomain: varying\n").unwrap();
        assert_eq!(s.logic, Logic::S5);
        assert_eq!(s.domain, Domain::Varying);
        assert!(s.positive_start_clauses);
    }
}
