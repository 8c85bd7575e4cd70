//! Simulation configuration.
//!
//! `SimConfig` is the whole tunable surface. Hosts either load it from TOML
//! or edit it through `ConfigChange` values, which the simulation applies in
//! one transaction at restart.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::automaton::grid::{Dims, SeedPolicy};
use crate::automaton::stepping::RuleSet;
use crate::error::{AutomatonError, Result};
use crate::neighborhood::NeighborhoodKind;
use crate::rules::{InvertedRange, RuleTable};

/// Which rule pair a rule string belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Main,
    Edges,
    Corners,
}

/// Born and survive rule strings for one category. Missing fields default
/// to the permissive `"0-26"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleStrings {
    pub born: String,
    pub survive: String,
}

impl RuleStrings {
    pub fn new(born: &str, survive: &str) -> Self {
        RuleStrings {
            born: born.to_string(),
            survive: survive.to_string(),
        }
    }

    pub fn compile(&self, inverted: InvertedRange) -> Result<RuleTable> {
        RuleTable::parse(&self.born, &self.survive, inverted)
    }
}

impl Default for RuleStrings {
    fn default() -> Self {
        RuleStrings::new("0-26", "0-26")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryRules {
    pub main: RuleStrings,
    pub edges: RuleStrings,
    pub corners: RuleStrings,
}

impl Default for CategoryRules {
    fn default() -> Self {
        CategoryRules {
            main: RuleStrings::new("1,3", "0-6"),
            edges: RuleStrings::default(),
            corners: RuleStrings::default(),
        }
    }
}

impl CategoryRules {
    pub fn get(&self, category: RuleCategory) -> &RuleStrings {
        match category {
            RuleCategory::Main => &self.main,
            RuleCategory::Edges => &self.edges,
            RuleCategory::Corners => &self.corners,
        }
    }

    pub fn get_mut(&mut self, category: RuleCategory) -> &mut RuleStrings {
        match category {
            RuleCategory::Main => &mut self.main,
            RuleCategory::Edges => &mut self.edges,
            RuleCategory::Corners => &mut self.corners,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Side length of the cubic lattice.
    pub grid_size: u32,
    /// Main neighborhood.
    pub neighborhood: NeighborhoodKind,
    /// Also count edges and corners against their own rule tables.
    pub mixed: bool,
    pub step_duration_ms: u32,
    pub inverted_range: InvertedRange,
    /// Worker threads for the step kernel.
    pub threads: u8,
    // TOML tables must follow plain keys.
    pub rules: CategoryRules,
    pub seed: SeedPolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            grid_size: 64,
            neighborhood: NeighborhoodKind::VonNeumann,
            mixed: false,
            step_duration_ms: 48,
            inverted_range: InvertedRange::Empty,
            threads: 1,
            rules: CategoryRules::default(),
            seed: SeedPolicy::SingleCell,
        }
    }
}

impl SimConfig {
    pub const MIN_GRID_SIZE: u32 = 3;

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SimConfig =
            toml::from_str(text).map_err(|err| AutomatonError::ConfigFormat(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|err| AutomatonError::ConfigFormat(err.to_string()))
    }

    pub fn dims(&self) -> Dims {
        Dims::cube(self.grid_size)
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid_size < Self::MIN_GRID_SIZE {
            return Err(AutomatonError::InvalidConfig(format!(
                "grid size must be at least {}, got {}",
                Self::MIN_GRID_SIZE,
                self.grid_size
            )));
        }
        if self.step_duration_ms == 0 {
            return Err(AutomatonError::InvalidConfig(
                "step duration must be at least 1 ms".to_string(),
            ));
        }
        if self.threads == 0 {
            return Err(AutomatonError::InvalidConfig(
                "at least one worker thread is required".to_string(),
            ));
        }
        self.compile_rules()?;
        Ok(())
    }

    /// Compile every rule string the configuration uses.
    ///
    /// Edge and corner strings are compiled even outside mixed mode so a bad
    /// string is reported as soon as it is configured.
    pub fn compile_rules(&self) -> Result<RuleSet> {
        let inverted = self.inverted_range;
        let main = self.rules.main.compile(inverted)?;
        let edges = self.rules.edges.compile(inverted)?;
        let corners = self.rules.corners.compile(inverted)?;

        Ok(if self.mixed {
            RuleSet::mixed(self.neighborhood, main, edges, corners)
        } else {
            RuleSet::single(self.neighborhood, main)
        })
    }

    /// Apply one change without validating.
    pub fn apply(&mut self, change: ConfigChange) {
        match change {
            ConfigChange::GridSize(size) => self.grid_size = size,
            ConfigChange::Neighborhood(kind) => self.neighborhood = kind,
            ConfigChange::Mixed(mixed) => self.mixed = mixed,
            ConfigChange::BornRule(category, rule) => self.rules.get_mut(category).born = rule,
            ConfigChange::SurviveRule(category, rule) => self.rules.get_mut(category).survive = rule,
            ConfigChange::StepDuration(ms) => self.step_duration_ms = ms,
            ConfigChange::Seed(seed) => self.seed = seed,
            ConfigChange::InvertedRange(policy) => self.inverted_range = policy,
            ConfigChange::Threads(threads) => self.threads = threads,
        }
    }

    /// Apply all changes to a copy and validate it. `self` is untouched on error.
    pub fn with_changes(&self, changes: impl IntoIterator<Item = ConfigChange>) -> Result<SimConfig> {
        let mut next = self.clone();
        for change in changes {
            next.apply(change);
        }
        next.validate().inspect_err(|err| {
            warn!(%err, "rejected configuration change");
        })?;
        Ok(next)
    }

    /// Whether switching to `other` needs a freshly allocated grid.
    pub fn needs_new_grid(&self, other: &SimConfig) -> bool {
        self.grid_size != other.grid_size
    }
}

/// One edit to a single tunable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigChange {
    GridSize(u32),
    Neighborhood(NeighborhoodKind),
    Mixed(bool),
    BornRule(RuleCategory, String),
    SurviveRule(RuleCategory, String),
    StepDuration(u32),
    Seed(SeedPolicy),
    InvertedRange(InvertedRange),
    Threads(u8),
}

impl ConfigChange {
    /// Whether both changes edit the same setting. Rule strings count as one
    /// setting per category and side.
    pub fn same_setting(&self, other: &ConfigChange) -> bool {
        match (self, other) {
            (ConfigChange::BornRule(a, _), ConfigChange::BornRule(b, _))
            | (ConfigChange::SurviveRule(a, _), ConfigChange::SurviveRule(b, _)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::CountSet;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimConfig::default();
        config.validate().unwrap();

        let rules = config.compile_rules().unwrap();
        assert!(!rules.is_mixed());
        assert_eq!(rules.categories()[0].kind, NeighborhoodKind::VonNeumann);
        assert_eq!(rules.categories()[0].table.born.to_string(), "1,3");
        assert_eq!(rules.categories()[0].table.survive.to_string(), "0-6");
    }

    #[test]
    fn test_from_toml() {
        let config = SimConfig::from_toml_str(
            r#"
            grid_size = 32
            neighborhood = "moore_2d"
            mixed = true
            step_duration_ms = 500
            threads = 2

            [rules.main]
            born = "3"
            survive = "2,3"

            [rules.corners]
            survive = ""

            [seed]
            kind = "random_cluster"
            seed = 42
            "#,
        )
        .unwrap();

        assert_eq!(config.grid_size, 32);
        assert_eq!(config.neighborhood, NeighborhoodKind::Moore2d);
        assert_eq!(config.seed, SeedPolicy::RandomCluster { seed: Some(42) });
        assert_eq!(config.rules.corners.born, "0-26");

        let rules = config.compile_rules().unwrap();
        assert!(rules.is_mixed());
        assert_eq!(rules.categories()[2].kind, NeighborhoodKind::Corners);
        assert_eq!(rules.categories()[2].table.survive, CountSet::EMPTY);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = SimConfig::default();
        config.neighborhood = NeighborhoodKind::VonNeumann2d;
        config.seed = SeedPolicy::RandomCluster { seed: None };
        let text = config.to_toml_string().unwrap();
        assert_eq!(SimConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        assert_eq!(SimConfig::from_toml_str("").unwrap(), SimConfig::default());
    }

    #[test]
    fn test_toml_errors() {
        assert!(matches!(
            SimConfig::from_toml_str("grid_size = \"big\""),
            Err(AutomatonError::ConfigFormat(_))
        ));
        assert!(matches!(
            SimConfig::from_toml_str("neighborhood = \"hex\""),
            Err(AutomatonError::ConfigFormat(_))
        ));
        assert!(matches!(
            SimConfig::from_toml_str("grid_size = 0"),
            Err(AutomatonError::InvalidConfig(_))
        ));
        assert!(matches!(
            SimConfig::from_toml_str("[rules.edges]\nborn = \"x\""),
            Err(AutomatonError::RuleParse { .. })
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = SimConfig::default();
        for change in [
            ConfigChange::GridSize(0),
            ConfigChange::GridSize(2),
            ConfigChange::StepDuration(0),
            ConfigChange::Threads(0),
            ConfigChange::SurviveRule(RuleCategory::Corners, "1-".to_string()),
        ] {
            assert!(base.with_changes([change.clone()]).is_err(), "{:?} accepted", change);
        }
    }

    #[test]
    fn test_with_changes_is_transactional() {
        let base = SimConfig::default();
        let result = base.with_changes([
            ConfigChange::GridSize(16),
            ConfigChange::BornRule(RuleCategory::Main, "nope".to_string()),
        ]);
        assert!(result.is_err());
        assert_eq!(base, SimConfig::default());

        let next = base
            .with_changes([
                ConfigChange::GridSize(16),
                ConfigChange::Mixed(true),
                ConfigChange::BornRule(RuleCategory::Edges, "2".to_string()),
            ])
            .unwrap();
        assert_eq!(next.grid_size, 16);
        assert!(next.mixed);
        assert_eq!(next.rules.get(RuleCategory::Edges).born, "2");
        assert!(base.needs_new_grid(&next));
    }

    #[test]
    fn test_same_setting() {
        let born = |category| ConfigChange::BornRule(category, "1".to_string());
        assert!(ConfigChange::GridSize(8).same_setting(&ConfigChange::GridSize(16)));
        assert!(!ConfigChange::GridSize(8).same_setting(&ConfigChange::StepDuration(8)));
        assert!(born(RuleCategory::Main).same_setting(&born(RuleCategory::Main)));
        assert!(!born(RuleCategory::Main).same_setting(&born(RuleCategory::Edges)));
        assert!(!born(RuleCategory::Main)
            .same_setting(&ConfigChange::SurviveRule(RuleCategory::Main, "1".to_string())));
    }

    #[test]
    fn test_inverted_range_policy_applies() {
        let base = SimConfig::default();
        let changes = || {
            vec![
                ConfigChange::BornRule(RuleCategory::Main, "6-2".to_string()),
                ConfigChange::InvertedRange(InvertedRange::Reject),
            ]
        };
        assert!(base.with_changes(changes()).is_err());
        assert!(base.with_changes(changes().into_iter().take(1)).is_ok());
    }
}
