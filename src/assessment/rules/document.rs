use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::super::domain::CategoryId;
use super::super::gates::GateCondition;
use super::super::hours::HoursBand;

/// Serialized rule configuration as authored by clinical staff.
///
/// The document is only an input format: it is validated once into a
/// [`RuleSet`](super::RuleSet) and never consulted directly during an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDocument {
    /// Care categories in ascending severity.
    pub categories: Vec<CategoryDefinition>,
    pub fields: Vec<FieldDefinition>,
    pub thresholds: Vec<CategoryThreshold>,
    #[serde(default)]
    pub gates: Vec<GateRule>,
    pub hours_thresholds: Vec<HoursThreshold>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryDefinition {
    pub id: CategoryId,
    pub label: String,
}

/// One questionnaire field with its selectable options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDefinition {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub multiple: bool,
    pub options: Vec<FieldOption>,
}

impl FieldDefinition {
    pub fn option(&self, value: &str) -> Option<&FieldOption> {
        self.options.iter().find(|option| option.value == value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub weight: i32,
    /// Contribution to the daily care-hours score.
    #[serde(default)]
    pub hours_weight: i32,
    #[serde(default)]
    pub markers: BTreeSet<Marker>,
}

/// Inclusive score range mapped to a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryThreshold {
    pub category: CategoryId,
    pub min_score: i32,
    pub max_score: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HoursThreshold {
    pub band: HoursBand,
    pub min_score: i32,
    pub max_score: i32,
}

/// Ordered override rule that narrows the eligible categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateRule {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub when: GateCondition,
    pub remove: Vec<CategoryId>,
}

/// Closed set of categorical markers an option can carry.
///
/// Unknown marker names fail deserialization, so a typo in the rule document is caught at
/// load time instead of silently disabling a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    AdlDependency,
    IadlDependency,
    CognitionMild,
    CognitionModerate,
    CognitionSevere,
    RiskyBehavior,
    FallRisk,
    MedicationSupport,
    LivesAlone,
}

impl Marker {
    pub const fn is_dependency(self) -> bool {
        matches!(self, Marker::AdlDependency | Marker::IadlDependency)
    }
}
