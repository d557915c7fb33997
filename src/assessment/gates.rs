use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::domain::{AllowedCategories, CategoryId};
use super::rules::RuleSet;
use super::signals::{CognitionSeverity, Signals};

/// Conjunction of typed predicates over [`Signals`]. Unset predicates match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cognition_severity: Option<CognitionSeverity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_dependency_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_dependency_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risky_behavior: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fall_risk: Option<bool>,
}

impl GateCondition {
    pub fn is_empty(&self) -> bool {
        self.cognition_severity.is_none()
            && self.min_dependency_count.is_none()
            && self.max_dependency_count.is_none()
            && self.risky_behavior.is_none()
            && self.fall_risk.is_none()
    }

    pub fn matches(&self, signals: &Signals) -> bool {
        self.cognition_severity
            .map_or(true, |severity| signals.cognition_severity == severity)
            && self
                .min_dependency_count
                .map_or(true, |min| signals.dependency_count >= min)
            && self
                .max_dependency_count
                .map_or(true, |max| signals.dependency_count <= max)
            && self
                .risky_behavior
                .map_or(true, |risky| signals.risky_behavior == risky)
            && self
                .fall_risk
                .map_or(true, |fall| signals.fall_risk == fall)
    }
}

/// Result of running every configured gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateOutcome {
    pub allowed: AllowedCategories,
    /// Gates that fired and narrowed the set.
    pub applied: Vec<String>,
    /// Gates that fired but were skipped because they would have emptied the set.
    pub suppressed: Vec<String>,
}

/// Evaluate gates in configured order against the derived signals.
///
/// Each firing gate removes its categories from the running allowed set unless the removal
/// would leave nothing, in which case the gate is a no-op.
pub fn apply_gates(signals: &Signals, baseline: &CategoryId, rules: &RuleSet) -> GateOutcome {
    let mut allowed: Vec<CategoryId> = rules
        .categories()
        .iter()
        .map(|category| category.id.clone())
        .collect();
    let mut applied = Vec::new();
    let mut suppressed = Vec::new();

    for gate in rules.gates() {
        if !gate.when.matches(signals) {
            continue;
        }

        let narrowed: Vec<CategoryId> = allowed
            .iter()
            .filter(|category| !gate.remove.contains(category))
            .cloned()
            .collect();

        if narrowed.is_empty() {
            warn!(
                gate = %gate.id,
                "gate would empty the allowed categories; leaving set unchanged"
            );
            suppressed.push(gate.id.clone());
            continue;
        }

        if narrowed.len() < allowed.len() {
            debug!(
                gate = %gate.id,
                removed = allowed.len() - narrowed.len(),
                baseline_removed = !narrowed.contains(baseline),
                "gate narrowed allowed categories"
            );
            applied.push(gate.id.clone());
        }
        allowed = narrowed;
    }

    GateOutcome {
        allowed: AllowedCategories::from_ordered(allowed),
        applied,
        suppressed,
    }
}

/// Deterministic recommendation once gates have run: the raw baseline if still allowed,
/// otherwise the allowed category nearest in severity (ties resolve toward lower severity).
pub fn effective_baseline(
    baseline: &CategoryId,
    allowed: &AllowedCategories,
    rules: &RuleSet,
) -> CategoryId {
    if allowed.contains(baseline) {
        return baseline.clone();
    }

    let origin = rules.severity_index(baseline).unwrap_or(0);
    allowed
        .iter()
        .filter_map(|category| {
            rules
                .severity_index(category)
                .map(|index| (index.abs_diff(origin), index, category))
        })
        .min_by_key(|(distance, index, _)| (*distance, *index))
        .map(|(_, _, category)| category.clone())
        .unwrap_or_else(|| {
            // Allowed sets are never empty; keep the baseline if that ever breaks.
            warn!(category = %baseline, "allowed categories empty; keeping baseline");
            baseline.clone()
        })
}
