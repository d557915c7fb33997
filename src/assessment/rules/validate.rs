use std::collections::BTreeSet;
use std::path::PathBuf;

use super::super::domain::CategoryId;
use super::super::hours::HoursBand;
use super::document::{
    CategoryDefinition, CategoryThreshold, FieldDefinition, GateRule, HoursThreshold,
};
use super::ScoreRange;

/// Load-time rejection of a rule document. Never raised while assessing.
#[derive(Debug, thiserror::Error)]
pub enum RuleConfigError {
    #[error("rule document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unable to read rule document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("rule document defines no categories")]
    NoCategories,
    #[error("category {0} is defined more than once")]
    DuplicateCategory(CategoryId),
    #[error("field {0} is defined more than once")]
    DuplicateField(String),
    #[error("field {0} has no options")]
    EmptyField(String),
    #[error("field {field} repeats option {value}")]
    DuplicateOption { field: String, value: String },
    #[error("{context} references unknown category {category}")]
    UnknownCategory {
        context: String,
        category: CategoryId,
    },
    #[error("category {0} has more than one threshold")]
    DuplicateThreshold(CategoryId),
    #[error("category {0} has no threshold")]
    MissingThreshold(CategoryId),
    #[error("thresholds must follow category order: expected {expected}, found {found}")]
    ThresholdOrder {
        expected: CategoryId,
        found: CategoryId,
    },
    #[error("{scale} range for {label} is inverted ({min} > {max})")]
    InvertedRange {
        scale: &'static str,
        label: String,
        min: i32,
        max: i32,
    },
    #[error("{scale} ranges for {first} and {second} overlap")]
    Overlap {
        scale: &'static str,
        first: String,
        second: String,
    },
    #[error("{scale} scores {from}..={to} between {after} and {before} map to nothing")]
    Gap {
        scale: &'static str,
        after: String,
        before: String,
        from: i32,
        to: i32,
    },
    #[error("{scale} weights sum past the supported score range")]
    ScoreOverflow { scale: &'static str },
    #[error("{scale} score {score} is reachable but not covered by any threshold")]
    Uncovered { scale: &'static str, score: i32 },
    #[error("gate {0} is defined more than once")]
    DuplicateGate(String),
    #[error("gate {0} has no conditions and would always fire")]
    UnconditionalGate(String),
    #[error("gate {0} removes no categories")]
    EmptyGateRemoval(String),
    #[error("gate {0} removes every category and could never apply")]
    GateRemovesEverything(String),
    #[error("expected {expected} hours thresholds (one per band), found {found}")]
    HoursBandCount { expected: usize, found: usize },
    #[error("hours thresholds must follow band order: expected {expected}, found {found}")]
    HoursBandOrder { expected: HoursBand, found: HoursBand },
}

pub(super) fn check_categories(categories: &[CategoryDefinition]) -> Result<(), RuleConfigError> {
    if categories.is_empty() {
        return Err(RuleConfigError::NoCategories);
    }

    let mut seen = BTreeSet::new();
    for category in categories {
        if !seen.insert(&category.id) {
            return Err(RuleConfigError::DuplicateCategory(category.id.clone()));
        }
    }
    Ok(())
}

pub(super) fn check_fields(fields: &[FieldDefinition]) -> Result<(), RuleConfigError> {
    let mut seen = BTreeSet::new();
    for field in fields {
        if !seen.insert(field.id.as_str()) {
            return Err(RuleConfigError::DuplicateField(field.id.clone()));
        }
        if field.options.is_empty() {
            return Err(RuleConfigError::EmptyField(field.id.clone()));
        }

        let mut values = BTreeSet::new();
        for option in &field.options {
            if !values.insert(option.value.as_str()) {
                return Err(RuleConfigError::DuplicateOption {
                    field: field.id.clone(),
                    value: option.value.clone(),
                });
            }
        }
    }
    Ok(())
}

pub(super) fn check_thresholds(
    categories: &[CategoryDefinition],
    thresholds: &[CategoryThreshold],
    required: ScoreRange,
) -> Result<(), RuleConfigError> {
    let known: BTreeSet<&CategoryId> = categories.iter().map(|category| &category.id).collect();

    let mut seen = BTreeSet::new();
    for threshold in thresholds {
        if !known.contains(&threshold.category) {
            return Err(RuleConfigError::UnknownCategory {
                context: "threshold".to_string(),
                category: threshold.category.clone(),
            });
        }
        if !seen.insert(&threshold.category) {
            return Err(RuleConfigError::DuplicateThreshold(
                threshold.category.clone(),
            ));
        }
    }

    for category in categories {
        if !seen.contains(&category.id) {
            return Err(RuleConfigError::MissingThreshold(category.id.clone()));
        }
    }

    for (category, threshold) in categories.iter().zip(thresholds) {
        if category.id != threshold.category {
            return Err(RuleConfigError::ThresholdOrder {
                expected: category.id.clone(),
                found: threshold.category.clone(),
            });
        }
    }

    let ranges: Vec<(String, i32, i32)> = thresholds
        .iter()
        .map(|t| (t.category.to_string(), t.min_score, t.max_score))
        .collect();
    check_ranges("category", &ranges, required)
}

pub(super) fn check_hours_thresholds(
    thresholds: &[HoursThreshold],
    required: ScoreRange,
) -> Result<(), RuleConfigError> {
    let bands = HoursBand::ordered();
    if thresholds.len() != bands.len() {
        return Err(RuleConfigError::HoursBandCount {
            expected: bands.len(),
            found: thresholds.len(),
        });
    }

    for (expected, threshold) in bands.iter().zip(thresholds) {
        if *expected != threshold.band {
            return Err(RuleConfigError::HoursBandOrder {
                expected: *expected,
                found: threshold.band,
            });
        }
    }

    let ranges: Vec<(String, i32, i32)> = thresholds
        .iter()
        .map(|t| (t.band.to_string(), t.min_score, t.max_score))
        .collect();
    check_ranges("hours", &ranges, required)
}

pub(super) fn check_gates(
    categories: &[CategoryDefinition],
    gates: &[GateRule],
) -> Result<(), RuleConfigError> {
    let known: BTreeSet<&CategoryId> = categories.iter().map(|category| &category.id).collect();

    let mut seen = BTreeSet::new();
    for gate in gates {
        if !seen.insert(gate.id.as_str()) {
            return Err(RuleConfigError::DuplicateGate(gate.id.clone()));
        }
        if gate.when.is_empty() {
            return Err(RuleConfigError::UnconditionalGate(gate.id.clone()));
        }
        if gate.remove.is_empty() {
            return Err(RuleConfigError::EmptyGateRemoval(gate.id.clone()));
        }
        for category in &gate.remove {
            if !known.contains(category) {
                return Err(RuleConfigError::UnknownCategory {
                    context: format!("gate {}", gate.id),
                    category: category.clone(),
                });
            }
        }

        let removed: BTreeSet<&CategoryId> = gate.remove.iter().collect();
        if known.iter().all(|category| removed.contains(category)) {
            return Err(RuleConfigError::GateRemovesEverything(gate.id.clone()));
        }
    }
    Ok(())
}

/// Ranges are inclusive and listed in ascending order; together they must tile `required`.
fn check_ranges(
    scale: &'static str,
    ranges: &[(String, i32, i32)],
    required: ScoreRange,
) -> Result<(), RuleConfigError> {
    for (label, min, max) in ranges {
        if min > max {
            return Err(RuleConfigError::InvertedRange {
                scale,
                label: label.clone(),
                min: *min,
                max: *max,
            });
        }
    }

    for pair in ranges.windows(2) {
        let (first, _, first_max) = &pair[0];
        let (second, second_min, _) = &pair[1];
        if second_min <= first_max {
            return Err(RuleConfigError::Overlap {
                scale,
                first: first.clone(),
                second: second.clone(),
            });
        }
        if *second_min > first_max.saturating_add(1) {
            return Err(RuleConfigError::Gap {
                scale,
                after: first.clone(),
                before: second.clone(),
                from: first_max + 1,
                to: second_min - 1,
            });
        }
    }

    let (Some(first), Some(last)) = (ranges.first(), ranges.last()) else {
        return Err(RuleConfigError::Uncovered {
            scale,
            score: required.min,
        });
    };
    if first.1 > required.min {
        return Err(RuleConfigError::Uncovered {
            scale,
            score: required.min,
        });
    }
    if last.2 < required.max {
        return Err(RuleConfigError::Uncovered {
            scale,
            score: required.max,
        });
    }
    Ok(())
}
