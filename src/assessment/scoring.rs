use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{AnswerSet, CategoryId};
use super::hours::HoursBand;
use super::rules::{Marker, RuleSet};

/// Discrete contribution of one answered field, allowing transparent audits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldScore {
    pub field_id: String,
    pub points: i32,
    pub hours_points: i32,
    pub selections: Vec<SelectedOption>,
    /// One entry per marker per selected option, so repeated markers count repeatedly.
    pub markers: Vec<Marker>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub value: String,
    pub label: String,
}

/// Answer the scorer could not use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedAnswer {
    pub field_id: String,
    pub value: Option<String>,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnknownField,
    UnknownOption,
    ExtraSelection,
    DuplicateSelection,
}

/// Weighted sum of an answer set plus its per-field breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub total: i32,
    pub hours_total: i32,
    pub fields: Vec<FieldScore>,
    pub skipped: Vec<SkippedAnswer>,
    pub missing_required: Vec<String>,
}

impl ScoreCard {
    pub fn markers(&self) -> impl Iterator<Item = Marker> + '_ {
        self.fields
            .iter()
            .flat_map(|field| field.markers.iter().copied())
    }
}

/// Sum option weights for every answered field known to the rules.
///
/// Unknown fields, unknown options, surplus values on single-select fields and repeated
/// values on multi-select fields are skipped with a warning; they never fail the assessment.
pub fn score(answers: &AnswerSet, rules: &RuleSet) -> ScoreCard {
    let mut card = ScoreCard {
        total: 0,
        hours_total: 0,
        fields: Vec::new(),
        skipped: Vec::new(),
        missing_required: Vec::new(),
    };

    for (field_id, answer) in answers.iter() {
        let Some(field) = rules.field(field_id) else {
            warn!(field = field_id, "answer references unknown field; skipping");
            card.skipped.push(SkippedAnswer {
                field_id: field_id.to_string(),
                value: None,
                reason: SkipReason::UnknownField,
            });
            continue;
        };

        let mut field_score = FieldScore {
            field_id: field_id.to_string(),
            points: 0,
            hours_points: 0,
            selections: Vec::new(),
            markers: Vec::new(),
        };
        let mut seen = BTreeSet::new();

        for (position, value) in answer.values().into_iter().enumerate() {
            if position > 0 && !field.multiple {
                warn!(
                    field = field_id,
                    value, "single-select field answered more than once; extra value ignored"
                );
                card.skipped.push(SkippedAnswer {
                    field_id: field_id.to_string(),
                    value: Some(value.to_string()),
                    reason: SkipReason::ExtraSelection,
                });
                continue;
            }

            let Some(option) = field.option(value) else {
                warn!(field = field_id, value, "answer references unknown option; skipping");
                card.skipped.push(SkippedAnswer {
                    field_id: field_id.to_string(),
                    value: Some(value.to_string()),
                    reason: SkipReason::UnknownOption,
                });
                continue;
            };

            if !seen.insert(option.value.as_str()) {
                warn!(field = field_id, value, "option selected more than once; repeat ignored");
                card.skipped.push(SkippedAnswer {
                    field_id: field_id.to_string(),
                    value: Some(value.to_string()),
                    reason: SkipReason::DuplicateSelection,
                });
                continue;
            }

            field_score.points += option.weight;
            field_score.hours_points += option.hours_weight;
            field_score.markers.extend(option.markers.iter().copied());
            field_score.selections.push(SelectedOption {
                value: option.value.clone(),
                label: option.label.clone(),
            });
        }

        if field_score.selections.is_empty() {
            continue;
        }

        card.total += field_score.points;
        card.hours_total += field_score.hours_points;
        card.fields.push(field_score);
    }

    for field in rules.fields() {
        if field.required && answers.get(&field.id).is_none() {
            warn!(field = %field.id, "required field unanswered; scoring as zero");
            card.missing_required.push(field.id.clone());
        }
    }

    card
}

/// Inclusive range lookup over the configured thresholds, first match wins.
///
/// Falls back to the highest-severity category when nothing matches so that a coverage hole
/// never under-recommends care.
pub fn determine_category(total_score: i32, rules: &RuleSet) -> CategoryId {
    for threshold in rules.thresholds() {
        if total_score >= threshold.min_score && total_score <= threshold.max_score {
            return threshold.category.clone();
        }
    }

    let fallback = rules.highest_severity().clone();
    warn!(
        score = total_score,
        category = %fallback,
        "no category threshold covers score; failing closed to highest severity"
    );
    fallback
}

/// Band lookup mirroring [`determine_category`], failing closed to the ceiling band.
pub fn determine_band(hours_score: i32, rules: &RuleSet) -> HoursBand {
    for threshold in rules.hours_thresholds() {
        if hours_score >= threshold.min_score && hours_score <= threshold.max_score {
            return threshold.band;
        }
    }

    warn!(
        score = hours_score,
        "no hours threshold covers score; failing closed to ceiling band"
    );
    HoursBand::ceiling()
}
