//! Rule configuration: the authored JSON document and the validated, immutable rule set
//! every assessment reads from.

mod document;
mod validate;

pub use document::{
    CategoryDefinition, CategoryThreshold, FieldDefinition, FieldOption, GateRule,
    HoursThreshold, Marker, RuleDocument,
};
pub use validate::RuleConfigError;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use super::domain::CategoryId;
use super::hours::HoursBand;

const STANDARD_RULES: &str = include_str!("../../../config/standard_rules.json");

/// Inclusive score interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreRange {
    pub min: i32,
    pub max: i32,
}

impl ScoreRange {
    /// Lowest and highest totals reachable with the given weight selector. An unanswered field
    /// contributes zero; multi-select fields can accumulate every option.
    ///
    /// Totals, and the distance between them, must fit in `i32`.
    fn reachable(
        scale: &'static str,
        fields: &[FieldDefinition],
        weight: impl Fn(&FieldOption) -> i32,
    ) -> Result<Self, RuleConfigError> {
        let overflow = || RuleConfigError::ScoreOverflow { scale };
        let mut min = 0i32;
        let mut max = 0i32;

        for field in fields {
            let weights = field.options.iter().map(&weight);
            let (low, high) = if field.multiple {
                (
                    checked_sum(weights.clone().filter(|w| *w < 0)).ok_or_else(overflow)?,
                    checked_sum(weights.filter(|w| *w > 0)).ok_or_else(overflow)?,
                )
            } else {
                (
                    weights.clone().min().unwrap_or(0).min(0),
                    weights.max().unwrap_or(0).max(0),
                )
            };
            min = min.checked_add(low).ok_or_else(overflow)?;
            max = max.checked_add(high).ok_or_else(overflow)?;
        }

        max.checked_sub(min).ok_or_else(overflow)?;
        Ok(Self { min, max })
    }

    pub fn contains(&self, score: i32) -> bool {
        score >= self.min && score <= self.max
    }

    pub fn width(&self) -> i32 {
        self.max - self.min
    }
}

fn checked_sum(mut weights: impl Iterator<Item = i32>) -> Option<i32> {
    weights.try_fold(0i32, |acc, weight| acc.checked_add(weight))
}

/// Validated rule configuration shared read-only across assessments.
#[derive(Debug, Clone)]
pub struct RuleSet {
    categories: Vec<CategoryDefinition>,
    fields: Vec<FieldDefinition>,
    field_index: BTreeMap<String, usize>,
    thresholds: Vec<CategoryThreshold>,
    gates: Vec<GateRule>,
    hours_thresholds: Vec<HoursThreshold>,
    score_range: ScoreRange,
    hours_range: ScoreRange,
}

impl RuleSet {
    pub fn from_document(document: RuleDocument) -> Result<Self, RuleConfigError> {
        let RuleDocument {
            categories,
            fields,
            thresholds,
            gates,
            hours_thresholds,
        } = document;

        validate::check_categories(&categories)?;
        validate::check_fields(&fields)?;

        let score_range = ScoreRange::reachable("category", &fields, |option| option.weight)?;
        let hours_range = ScoreRange::reachable("hours", &fields, |option| option.hours_weight)?;

        validate::check_thresholds(&categories, &thresholds, score_range)?;
        validate::check_gates(&categories, &gates)?;
        validate::check_hours_thresholds(&hours_thresholds, hours_range)?;

        let field_index = fields
            .iter()
            .enumerate()
            .map(|(index, field)| (field.id.clone(), index))
            .collect();

        debug!(
            categories = categories.len(),
            fields = fields.len(),
            gates = gates.len(),
            min_score = score_range.min,
            max_score = score_range.max,
            "rule set validated"
        );

        Ok(Self {
            categories,
            fields,
            field_index,
            thresholds,
            gates,
            hours_thresholds,
            score_range,
            hours_range,
        })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, RuleConfigError> {
        let document: RuleDocument = serde_json::from_str(raw)?;
        Self::from_document(document)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RuleConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| RuleConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Rule set bundled with the crate.
    pub fn standard() -> Result<Self, RuleConfigError> {
        Self::from_json_str(STANDARD_RULES)
    }

    pub fn categories(&self) -> &[CategoryDefinition] {
        &self.categories
    }

    pub fn category(&self, id: &CategoryId) -> Option<&CategoryDefinition> {
        self.categories.iter().find(|category| &category.id == id)
    }

    /// Human label for a category, falling back to the raw id.
    pub fn category_label<'a>(&'a self, id: &'a CategoryId) -> &'a str {
        self.category(id)
            .map(|category| category.label.as_str())
            .unwrap_or(id.as_str())
    }

    /// Position in ascending severity order.
    pub fn severity_index(&self, id: &CategoryId) -> Option<usize> {
        self.categories.iter().position(|category| &category.id == id)
    }

    pub fn highest_severity(&self) -> &CategoryId {
        // Validation guarantees at least one category.
        &self.categories[self.categories.len() - 1].id
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn field(&self, id: &str) -> Option<&FieldDefinition> {
        self.field_index.get(id).map(|index| &self.fields[*index])
    }

    pub fn thresholds(&self) -> &[CategoryThreshold] {
        &self.thresholds
    }

    pub fn threshold_for(&self, id: &CategoryId) -> Option<&CategoryThreshold> {
        self.thresholds
            .iter()
            .find(|threshold| &threshold.category == id)
    }

    pub fn gates(&self) -> &[GateRule] {
        &self.gates
    }

    pub fn hours_thresholds(&self) -> &[HoursThreshold] {
        &self.hours_thresholds
    }

    pub fn hours_threshold_for(&self, band: HoursBand) -> Option<&HoursThreshold> {
        self.hours_thresholds
            .iter()
            .find(|threshold| threshold.band == band)
    }

    /// Full range of category scores reachable from the configured fields.
    pub fn score_range(&self) -> ScoreRange {
        self.score_range
    }

    pub fn hours_range(&self) -> ScoreRange {
        self.hours_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> RuleDocument {
        serde_json::from_str(STANDARD_RULES).expect("standard rules parse")
    }

    #[test]
    fn standard_rules_validate() {
        let rules = RuleSet::standard().expect("standard rules are valid");
        assert_eq!(rules.categories().len(), 4);
        assert_eq!(rules.highest_severity().as_str(), "memory_care");
        assert_eq!(rules.score_range(), ScoreRange { min: 0, max: 100 });
        assert!(rules.field("memory").is_some());
    }

    #[test]
    fn rejects_threshold_gap() {
        let mut document = document();
        document.thresholds[1].max_score = 38;

        match RuleSet::from_document(document) {
            Err(RuleConfigError::Gap { from, to, .. }) => {
                assert_eq!((from, to), (39, 40));
            }
            other => panic!("expected gap error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_threshold_overlap() {
        let mut document = document();
        document.thresholds[2].min_score = 40;

        assert!(matches!(
            RuleSet::from_document(document),
            Err(RuleConfigError::Overlap { .. })
        ));
    }

    #[test]
    fn rejects_uncovered_maximum() {
        let mut document = document();
        let last = document.thresholds.len() - 1;
        document.thresholds[last].max_score = 90;

        match RuleSet::from_document(document) {
            Err(RuleConfigError::Uncovered { scale, score }) => {
                assert_eq!(scale, "category");
                assert_eq!(score, 100);
            }
            other => panic!("expected coverage error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_dangling_gate_category() {
        let mut document = document();
        document.gates[0].remove = vec![CategoryId::from("hospice")];

        match RuleSet::from_document(document) {
            Err(RuleConfigError::UnknownCategory { category, .. }) => {
                assert_eq!(category.as_str(), "hospice");
            }
            other => panic!("expected unknown category, got {other:?}"),
        }
    }

    #[test]
    fn rejects_gate_that_removes_everything() {
        let mut document = document();
        document.gates[0].remove = document
            .categories
            .iter()
            .map(|category| category.id.clone())
            .collect();

        assert!(matches!(
            RuleSet::from_document(document),
            Err(RuleConfigError::GateRemovesEverything(_))
        ));
    }

    #[test]
    fn rejects_thresholds_out_of_category_order() {
        let mut document = document();
        document.thresholds.swap(0, 1);

        assert!(matches!(
            RuleSet::from_document(document),
            Err(RuleConfigError::ThresholdOrder { .. })
        ));
    }

    #[test]
    fn rejects_unknown_marker_names() {
        let raw = STANDARD_RULES.replacen("\"adl_dependency\"", "\"adl_dependancy\"", 1);

        assert!(matches!(
            RuleSet::from_json_str(&raw),
            Err(RuleConfigError::Parse(_))
        ));
    }

    #[test]
    fn rejects_missing_hours_band() {
        let mut document = document();
        document.hours_thresholds.pop();

        assert!(matches!(
            RuleSet::from_document(document),
            Err(RuleConfigError::HoursBandCount {
                expected: 4,
                found: 3
            })
        ));
    }

    #[test]
    fn multi_select_fields_widen_reachable_range() {
        let mut document = document();
        for field in &mut document.fields {
            field.multiple = false;
        }
        let single = ScoreRange::reachable("category", &document.fields, |option| option.weight)
            .expect("range fits");

        assert!(single.max < 100);
    }

    #[test]
    fn rejects_weights_that_overflow_the_score_range() {
        let mut document = document();
        for field in document.fields.iter_mut().take(2) {
            field.options[1].weight = i32::MAX;
        }

        assert!(matches!(
            RuleSet::from_document(document),
            Err(RuleConfigError::ScoreOverflow { scale: "category" })
        ));
    }
}
