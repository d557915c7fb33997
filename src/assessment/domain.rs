use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a configured care category (e.g. `assisted_living`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub String);

impl CategoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CategoryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Raw answer for one questionnaire field: a single option value or several for multi-select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Single(String),
    Multiple(Vec<String>),
}

impl AnswerValue {
    pub fn values(&self) -> Vec<&str> {
        match self {
            AnswerValue::Single(value) => vec![value.as_str()],
            AnswerValue::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Single(value.to_string())
    }
}

impl From<Vec<&str>> for AnswerValue {
    fn from(values: Vec<&str>) -> Self {
        AnswerValue::Multiple(values.into_iter().map(str::to_string).collect())
    }
}

/// Finished questionnaire supplied by the collection flow. Never mutated by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<String, AnswerValue>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert used by callers assembling answers in code.
    pub fn with(mut self, field_id: impl Into<String>, value: impl Into<AnswerValue>) -> Self {
        self.0.insert(field_id.into(), value.into());
        self
    }

    pub fn get(&self, field_id: &str) -> Option<&AnswerValue> {
        self.0.get(field_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnswerValue)> {
        self.0.iter().map(|(field, value)| (field.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

impl FromIterator<(String, AnswerValue)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (String, AnswerValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Provenance tag recording which path produced the final recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Deterministic,
    Llm,
    FallbackTimeout,
    FallbackInvalid,
    FallbackGate,
}

impl DecisionSource {
    pub const fn label(self) -> &'static str {
        match self {
            DecisionSource::Deterministic => "deterministic",
            DecisionSource::Llm => "llm",
            DecisionSource::FallbackTimeout => "fallback_timeout",
            DecisionSource::FallbackInvalid => "fallback_invalid",
            DecisionSource::FallbackGate => "fallback_gate",
        }
    }

    pub const fn is_fallback(self) -> bool {
        matches!(
            self,
            DecisionSource::FallbackTimeout
                | DecisionSource::FallbackInvalid
                | DecisionSource::FallbackGate
        )
    }
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Categories still eligible after gating, kept in configured severity order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowedCategories(Vec<CategoryId>);

impl AllowedCategories {
    pub(crate) fn from_ordered(categories: Vec<CategoryId>) -> Self {
        Self(categories)
    }

    pub fn contains(&self, category: &CategoryId) -> bool {
        self.0.contains(category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryId> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[CategoryId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Affinity of one candidate to the assessed score, used for audit ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRanking {
    pub category: CategoryId,
    pub score: f64,
}

/// Terminal artifact of a care-tier assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub category: CategoryId,
    /// Raw threshold match before gates or LLM refinement.
    pub baseline_category: CategoryId,
    pub score: i32,
    pub allowed_categories: AllowedCategories,
    pub source: DecisionSource,
    pub confidence: f64,
    pub rationale: Vec<String>,
    pub category_rankings: Vec<CategoryRanking>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gates_applied: Vec<String>,
}

impl Decision {
    pub fn summary(&self) -> String {
        format!(
            "{} (score {}, source {}, confidence {:.2})",
            self.category, self.score, self.source, self.confidence
        )
    }
}
