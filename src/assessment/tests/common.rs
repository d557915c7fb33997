use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use crate::assessment::domain::{AnswerSet, CategoryId};
use crate::assessment::gates::{apply_gates, GateOutcome};
use crate::assessment::mediator::{LlmProvider, LlmRequest, Mediator, ProviderError};
use crate::assessment::rules::{RuleDocument, RuleSet};
use crate::assessment::scoring::{determine_category, score, ScoreCard};
use crate::assessment::signals::{CognitionSeverity, Signals};

pub(super) const TEST_TIMEOUT: Duration = Duration::from_millis(500);

pub(super) fn rule_document() -> RuleDocument {
    serde_json::from_str(include_str!("../../../config/standard_rules.json"))
        .expect("standard rules parse")
}

pub(super) fn rules() -> RuleSet {
    RuleSet::standard().expect("standard rules are valid")
}

pub(super) fn shared_rules() -> Arc<RuleSet> {
    Arc::new(rules())
}

pub(super) fn category(id: &str) -> CategoryId {
    CategoryId::from(id)
}

pub(super) fn signals(
    cognition_severity: CognitionSeverity,
    dependency_count: u32,
    risky_behavior: bool,
) -> Signals {
    Signals {
        dependency_count,
        cognition_severity,
        risky_behavior,
        ..Signals::default()
    }
}

/// Every field answered at its lowest-need option.
pub(super) fn independent_answers() -> AnswerSet {
    AnswerSet::new()
        .with("bathing", "independent")
        .with("dressing", "independent")
        .with("toileting", "independent")
        .with("transferring", "independent")
        .with("eating", "independent")
        .with("medications", "independent")
        .with("memory", "no_concerns")
        .with("behaviors", vec!["none"])
        .with("falls", "none")
        .with("living_situation", "with_spouse")
        .with("mobility", "independent")
}

/// Frequent confusion with heavy physical dependency and no risky behavior.
/// Scores 74 on the care scale and 35 on the hours scale.
pub(super) fn moderate_cognition_answers() -> AnswerSet {
    AnswerSet::new()
        .with("bathing", "full_help")
        .with("dressing", "some_help")
        .with("toileting", "full_help")
        .with("transferring", "full_help")
        .with("eating", "full_help")
        .with("medications", "administered")
        .with("meals", "needs_help")
        .with("housekeeping", "needs_help")
        .with("memory", "frequent_confusion")
        .with("behaviors", vec!["sundowning"])
        .with("falls", "multiple")
        .with("living_situation", "alone")
        .with("mobility", "bedbound")
}

/// Score card, baseline, and gate outcome for an answer set, as the engine computes them.
pub(super) fn deterministic_facts(
    answers: &AnswerSet,
    rules: &RuleSet,
) -> (ScoreCard, Signals, CategoryId, GateOutcome) {
    let card = score(answers, rules);
    let signals = Signals::from_score_card(&card);
    let baseline = determine_category(card.total, rules);
    let gates = apply_gates(&signals, &baseline, rules);
    (card, signals, baseline, gates)
}

pub(super) fn category_reply(category: &str, confidence: f64) -> String {
    json!({
        "category": category,
        "confidence": confidence,
        "reasoning": "Daily help is needed but wandering has not been reported.",
    })
    .to_string()
}

pub(super) fn band_reply(band: &str, confidence: f64) -> String {
    json!({
        "band": band,
        "confidence": confidence,
        "reasoning": "Evening support covers most of the reported needs.",
    })
    .to_string()
}

pub(super) fn mediator<P: LlmProvider>(provider: Arc<P>) -> Mediator<P> {
    Mediator::new(provider).with_timeout(TEST_TIMEOUT)
}

/// Replies with canned text per schema; an unset reply behaves like an upstream outage.
#[derive(Default)]
pub(super) struct ScriptedProvider {
    category: Option<String>,
    hours: Option<String>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedProvider {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn with_category(mut self, raw: impl Into<String>) -> Self {
        self.category = Some(raw.into());
        self
    }

    pub(super) fn with_hours(mut self, raw: impl Into<String>) -> Self {
        self.hours = Some(raw.into());
        self
    }

    pub(super) fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().expect("lock requests").clone()
    }
}

impl LlmProvider for ScriptedProvider {
    async fn complete(&self, request: &LlmRequest) -> Result<String, ProviderError> {
        self.requests
            .lock()
            .expect("lock requests")
            .push(request.clone());

        let reply = if request.prompt.contains("\"band\":") {
            &self.hours
        } else {
            &self.category
        };
        reply.clone().ok_or(ProviderError::Status(503))
    }
}

/// Answers correctly, but only after `delay`.
pub(super) struct SlowProvider {
    pub(super) delay: Duration,
}

impl LlmProvider for SlowProvider {
    async fn complete(&self, request: &LlmRequest) -> Result<String, ProviderError> {
        tokio::time::sleep(self.delay).await;
        if request.prompt.contains("\"band\":") {
            Ok(band_reply("substantial", 0.9))
        } else {
            Ok(category_reply("in_home", 0.9))
        }
    }
}
