use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::adjudication::decide;
use super::domain::{AnswerSet, CategoryId, Decision};
use super::gates::{apply_gates, GateOutcome};
use super::hours::{allowed_refinements, decide_hours, HoursBand, HoursDecision};
use super::mediator::{
    CategoryContext, HoursContext, LlmProvider, Mediator, MediatorOutcome, NoLlm,
};
use super::rules::RuleSet;
use super::scoring::{determine_band, determine_category, score, ScoreCard};
use super::signals::Signals;

/// Both recommendations for one assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentReport {
    pub assessed_at: DateTime<Utc>,
    pub care: Decision,
    pub hours: HoursDecision,
}

/// Deterministic facts computed once and shared by both decisions.
struct Prepared {
    card: ScoreCard,
    signals: Signals,
    baseline: CategoryId,
    gates: GateOutcome,
    baseline_band: HoursBand,
}

/// Stateless evaluator that applies the rule set, optionally consulting an LLM.
pub struct AssessmentEngine<P = NoLlm> {
    rules: Arc<RuleSet>,
    mediator: Option<Mediator<P>>,
}

impl AssessmentEngine<NoLlm> {
    /// Engine that never consults an LLM; every decision is tagged `deterministic`.
    pub fn deterministic(rules: Arc<RuleSet>) -> Self {
        Self {
            rules,
            mediator: None,
        }
    }
}

impl<P: LlmProvider> AssessmentEngine<P> {
    pub fn with_mediator(rules: Arc<RuleSet>, mediator: Mediator<P>) -> Self {
        Self {
            rules,
            mediator: Some(mediator),
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    fn prepare(&self, answers: &AnswerSet) -> Prepared {
        let rules = self.rules.as_ref();
        let card = score(answers, rules);
        let signals = Signals::from_score_card(&card);
        let baseline = determine_category(card.total, rules);
        let gates = apply_gates(&signals, &baseline, rules);
        let baseline_band = determine_band(card.hours_total, rules);

        Prepared {
            card,
            signals,
            baseline,
            gates,
            baseline_band,
        }
    }

    async fn category_decision(&self, prepared: &Prepared) -> Decision {
        let outcome = match &self.mediator {
            Some(mediator) => {
                let context = CategoryContext {
                    rules: &self.rules,
                    card: &prepared.card,
                    signals: &prepared.signals,
                    baseline: &prepared.baseline,
                    allowed: &prepared.gates.allowed,
                };
                mediator.suggest_category(&context).await
            }
            None => MediatorOutcome::Disabled,
        };

        self.finish_category(prepared, &outcome)
    }

    async fn hours_decision(&self, prepared: &Prepared) -> HoursDecision {
        let outcome = match &self.mediator {
            Some(mediator) => {
                let allowed = allowed_refinements(prepared.baseline_band);
                let context = HoursContext {
                    rules: &self.rules,
                    card: &prepared.card,
                    signals: &prepared.signals,
                    baseline: prepared.baseline_band,
                    allowed: &allowed,
                };
                mediator.suggest_hours(&context).await
            }
            None => MediatorOutcome::Disabled,
        };

        self.finish_hours(prepared, &outcome)
    }

    fn finish_category(
        &self,
        prepared: &Prepared,
        outcome: &MediatorOutcome<CategoryId>,
    ) -> Decision {
        let decision = decide(
            &prepared.baseline,
            &prepared.gates,
            outcome,
            prepared.card.total,
            &self.rules,
        );
        info!(
            category = %decision.category,
            baseline = %decision.baseline_category,
            score = decision.score,
            source = %decision.source,
            confidence = decision.confidence,
            "care category decided"
        );
        decision
    }

    fn finish_hours(
        &self,
        prepared: &Prepared,
        outcome: &MediatorOutcome<HoursBand>,
    ) -> HoursDecision {
        let decision = decide_hours(
            prepared.baseline_band,
            outcome,
            prepared.card.hours_total,
            &self.rules,
        );
        info!(
            band = %decision.band,
            baseline = %decision.baseline_band,
            score = decision.score,
            source = %decision.source,
            "care hours decided"
        );
        decision
    }

    /// Care-tier decision only.
    pub async fn evaluate_category(&self, answers: &AnswerSet) -> Decision {
        let prepared = self.prepare(answers);
        self.category_decision(&prepared).await
    }

    /// Daily care-hours decision only.
    pub async fn evaluate_hours(&self, answers: &AnswerSet) -> HoursDecision {
        let prepared = self.prepare(answers);
        self.hours_decision(&prepared).await
    }

    /// Run both decisions; the two LLM calls are issued concurrently and neither waits on the
    /// other's result.
    pub async fn assess(&self, answers: &AnswerSet) -> AssessmentReport {
        let prepared = self.prepare(answers);
        let (care, hours) = tokio::join!(
            self.category_decision(&prepared),
            self.hours_decision(&prepared)
        );

        AssessmentReport {
            assessed_at: Utc::now(),
            care,
            hours,
        }
    }

    /// Synchronous path that skips the LLM entirely, regardless of configuration.
    pub fn assess_deterministic(&self, answers: &AnswerSet) -> AssessmentReport {
        let prepared = self.prepare(answers);
        let care = self.finish_category(&prepared, &MediatorOutcome::Disabled);
        let hours = self.finish_hours(&prepared, &MediatorOutcome::Disabled);

        AssessmentReport {
            assessed_at: Utc::now(),
            care,
            hours,
        }
    }
}
