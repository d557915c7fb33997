//! Care-tier decision engine: scoring, gate policy, LLM mediation, and adjudication.
//!
//! The deterministic path is always computed in full before any LLM is consulted, so every
//! fallback reuses it without recomputation.

pub(crate) mod adjudication;
pub mod domain;
pub mod engine;
pub mod gates;
pub mod hours;
pub mod mediator;
pub mod rules;
pub mod scoring;
pub mod signals;

#[cfg(test)]
mod tests;

pub use adjudication::decide;
pub use domain::{
    AllowedCategories, AnswerSet, AnswerValue, CategoryId, CategoryRanking, Decision,
    DecisionSource,
};
pub use engine::{AssessmentEngine, AssessmentReport};
pub use gates::{apply_gates, effective_baseline, GateCondition, GateOutcome};
pub use hours::{allowed_refinements, decide_hours, HoursBand, HoursDecision};
pub use mediator::{
    HttpLlmProvider, LlmProvider, LlmRequest, Mediator, MediatorOutcome, NoLlm, ProviderError,
    Rejection, Suggestion,
};
pub use rules::{RuleConfigError, RuleDocument, RuleSet};
pub use scoring::{determine_band, determine_category, score, ScoreCard};
pub use signals::{CognitionSeverity, SeverityBand, Signals};
