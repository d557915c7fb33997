use std::sync::Arc;
use std::time::Duration;

use super::common::*;
use crate::assessment::domain::{AnswerSet, DecisionSource};
use crate::assessment::engine::AssessmentEngine;
use crate::assessment::hours::HoursBand;
use crate::assessment::mediator::Mediator;

#[tokio::test]
async fn deterministic_engine_applies_gates_and_bands() {
    let engine = AssessmentEngine::deterministic(shared_rules());

    let report = engine.assess(&moderate_cognition_answers()).await;

    assert_eq!(report.care.score, 74);
    assert_eq!(report.care.baseline_category, category("memory_care"));
    assert_eq!(report.care.category, category("assisted_living"));
    assert_eq!(report.care.source, DecisionSource::Deterministic);
    assert_eq!(report.hours.score, 35);
    assert_eq!(report.hours.band, HoursBand::RoundTheClock);
    assert_eq!(report.hours.source, DecisionSource::Deterministic);
}

#[tokio::test]
async fn synchronous_path_matches_async_deterministic_path() {
    let engine = AssessmentEngine::deterministic(shared_rules());
    let answers = moderate_cognition_answers();

    let asynchronous = engine.assess(&answers).await;
    let synchronous = engine.assess_deterministic(&answers);

    assert_eq!(asynchronous.care, synchronous.care);
    assert_eq!(asynchronous.hours, synchronous.hours);
}

#[tokio::test]
async fn llm_refinements_inside_bounds_are_adopted() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_category(category_reply("in_home", 0.625))
            .with_hours(band_reply("substantial", 0.8)),
    );
    let engine = AssessmentEngine::with_mediator(shared_rules(), mediator(provider.clone()));

    let report = engine.assess(&moderate_cognition_answers()).await;

    assert_eq!(report.care.category, category("in_home"));
    assert_eq!(report.care.source, DecisionSource::Llm);
    assert_eq!(report.care.confidence, 0.625);
    assert_eq!(report.hours.band, HoursBand::Substantial);
    assert_eq!(report.hours.source, DecisionSource::Llm);
    assert_eq!(provider.requests().len(), 2);
}

#[tokio::test]
async fn llm_cannot_reinstate_a_gated_category() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_category(category_reply("memory_care", 0.97))
            .with_hours(band_reply("round_the_clock", 0.9)),
    );
    let engine = AssessmentEngine::with_mediator(shared_rules(), mediator(provider));

    let report = engine.assess(&moderate_cognition_answers()).await;

    assert_eq!(report.care.category, category("assisted_living"));
    assert_eq!(report.care.source, DecisionSource::FallbackGate);
    assert!(!report.care.allowed_categories.contains(&category("memory_care")));
    assert_eq!(report.hours.band, HoursBand::RoundTheClock);
    assert_eq!(report.hours.source, DecisionSource::Llm);
}

#[tokio::test]
async fn slow_llm_falls_back_on_both_decisions() {
    let provider = Arc::new(SlowProvider {
        delay: Duration::from_secs(2),
    });
    let mediator = Mediator::new(provider).with_timeout(Duration::from_millis(50));
    let engine = AssessmentEngine::with_mediator(shared_rules(), mediator);

    let report = engine.assess(&moderate_cognition_answers()).await;

    assert_eq!(report.care.source, DecisionSource::FallbackTimeout);
    assert_eq!(report.care.category, category("assisted_living"));
    assert_eq!(report.hours.source, DecisionSource::FallbackTimeout);
    assert_eq!(report.hours.band, HoursBand::RoundTheClock);
}

#[tokio::test]
async fn unavailable_provider_is_reported_as_deterministic() {
    let engine = AssessmentEngine::with_mediator(
        shared_rules(),
        mediator(Arc::new(ScriptedProvider::new())),
    );

    let decision = engine.evaluate_category(&independent_answers()).await;

    assert_eq!(decision.category, category("independent"));
    assert_eq!(decision.source, DecisionSource::Deterministic);
    assert!(decision
        .rationale
        .iter()
        .any(|line| line.contains("provider unavailable")));
}

#[tokio::test]
async fn empty_answers_still_produce_decisions() {
    let engine = AssessmentEngine::deterministic(shared_rules());

    let care = engine.evaluate_category(&AnswerSet::new()).await;
    let hours = engine.evaluate_hours(&AnswerSet::new()).await;

    assert_eq!(care.category, category("independent"));
    assert_eq!(care.score, 0);
    assert!(!care.rationale.is_empty());
    assert_eq!(hours.band, HoursBand::Minimal);
    assert!((0.0..=1.0).contains(&hours.confidence));
}

#[test]
fn report_serializes_with_snake_case_sources() {
    let engine = AssessmentEngine::deterministic(shared_rules());

    let report = engine.assess_deterministic(&moderate_cognition_answers());
    let value = serde_json::to_value(&report).expect("report serializes");

    assert_eq!(value["care"]["source"], "deterministic");
    assert_eq!(value["care"]["category"], "assisted_living");
    assert_eq!(value["hours"]["band"], "round_the_clock");
    assert_eq!(
        value["care"]["gates_applied"][0],
        "moderate_cognition_without_risk"
    );
}
