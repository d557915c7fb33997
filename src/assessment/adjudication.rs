use tracing::warn;

use super::domain::{CategoryId, CategoryRanking, Decision, DecisionSource};
use super::gates::{effective_baseline, GateOutcome};
use super::mediator::{Choice, MediatorOutcome};
use super::rules::RuleSet;

/// Confidence assigned when the deterministic answer did not come straight from its own
/// threshold (gate displacement or fail-closed lookup).
pub(crate) const DISPLACED_CONFIDENCE: f64 = 0.5;
const BOUNDARY_CONFIDENCE: f64 = 0.6;

/// Choice, provenance, and explanation produced by the fusion policy.
pub(crate) struct Verdict<C> {
    pub choice: C,
    pub source: DecisionSource,
    pub confidence: f64,
    pub notes: Vec<String>,
}

/// LLM-first fusion with unconditional deterministic fallback.
///
/// `baseline` must already be a member of `allowed`; callers compute it before the LLM is ever
/// consulted so no fallback branch needs recomputation.
pub(crate) fn adjudicate<C: Choice>(
    baseline: &C,
    allowed: &[C],
    outcome: &MediatorOutcome<C>,
    baseline_confidence: f64,
) -> Verdict<C> {
    let fallback = |source: DecisionSource, note: String| Verdict {
        choice: baseline.clone(),
        source,
        confidence: baseline_confidence.clamp(0.0, 1.0),
        notes: vec![note],
    };

    match outcome {
        MediatorOutcome::Suggested(suggestion) if allowed.contains(&suggestion.choice) => {
            let note = if &suggestion.choice == baseline {
                format!(
                    "LLM confirmed {} (confidence {:.2}): {}",
                    suggestion.choice.choice_id(),
                    suggestion.confidence,
                    suggestion.reasoning
                )
            } else {
                format!(
                    "LLM refined recommendation from {} to {} (confidence {:.2}): {}",
                    baseline.choice_id(),
                    suggestion.choice.choice_id(),
                    suggestion.confidence,
                    suggestion.reasoning
                )
            };
            Verdict {
                choice: suggestion.choice.clone(),
                source: DecisionSource::Llm,
                confidence: suggestion.confidence.clamp(0.0, 1.0),
                notes: vec![note],
            }
        }
        MediatorOutcome::Suggested(suggestion) => fallback(
            DecisionSource::FallbackGate,
            format!(
                "LLM suggested {}, which is not eligible; kept {}",
                suggestion.choice.choice_id(),
                baseline.choice_id()
            ),
        ),
        MediatorOutcome::Rejected(rejection) if rejection.is_out_of_set() => fallback(
            DecisionSource::FallbackGate,
            format!(
                "LLM response rejected ({rejection}); kept {}",
                baseline.choice_id()
            ),
        ),
        MediatorOutcome::TimedOut { after } => fallback(
            DecisionSource::FallbackTimeout,
            format!(
                "LLM did not respond within {} ms; kept {}",
                after.as_millis(),
                baseline.choice_id()
            ),
        ),
        MediatorOutcome::Rejected(rejection) => fallback(
            DecisionSource::FallbackInvalid,
            format!(
                "LLM response rejected ({rejection}); kept {}",
                baseline.choice_id()
            ),
        ),
        MediatorOutcome::Disabled => fallback(
            DecisionSource::Deterministic,
            "LLM advisory disabled; deterministic recommendation used".to_string(),
        ),
        MediatorOutcome::Unavailable(reason) => fallback(
            DecisionSource::Deterministic,
            format!("LLM provider unavailable ({reason}); deterministic recommendation used"),
        ),
    }
}

/// Margin-based confidence: 1.0 at the centre of the range, falling to 0.6 at an edge shared
/// with a neighbouring range. Outer edges of the scale have no neighbour and do not count.
pub(crate) fn boundary_confidence(score: i32, ranges: &[(i32, i32)], index: usize) -> f64 {
    let Some(&(min, max)) = ranges.get(index) else {
        return DISPLACED_CONFIDENCE;
    };

    let mut margins = Vec::with_capacity(2);
    if index > 0 {
        margins.push(score - min);
    }
    if index + 1 < ranges.len() {
        margins.push(max - score);
    }

    let Some(margin) = margins.into_iter().min() else {
        return 1.0;
    };

    let half_width = (f64::from(max - min) / 2.0).max(1.0);
    let ratio = (f64::from(margin.max(0)) / half_width).min(1.0);
    (BOUNDARY_CONFIDENCE + (1.0 - BOUNDARY_CONFIDENCE) * ratio).clamp(0.0, 1.0)
}

/// Order candidates by affinity to `score`: 1.0 inside a candidate's range, decaying linearly
/// with distance relative to `span`. Ties keep the input (severity) order.
pub(crate) fn rank<C>(
    score: i32,
    candidates: impl Iterator<Item = (C, i32, i32)>,
    span: i32,
) -> Vec<(C, f64)> {
    let span = f64::from(span.max(1));
    let mut ranked: Vec<(C, f64)> = candidates
        .map(|(candidate, min, max)| {
            let distance = if score < min {
                min - score
            } else if score > max {
                score - max
            } else {
                0
            };
            let affinity = (1.0 - f64::from(distance) / span).clamp(0.0, 1.0);
            (candidate, affinity)
        })
        .collect();

    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

/// Fuse the deterministic baseline, the gated allowed set, and the mediator outcome into the
/// final care-tier decision.
pub fn decide(
    baseline: &CategoryId,
    gates: &GateOutcome,
    outcome: &MediatorOutcome<CategoryId>,
    score: i32,
    rules: &RuleSet,
) -> Decision {
    let allowed = &gates.allowed;
    let effective = effective_baseline(baseline, allowed, rules);
    let ranges: Vec<(i32, i32)> = rules
        .thresholds()
        .iter()
        .map(|threshold| (threshold.min_score, threshold.max_score))
        .collect();

    let baseline_threshold = rules
        .threshold_for(baseline)
        .filter(|threshold| score >= threshold.min_score && score <= threshold.max_score);

    let mut baseline_confidence = match (baseline_threshold, rules.severity_index(&effective)) {
        (Some(_), Some(index)) => boundary_confidence(score, &ranges, index),
        _ => DISPLACED_CONFIDENCE,
    };
    if &effective != baseline {
        baseline_confidence = baseline_confidence.min(DISPLACED_CONFIDENCE);
    }

    let mut rationale = Vec::new();
    match baseline_threshold {
        Some(threshold) => rationale.push(format!(
            "Total score {score} falls within {} ({}-{})",
            rules.category_label(baseline),
            threshold.min_score,
            threshold.max_score
        )),
        None => rationale.push(format!(
            "Total score {score} matched no threshold; defaulted to {}",
            rules.category_label(baseline)
        )),
    }

    for gate_id in &gates.applied {
        let description = rules
            .gates()
            .iter()
            .find(|gate| &gate.id == gate_id)
            .map(|gate| gate.description.as_str())
            .filter(|description| !description.is_empty())
            .unwrap_or("no description");
        rationale.push(format!("Gate {gate_id} narrowed eligible categories: {description}"));
    }
    for gate_id in &gates.suppressed {
        rationale.push(format!(
            "Gate {gate_id} matched but was skipped to keep at least one category eligible"
        ));
    }
    if &effective != baseline {
        rationale.push(format!(
            "{} is not eligible after gating; deterministic recommendation moved to {}",
            rules.category_label(baseline),
            rules.category_label(&effective)
        ));
    }

    let verdict = adjudicate(&effective, allowed.as_slice(), outcome, baseline_confidence);
    rationale.extend(verdict.notes);

    if !allowed.contains(&verdict.choice) {
        warn!(
            category = %verdict.choice,
            "adjudicated category outside allowed set"
        );
    }

    let candidates = allowed.iter().filter_map(|category| {
        rules
            .threshold_for(category)
            .map(|threshold| (category.clone(), threshold.min_score, threshold.max_score))
    });
    let category_rankings = rank(score, candidates, rules.score_range().width())
        .into_iter()
        .map(|(category, score)| CategoryRanking { category, score })
        .collect();

    Decision {
        category: verdict.choice,
        baseline_category: baseline.clone(),
        score,
        allowed_categories: allowed.clone(),
        source: verdict.source,
        confidence: verdict.confidence,
        rationale,
        category_rankings,
        gates_applied: gates.applied.clone(),
    }
}
