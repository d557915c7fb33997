use super::common::*;
use crate::assessment::domain::AnswerSet;
use crate::assessment::hours::HoursBand;
use crate::assessment::rules::Marker;
use crate::assessment::scoring::{determine_band, determine_category, score, SkipReason};
use crate::assessment::signals::{CognitionSeverity, SeverityBand, Signals};

#[test]
fn sums_weights_for_answered_fields() {
    let rules = rules();

    let card = score(&moderate_cognition_answers(), &rules);

    assert_eq!(card.total, 74);
    assert_eq!(card.hours_total, 35);
    assert!(card.skipped.is_empty());
    assert!(card.missing_required.is_empty());

    let memory = card
        .fields
        .iter()
        .find(|field| field.field_id == "memory")
        .expect("memory scored");
    assert_eq!(memory.points, 15);
    assert_eq!(memory.selections[0].label, "Frequent confusion");
}

#[test]
fn lowest_need_answers_score_zero() {
    let card = score(&independent_answers(), &rules());

    assert_eq!(card.total, 0);
    assert_eq!(card.hours_total, 0);
    assert_eq!(card.markers().count(), 0);
}

#[test]
fn unanswered_fields_contribute_nothing_but_are_reported() {
    let card = score(&AnswerSet::new(), &rules());

    assert_eq!(card.total, 0);
    assert!(card.fields.is_empty());
    assert_eq!(
        card.missing_required,
        vec!["bathing", "dressing", "toileting", "transferring", "eating", "memory"]
    );
}

#[test]
fn unknown_fields_and_options_are_skipped() {
    let answers = AnswerSet::new()
        .with("pets", "cat")
        .with("bathing", "sometimes")
        .with("memory", "occasional_forgetfulness");

    let card = score(&answers, &rules());

    assert_eq!(card.total, 5);
    assert_eq!(card.skipped.len(), 2);
    assert!(card.skipped.iter().any(|skipped| skipped.field_id == "pets"
        && skipped.value.is_none()
        && skipped.reason == SkipReason::UnknownField));
    assert!(card.skipped.iter().any(|skipped| skipped.field_id == "bathing"
        && skipped.value.as_deref() == Some("sometimes")
        && skipped.reason == SkipReason::UnknownOption));
}

#[test]
fn single_select_field_keeps_first_value_only() {
    let answers = AnswerSet::new().with("bathing", vec!["some_help", "full_help"]);

    let card = score(&answers, &rules());

    assert_eq!(card.total, 4);
    match card.skipped.as_slice() {
        [skipped] => {
            assert_eq!(skipped.reason, SkipReason::ExtraSelection);
            assert_eq!(skipped.value.as_deref(), Some("full_help"));
        }
        other => panic!("expected one extra selection, got {other:?}"),
    }
}

#[test]
fn multi_select_field_accumulates_weights_and_markers() {
    let answers = AnswerSet::new().with("behaviors", vec!["wandering", "aggression"]);

    let card = score(&answers, &rules());

    assert_eq!(card.total, 13);
    assert_eq!(card.hours_total, 10);
    assert_eq!(
        card.markers()
            .filter(|marker| *marker == Marker::RiskyBehavior)
            .count(),
        2
    );
}

#[test]
fn repeated_multi_select_values_count_once() {
    let rules = rules();
    let answers = independent_answers().with("behaviors", vec!["sundowning"; 40]);

    let card = score(&answers, &rules);

    assert_eq!(card.total, 3);
    assert!(rules.score_range().contains(card.total));
    assert_eq!(determine_category(card.total, &rules), category("independent"));
    assert_eq!(card.skipped.len(), 39);
    assert!(card
        .skipped
        .iter()
        .all(|skipped| skipped.reason == SkipReason::DuplicateSelection
            && skipped.value.as_deref() == Some("sundowning")));
}

#[test]
fn repeated_risky_selection_adds_one_marker() {
    let answers = AnswerSet::new()
        .with("behaviors", vec!["wandering", "wandering", "wandering"])
        .with("memory", "frequent_confusion");

    let card = score(&answers, &rules());
    let signals = Signals::from_score_card(&card);

    assert_eq!(card.total, 8 + 15);
    assert_eq!(
        card.markers()
            .filter(|marker| *marker == Marker::RiskyBehavior)
            .count(),
        1
    );
    assert!(signals.risky_behavior);
    assert_eq!(card.skipped.len(), 2);
}

#[test]
fn answers_parse_from_json() {
    let answers = AnswerSet::from_json_str(
        r#"{"bathing":"some_help","behaviors":["wandering","sundowning"]}"#,
    )
    .expect("answers parse");

    let card = score(&answers, &rules());

    assert_eq!(card.total, 4 + 8 + 3);
}

#[test]
fn threshold_max_maps_to_its_category_and_next_score_moves_up() {
    let rules = rules();

    assert_eq!(determine_category(20, &rules), category("independent"));
    assert_eq!(determine_category(21, &rules), category("in_home"));
    assert_eq!(determine_category(40, &rules), category("in_home"));
    assert_eq!(determine_category(41, &rules), category("assisted_living"));
    assert_eq!(determine_category(70, &rules), category("assisted_living"));
    assert_eq!(determine_category(71, &rules), category("memory_care"));
    assert_eq!(determine_category(100, &rules), category("memory_care"));
}

#[test]
fn category_is_monotonic_in_score() {
    let rules = rules();
    let range = rules.score_range();

    let mut previous = 0;
    for total in range.min..=range.max {
        let index = rules
            .severity_index(&determine_category(total, &rules))
            .expect("known category");
        assert!(
            index >= previous,
            "score {total} dropped from severity {previous} to {index}"
        );
        previous = index;
    }
}

#[test]
fn uncovered_scores_fail_closed_to_highest_severity() {
    let rules = rules();

    assert_eq!(determine_category(150, &rules), category("memory_care"));
    assert_eq!(determine_category(-3, &rules), category("memory_care"));
    assert_eq!(determine_band(99, &rules), HoursBand::RoundTheClock);
}

#[test]
fn hours_bands_follow_inclusive_ranges() {
    let rules = rules();

    assert_eq!(determine_band(0, &rules), HoursBand::Minimal);
    assert_eq!(determine_band(6, &rules), HoursBand::Minimal);
    assert_eq!(determine_band(7, &rules), HoursBand::Moderate);
    assert_eq!(determine_band(30, &rules), HoursBand::Substantial);
    assert_eq!(determine_band(31, &rules), HoursBand::RoundTheClock);
}

#[test]
fn signals_summarise_markers() {
    let card = score(&moderate_cognition_answers(), &rules());

    let signals = Signals::from_score_card(&card);

    assert_eq!(signals.dependency_count, 8);
    assert_eq!(signals.cognition_severity, CognitionSeverity::Moderate);
    assert!(!signals.risky_behavior);
    assert!(signals.fall_risk);
    assert!(signals.medication_support);
    assert!(signals.lives_alone);
    assert_eq!(signals.severity_band, SeverityBand::High);
}
