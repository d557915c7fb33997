use std::fmt::Write as _;
use std::time::Duration;

use super::super::domain::{AllowedCategories, CategoryId};
use super::super::gates::effective_baseline;
use super::super::hours::HoursBand;
use super::super::rules::RuleSet;
use super::super::scoring::ScoreCard;
use super::super::signals::Signals;
use super::provider::LlmRequest;
use super::Choice;

pub(crate) const SYSTEM_PROMPT: &str = "You are a care-planning assistant reviewing a completed \
needs assessment. A deterministic rule engine has already produced a recommendation. You may \
confirm it or choose another option, but only from the options listed. Reply with one JSON \
object and nothing else.";

/// Everything the category request is rendered from.
pub struct CategoryContext<'a> {
    pub rules: &'a RuleSet,
    pub card: &'a ScoreCard,
    pub signals: &'a Signals,
    /// Raw threshold match; the prompt recommends the nearest allowed category instead.
    pub baseline: &'a CategoryId,
    pub allowed: &'a AllowedCategories,
}

pub struct HoursContext<'a> {
    pub rules: &'a RuleSet,
    pub card: &'a ScoreCard,
    pub signals: &'a Signals,
    pub baseline: HoursBand,
    pub allowed: &'a [HoursBand],
}

/// Human-readable answers: question labels and option labels only, never field ids.
pub(crate) fn narrative(card: &ScoreCard, rules: &RuleSet) -> Vec<String> {
    card.fields
        .iter()
        .filter_map(|scored| {
            let field = rules.field(&scored.field_id)?;
            let answers = scored
                .selections
                .iter()
                .map(|selection| selection.label.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            Some(format!("{}: {}", field.label, answers))
        })
        .collect()
}

pub(crate) fn category_request(context: &CategoryContext<'_>, deadline: Duration) -> LlmRequest {
    let mut prompt = context_sections(context.card, context.signals, context.rules);
    let recommended = effective_baseline(context.baseline, context.allowed, context.rules);

    let _ = writeln!(
        prompt,
        "\nDeterministic recommendation: {} ({}), total score {}.",
        context.rules.category_label(&recommended),
        recommended,
        context.card.total
    );
    if &recommended != context.baseline {
        let _ = writeln!(
            prompt,
            "The score alone points to {} ({}), which the eligibility rules exclude.",
            context.rules.category_label(context.baseline),
            context.baseline
        );
    }
    prompt.push_str("\nAllowed care categories:\n");
    for category in context.allowed.iter() {
        let _ = writeln!(
            prompt,
            "- {}: {}",
            category,
            context.rules.category_label(category)
        );
    }
    prompt.push_str(&schema_instruction(context.allowed.as_slice()));

    LlmRequest {
        system: SYSTEM_PROMPT.to_string(),
        prompt,
        deadline,
    }
}

pub(crate) fn hours_request(context: &HoursContext<'_>, deadline: Duration) -> LlmRequest {
    let mut prompt = context_sections(context.card, context.signals, context.rules);

    let _ = writeln!(
        prompt,
        "\nDeterministic daily care-hours band: {} ({}), hours score {}.",
        context.baseline.label(),
        context.baseline,
        context.card.hours_total
    );
    prompt.push_str(
        "\nYou may keep this band or move at most one step. Allowed bands:\n",
    );
    for band in context.allowed {
        let _ = writeln!(prompt, "- {}: {}", band, band.label());
    }
    prompt.push_str(&schema_instruction(context.allowed));

    LlmRequest {
        system: SYSTEM_PROMPT.to_string(),
        prompt,
        deadline,
    }
}

fn context_sections(card: &ScoreCard, signals: &Signals, rules: &RuleSet) -> String {
    let mut prompt = String::from("Assessment answers:\n");
    let answers = narrative(card, rules);
    if answers.is_empty() {
        prompt.push_str("- No recognised answers were provided.\n");
    }
    for line in answers {
        let _ = writeln!(prompt, "- {line}");
    }

    prompt.push_str("\nObservations:\n");
    for line in signals.describe() {
        let _ = writeln!(prompt, "- {line}");
    }
    prompt
}

fn schema_instruction<C: Choice>(allowed: &[C]) -> String {
    let options = allowed
        .iter()
        .map(|choice| format!("\"{}\"", choice.choice_id()))
        .collect::<Vec<_>>()
        .join(" | ");

    format!(
        "\nRespond with JSON matching exactly this schema:\n\
         {{\"{field}\": {options}, \"confidence\": <number from 0 to 1>, \
         \"reasoning\": \"<one or two sentences>\"}}\n",
        field = C::SCHEMA_FIELD,
    )
}
