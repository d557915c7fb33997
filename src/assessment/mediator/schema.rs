use serde_json::{Map, Value};

use super::{Choice, Suggestion};

const CONFIDENCE_FIELD: &str = "confidence";
const REASONING_FIELD: &str = "reasoning";

/// Reason an LLM response was discarded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("response is not a JSON object")]
    NotStructured,
    #[error("response contains unexpected field {0}")]
    UnknownField(String),
    #[error("response is missing field {0}")]
    MissingField(&'static str),
    #[error("field {field} must be a {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("suggested {0} is not among the allowed choices")]
    OutsideAllowed(String),
    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),
    #[error("reasoning is empty")]
    EmptyReasoning,
}

impl Rejection {
    /// Well-formed suggestion that named a choice the gates or adjacency rule exclude.
    pub fn is_out_of_set(&self) -> bool {
        matches!(self, Rejection::OutsideAllowed(_))
    }
}

/// Parse raw completion text into a suggestion restricted to `allowed`.
///
/// The body must be exactly `{<choice field>, confidence, reasoning}`; a single surrounding
/// Markdown code fence is the only wrapping tolerated.
pub(crate) fn parse_suggestion<C: Choice>(
    raw: &str,
    allowed: &[C],
) -> Result<Suggestion<C>, Rejection> {
    let body = strip_code_fence(raw);
    let value: Value = serde_json::from_str(body).map_err(|_| Rejection::NotStructured)?;
    let Value::Object(map) = value else {
        return Err(Rejection::NotStructured);
    };

    for key in map.keys() {
        if key != C::SCHEMA_FIELD && key != CONFIDENCE_FIELD && key != REASONING_FIELD {
            return Err(Rejection::UnknownField(key.clone()));
        }
    }

    let choice = required(&map, C::SCHEMA_FIELD)?
        .as_str()
        .ok_or(Rejection::WrongType {
            field: C::SCHEMA_FIELD,
            expected: "string",
        })?;
    let confidence = required(&map, CONFIDENCE_FIELD)?
        .as_f64()
        .ok_or(Rejection::WrongType {
            field: CONFIDENCE_FIELD,
            expected: "number",
        })?;
    let reasoning = required(&map, REASONING_FIELD)?
        .as_str()
        .ok_or(Rejection::WrongType {
            field: REASONING_FIELD,
            expected: "string",
        })?;

    let choice = allowed
        .iter()
        .find(|candidate| candidate.choice_id() == choice)
        .cloned()
        .ok_or_else(|| Rejection::OutsideAllowed(choice.to_string()))?;

    if !(0.0..=1.0).contains(&confidence) {
        return Err(Rejection::ConfidenceOutOfRange(confidence));
    }

    let reasoning = reasoning.trim();
    if reasoning.is_empty() {
        return Err(Rejection::EmptyReasoning);
    }

    Ok(Suggestion {
        choice,
        confidence,
        reasoning: reasoning.to_string(),
    })
}

fn required<'a>(map: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, Rejection> {
    match map.get(field) {
        Some(Value::Null) | None => Err(Rejection::MissingField(field)),
        Some(value) => Ok(value),
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };

    match inner.split_once('\n') {
        Some((tag, body)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => body.trim(),
        _ => inner.trim(),
    }
}
