//! Daily care-hours banding: the same baseline plus bounded refinement pattern as the category
//! decision, over a closed band enumeration with a one-step adjacency limit.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::adjudication::{adjudicate, boundary_confidence, rank, DISPLACED_CONFIDENCE};
use super::domain::DecisionSource;
use super::mediator::MediatorOutcome;
use super::rules::RuleSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoursBand {
    Minimal,
    Moderate,
    Substantial,
    RoundTheClock,
}

impl HoursBand {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Minimal,
            Self::Moderate,
            Self::Substantial,
            Self::RoundTheClock,
        ]
    }

    pub const fn ceiling() -> Self {
        Self::RoundTheClock
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Minimal => 0,
            Self::Moderate => 1,
            Self::Substantial => 2,
            Self::RoundTheClock => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ordered().get(index).copied()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Moderate => "moderate",
            Self::Substantial => "substantial",
            Self::RoundTheClock => "round_the_clock",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Minimal => "Minimal (under 1 hour a day)",
            Self::Moderate => "Moderate (1-4 hours a day)",
            Self::Substantial => "Substantial (4-12 hours a day)",
            Self::RoundTheClock => "Round-the-clock (24 hours a day)",
        }
    }

    /// Finer display segments derived from the authoritative four-band scale.
    pub const fn display_ranges(self) -> &'static [&'static str] {
        match self {
            Self::Minimal => &["0-1 h/day"],
            Self::Moderate => &["1-2 h/day", "2-4 h/day"],
            Self::Substantial => &["4-8 h/day", "8-12 h/day"],
            Self::RoundTheClock => &["24 h/day"],
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|band| band.as_str() == raw.trim())
    }
}

impl fmt::Display for HoursBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bands an LLM refinement may select from a given baseline: the baseline and its direct
/// neighbours. The ceiling band is only ever adjacent to the band directly below it.
pub fn allowed_refinements(baseline: HoursBand) -> Vec<HoursBand> {
    let index = baseline.index();
    HoursBand::ordered()
        .into_iter()
        .filter(|band| band.index().abs_diff(index) <= 1)
        .filter(|band| {
            *band != HoursBand::ceiling()
                || baseline.index() + 1 >= HoursBand::ceiling().index()
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandRanking {
    pub band: HoursBand,
    pub score: f64,
}

/// Hours recommendation, structurally parallel to [`Decision`](super::domain::Decision).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoursDecision {
    pub band: HoursBand,
    pub baseline_band: HoursBand,
    pub score: i32,
    pub allowed_bands: Vec<HoursBand>,
    pub source: DecisionSource,
    pub confidence: f64,
    pub rationale: Vec<String>,
    pub band_rankings: Vec<BandRanking>,
}

impl HoursDecision {
    pub fn summary(&self) -> String {
        format!(
            "{} (hours score {}, source {}, confidence {:.2})",
            self.band.label(),
            self.score,
            self.source,
            self.confidence
        )
    }
}

/// Fuse the deterministic band with the (possibly absent) LLM refinement.
pub fn decide_hours(
    baseline: HoursBand,
    outcome: &MediatorOutcome<HoursBand>,
    score: i32,
    rules: &RuleSet,
) -> HoursDecision {
    let allowed = allowed_refinements(baseline);
    let ranges: Vec<(i32, i32)> = rules
        .hours_thresholds()
        .iter()
        .map(|threshold| (threshold.min_score, threshold.max_score))
        .collect();

    let in_range = ranges
        .get(baseline.index())
        .is_some_and(|(min, max)| score >= *min && score <= *max);
    let baseline_confidence = if in_range {
        boundary_confidence(score, &ranges, baseline.index())
    } else {
        DISPLACED_CONFIDENCE
    };

    let mut rationale = Vec::new();
    if in_range {
        let (min, max) = ranges[baseline.index()];
        rationale.push(format!(
            "Hours score {score} falls within {} ({min}-{max})",
            baseline.label()
        ));
    } else {
        rationale.push(format!(
            "Hours score {score} matched no band; defaulted to {}",
            baseline.label()
        ));
    }
    rationale.push(format!(
        "Refinement limited to {}",
        allowed
            .iter()
            .map(|band| band.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    ));

    let verdict = adjudicate(&baseline, &allowed, outcome, baseline_confidence);
    rationale.extend(verdict.notes);

    let candidates = allowed.iter().filter_map(|band| {
        rules
            .hours_threshold_for(*band)
            .map(|threshold| (*band, threshold.min_score, threshold.max_score))
    });
    let band_rankings = rank(score, candidates, rules.hours_range().width())
        .into_iter()
        .map(|(band, score)| BandRanking { band, score })
        .collect();

    HoursDecision {
        band: verdict.choice,
        baseline_band: baseline,
        score,
        allowed_bands: allowed,
        source: verdict.source,
        confidence: verdict.confidence,
        rationale,
        band_rankings,
    }
}
