use std::fmt;

use serde::{Deserialize, Serialize};

use super::rules::Marker;
use super::scoring::ScoreCard;

/// Dependency count at which the coarse severity band rises to elevated.
const ELEVATED_DEPENDENCY_COUNT: u32 = 3;
/// Dependency count at which the coarse severity band rises to high.
const HIGH_DEPENDENCY_COUNT: u32 = 6;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CognitionSeverity {
    #[default]
    None,
    Mild,
    Moderate,
    Severe,
}

impl CognitionSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            CognitionSeverity::None => "none",
            CognitionSeverity::Mild => "mild",
            CognitionSeverity::Moderate => "moderate",
            CognitionSeverity::Severe => "severe",
        }
    }

    fn from_marker(marker: Marker) -> Option<Self> {
        match marker {
            Marker::CognitionMild => Some(CognitionSeverity::Mild),
            Marker::CognitionModerate => Some(CognitionSeverity::Moderate),
            Marker::CognitionSevere => Some(CognitionSeverity::Severe),
            _ => None,
        }
    }
}

impl fmt::Display for CognitionSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SeverityBand {
    #[default]
    Low,
    Elevated,
    High,
}

impl SeverityBand {
    pub const fn label(self) -> &'static str {
        match self {
            SeverityBand::Low => "low",
            SeverityBand::Elevated => "elevated",
            SeverityBand::High => "high",
        }
    }
}

/// Typed facts derived once per assessment. Gates and prompt rendering read these instead of
/// raw answers or marker strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signals {
    pub dependency_count: u32,
    pub cognition_severity: CognitionSeverity,
    pub risky_behavior: bool,
    pub fall_risk: bool,
    pub medication_support: bool,
    pub lives_alone: bool,
    pub severity_band: SeverityBand,
}

impl Signals {
    pub fn from_score_card(card: &ScoreCard) -> Self {
        let mut signals = Signals::default();

        for marker in card.markers() {
            if marker.is_dependency() {
                signals.dependency_count += 1;
            }
            if let Some(severity) = CognitionSeverity::from_marker(marker) {
                signals.cognition_severity = signals.cognition_severity.max(severity);
            }
            match marker {
                Marker::RiskyBehavior => signals.risky_behavior = true,
                Marker::FallRisk => signals.fall_risk = true,
                Marker::MedicationSupport => signals.medication_support = true,
                Marker::LivesAlone => signals.lives_alone = true,
                _ => {}
            }
        }

        signals.severity_band = signals.coarse_band();
        signals
    }

    fn coarse_band(&self) -> SeverityBand {
        if self.cognition_severity == CognitionSeverity::Severe
            || self.risky_behavior
            || self.dependency_count >= HIGH_DEPENDENCY_COUNT
        {
            SeverityBand::High
        } else if self.cognition_severity == CognitionSeverity::Moderate
            || self.fall_risk
            || self.dependency_count >= ELEVATED_DEPENDENCY_COUNT
        {
            SeverityBand::Elevated
        } else {
            SeverityBand::Low
        }
    }

    /// Plain-language summary lines for narrative context.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![
            format!(
                "Needs help with {} daily activit{}",
                self.dependency_count,
                if self.dependency_count == 1 { "y" } else { "ies" }
            ),
            format!(
                "Cognitive impairment: {}",
                self.cognition_severity.label()
            ),
        ];
        if self.risky_behavior {
            lines.push("Shows behaviors that put their safety at risk".to_string());
        }
        if self.fall_risk {
            lines.push("Elevated fall risk".to_string());
        }
        if self.medication_support {
            lines.push("Needs support managing medications".to_string());
        }
        if self.lives_alone {
            lines.push("Currently lives alone".to_string());
        }
        lines.push(format!("Overall severity: {}", self.severity_band.label()));
        lines
    }
}
