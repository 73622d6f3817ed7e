use std::time::Duration;

use serde::Serialize;

use crate::countermeasures::CounterMeasure;
use crate::signals::{DetectionSignal, SignalCollector, SignalSnapshot};

pub const MAXIMUM_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const ENHANCED_POLL_INTERVAL: Duration = Duration::from_millis(200);
pub const NORMAL_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Response tier. Controls polling cadence and which counter-measures fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    #[default]
    Normal = 1,
    Enhanced = 2,
    Maximum = 3,
}

impl SecurityLevel {
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            1 => Some(Self::Normal),
            2 => Some(Self::Enhanced),
            3 => Some(Self::Maximum),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u8 {
        self as u8
    }

    pub fn poll_interval(self) -> Duration {
        match self {
            Self::Maximum => MAXIMUM_POLL_INTERVAL,
            Self::Enhanced => ENHANCED_POLL_INTERVAL,
            Self::Normal => NORMAL_POLL_INTERVAL,
        }
    }

    /// Signals OR'd together by the on-demand analysis query.
    pub fn analysis_signals(self) -> &'static [DetectionSignal] {
        match self {
            Self::Maximum => &[
                DetectionSignal::Traced,
                DetectionSignal::Hooked,
                DetectionSignal::TimingAnomalous,
                DetectionSignal::Emulated,
            ],
            Self::Enhanced => &[
                DetectionSignal::Traced,
                DetectionSignal::Hooked,
                DetectionSignal::TimingAnomalous,
            ],
            Self::Normal => &[DetectionSignal::Traced, DetectionSignal::Hooked],
        }
    }

    /// Counter-measures for a detection in `signals`.
    ///
    /// Timing alone is too noisy to justify noise injection, so a timing-only
    /// detection at Maximum is answered with attach blocking only.
    pub fn response_to(self, signals: &SignalSnapshot) -> Vec<CounterMeasure> {
        if !signals.any_detected() {
            return Vec::new();
        }
        match self {
            Self::Maximum if signals.only_timing_detected() => {
                vec![CounterMeasure::BlockDebuggerAttach]
            }
            Self::Maximum => vec![
                CounterMeasure::InjectMemoryNoise,
                CounterMeasure::BlockDebuggerAttach,
            ],
            Self::Enhanced => vec![CounterMeasure::BlockDebuggerAttach],
            Self::Normal => Vec::new(),
        }
    }
}

/// Combines the level's analysis signals, stopping at the first positive.
pub fn is_being_analyzed(level: SecurityLevel, collector: &dyn SignalCollector) -> bool {
    level
        .analysis_signals()
        .iter()
        .any(|signal| collector.collect(*signal))
}

/// Starting level after the initial probes.
pub fn initial_level(emulated: bool, hooked: bool) -> SecurityLevel {
    if emulated || hooked {
        SecurityLevel::Maximum
    } else {
        SecurityLevel::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_outside_one_to_three_are_rejected() {
        assert_eq!(SecurityLevel::from_raw(0), None);
        assert_eq!(SecurityLevel::from_raw(4), None);
        assert_eq!(SecurityLevel::from_raw(-1), None);
        assert_eq!(SecurityLevel::from_raw(2), Some(SecurityLevel::Enhanced));
        assert_eq!(SecurityLevel::Maximum.as_raw(), 3);
    }

    #[test]
    fn poll_interval_tightens_with_level() {
        assert_eq!(SecurityLevel::Maximum.poll_interval(), Duration::from_millis(100));
        assert_eq!(SecurityLevel::Enhanced.poll_interval(), Duration::from_millis(200));
        assert_eq!(SecurityLevel::Normal.poll_interval(), Duration::from_millis(300));
    }

    #[test]
    fn response_is_gated_by_level() {
        let mut traced = SignalSnapshot::default();
        traced.set(DetectionSignal::Traced, true);

        assert!(SecurityLevel::Normal.response_to(&traced).is_empty());
        assert_eq!(
            SecurityLevel::Enhanced.response_to(&traced),
            vec![CounterMeasure::BlockDebuggerAttach]
        );
        assert_eq!(
            SecurityLevel::Maximum.response_to(&traced),
            vec![
                CounterMeasure::InjectMemoryNoise,
                CounterMeasure::BlockDebuggerAttach
            ]
        );
        assert!(SecurityLevel::Maximum
            .response_to(&SignalSnapshot::default())
            .is_empty());
    }

    #[test]
    fn timing_alone_never_triggers_noise_injection() {
        let mut timing = SignalSnapshot::default();
        timing.set(DetectionSignal::Traced, false);
        timing.set(DetectionSignal::TimingAnomalous, true);
        assert_eq!(
            SecurityLevel::Maximum.response_to(&timing),
            vec![CounterMeasure::BlockDebuggerAttach]
        );
    }

    #[test]
    fn initial_level_escalates_on_emulator_or_hooks() {
        assert_eq!(initial_level(false, false), SecurityLevel::Normal);
        assert_eq!(initial_level(true, false), SecurityLevel::Maximum);
        assert_eq!(initial_level(false, true), SecurityLevel::Maximum);
    }
}
