//! Speed policy and tick-interval computation

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Absolute lower bound on the tick interval
pub const MIN_INTERVAL: Duration = Duration::from_millis(25);

/// Interval at 0% load (slowest gait)
pub const BASE_INTERVAL: Duration = Duration::from_millis(200);

/// Largest speed-up divisor, reached at 100% load
const MAX_DIVISOR: f64 = 20.0;

/// Interval under the adaptive policy for a CPU reading in percent
///
/// `200ms / clamp(cpu / 5, 1, 20)`, never below [`MIN_INTERVAL`].
#[must_use]
pub fn adaptive_interval(cpu_percent: f64) -> Duration {
    let cpu = if cpu_percent.is_finite() {
        cpu_percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let divisor = (cpu / 5.0).clamp(1.0, MAX_DIVISOR);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let micros = (BASE_INTERVAL.as_micros() as f64 / divisor).round() as u64;
    Duration::from_micros(micros).max(MIN_INTERVAL)
}

/// Fixed speed caps selectable from the menu
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeedCap {
    /// Gait of a 10% load
    Cpu10,
    /// Gait of a 20% load
    Cpu20,
    /// Gait of a 30% load
    Cpu30,
    /// Gait of a 40% load
    Cpu40,
}

impl SpeedCap {
    /// Every cap, in menu order
    pub const ALL: [SpeedCap; 4] = [
        SpeedCap::Cpu10,
        SpeedCap::Cpu20,
        SpeedCap::Cpu30,
        SpeedCap::Cpu40,
    ];

    /// Tick interval of this cap
    #[must_use]
    pub fn interval(self) -> Duration {
        match self {
            Self::Cpu10 => Duration::from_millis(100),
            Self::Cpu20 => Duration::from_millis(50),
            Self::Cpu30 => Duration::from_millis(33),
            Self::Cpu40 => Duration::from_millis(25),
        }
    }
}

/// How the engine chooses its tick interval
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SpeedPolicy {
    /// Follow the most recent CPU reading
    #[default]
    Adaptive,
    /// A fixed cap, independent of load
    Fixed(SpeedCap),
}

impl SpeedPolicy {
    /// Every policy, in menu order
    pub const ALL: [SpeedPolicy; 5] = [
        SpeedPolicy::Adaptive,
        SpeedPolicy::Fixed(SpeedCap::Cpu10),
        SpeedPolicy::Fixed(SpeedCap::Cpu20),
        SpeedPolicy::Fixed(SpeedCap::Cpu30),
        SpeedPolicy::Fixed(SpeedCap::Cpu40),
    ];

    /// Tick interval under this policy given the last CPU reading
    #[must_use]
    pub fn interval(self, last_cpu_percent: f64) -> Duration {
        match self {
            Self::Adaptive => adaptive_interval(last_cpu_percent),
            Self::Fixed(cap) => cap.interval().max(MIN_INTERVAL),
        }
    }

    /// Identifier used in settings files
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Adaptive => "default",
            Self::Fixed(SpeedCap::Cpu10) => "cpu10",
            Self::Fixed(SpeedCap::Cpu20) => "cpu20",
            Self::Fixed(SpeedCap::Cpu30) => "cpu30",
            Self::Fixed(SpeedCap::Cpu40) => "cpu40",
        }
    }

    /// Menu label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Adaptive => "Default",
            Self::Fixed(SpeedCap::Cpu10) => "CPU 10%",
            Self::Fixed(SpeedCap::Cpu20) => "CPU 20%",
            Self::Fixed(SpeedCap::Cpu30) => "CPU 30%",
            Self::Fixed(SpeedCap::Cpu40) => "CPU 40%",
        }
    }
}

impl fmt::Display for SpeedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpeedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" | "adaptive" => Ok(Self::Adaptive),
            "cpu10" => Ok(Self::Fixed(SpeedCap::Cpu10)),
            "cpu20" => Ok(Self::Fixed(SpeedCap::Cpu20)),
            "cpu30" => Ok(Self::Fixed(SpeedCap::Cpu30)),
            "cpu40" => Ok(Self::Fixed(SpeedCap::Cpu40)),
            other => Err(format!("unknown speed limit: {other}")),
        }
    }
}

impl TryFrom<String> for SpeedPolicy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SpeedPolicy> for String {
    fn from(policy: SpeedPolicy) -> Self {
        policy.as_str().to_string()
    }
}
