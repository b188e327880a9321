//! Traffic levels and emergency service types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TravelError;

// ── TrafficLevel ──────────────────────────────────────────────────────────────

/// Congestion applied on top of free-flow driving time.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl TrafficLevel {
    /// Multiplier on free-flow travel seconds.
    #[inline]
    pub fn factor(self) -> f64 {
        match self {
            TrafficLevel::Low    => 1.0,
            TrafficLevel::Medium => 1.3,
            TrafficLevel::High   => 1.8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TrafficLevel::Low    => "low",
            TrafficLevel::Medium => "medium",
            TrafficLevel::High   => "high",
        }
    }
}

impl FromStr for TrafficLevel {
    type Err = TravelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low"    => Ok(TrafficLevel::Low),
            "medium" => Ok(TrafficLevel::Medium),
            "high"   => Ok(TrafficLevel::High),
            _        => Err(TravelError::UnknownTrafficLevel(s.to_owned())),
        }
    }
}

impl fmt::Display for TrafficLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ── ServiceType ───────────────────────────────────────────────────────────────

/// Emergency service responding from a station to an address.
///
/// | Service  | Speed factor | Preparation |
/// |----------|--------------|-------------|
/// | hospital | 0.90         | 60 s        |
/// | fire     | 0.85         | 90 s        |
/// | police   | 0.80         | 30 s        |
///
/// A lower speed factor means less time on the road, so police drive
/// fastest.  Total response time also depends on preparation, so no
/// ordering between services holds in general.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Hospital,
    Fire,
    Police,
}

impl ServiceType {
    /// Multiplier on road travel seconds.
    #[inline]
    pub fn speed_factor(self) -> f64 {
        match self {
            ServiceType::Hospital => 0.9,
            ServiceType::Fire     => 0.85,
            ServiceType::Police   => 0.8,
        }
    }

    /// Dispatch and turnout time before the vehicle moves.
    #[inline]
    pub fn preparation_secs(self) -> f64 {
        match self {
            ServiceType::Hospital => 60.0,
            ServiceType::Fire     => 90.0,
            ServiceType::Police   => 30.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::Hospital => "hospital",
            ServiceType::Fire     => "fire",
            ServiceType::Police   => "police",
        }
    }
}

impl FromStr for ServiceType {
    type Err = TravelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hospital" | "ambulance" => Ok(ServiceType::Hospital),
            "fire"                   => Ok(ServiceType::Fire),
            "police"                 => Ok(ServiceType::Police),
            _                        => Err(TravelError::UnknownServiceType(s.to_owned())),
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
