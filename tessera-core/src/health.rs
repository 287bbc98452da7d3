//! Tier health reporting
//!
//! Health checks never affect request handling: an unhealthy tier only means
//! reads degrade to misses. These types exist for operators and probes.

use crate::Tier;
use serde::{Deserialize, Serialize};

/// Health status for a cache tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Tier answered the probe
    Healthy,
    /// Tier did not answer; cache reads fall through to the system of record
    Unhealthy,
}

/// Health probe result for a single tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierHealth {
    /// Probe outcome
    pub status: HealthStatus,
    /// Tier that was probed
    pub tier: Tier,
    /// Failure detail, if any
    pub message: Option<String>,
    /// Probe round-trip in milliseconds
    pub response_time_ms: Option<u64>,
}

impl TierHealth {
    /// Create a healthy probe result.
    pub fn healthy(tier: Tier) -> Self {
        Self {
            status: HealthStatus::Healthy,
            tier,
            message: None,
            response_time_ms: None,
        }
    }

    /// Create an unhealthy probe result.
    pub fn unhealthy(tier: Tier, message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            tier,
            message: Some(message.into()),
            response_time_ms: None,
        }
    }

    /// Set the response time.
    pub fn with_response_time(mut self, ms: u64) -> Self {
        self.response_time_ms = Some(ms);
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
