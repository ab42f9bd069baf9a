// bundle.rs — User-supplied policy options.
//
// Every field is independently optional. Absence means "leave this concern
// alone", except TTL, which the applicator may default (see config).

use std::collections::BTreeMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Remediation mode requested by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriftMode {
    /// Detect drift and correct it automatically.
    Correct,
    /// Detect drift, report it, leave the stack untouched.
    DetectOnly,
}

/// `driftManagement` accepts either a boolean or a [`DriftMode`] name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DriftManagement {
    Enabled(bool),
    Mode(DriftMode),
}

impl From<bool> for DriftManagement {
    fn from(enabled: bool) -> Self {
        DriftManagement::Enabled(enabled)
    }
}

impl From<DriftMode> for DriftManagement {
    fn from(mode: DriftMode) -> Self {
        DriftManagement::Mode(mode)
    }
}

/// The options bundle a policy instance is constructed with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyBundle {
    /// Stack lifetime in hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_hours: Option<u32>,

    /// Stack lifetime in minutes. Takes precedence over `ttl_hours`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_minutes: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drift_management: Option<DriftManagement>,

    /// Cron override for the drift schedule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drift_schedule_cron: Option<String>,

    /// Team granted admin on the stack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_assignment: Option<String>,

    /// Output names advertised through an environment document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_outputs: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_tags: Option<BTreeMap<String, String>>,

    /// Raw JSON merged over the replicated deployment settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_settings_override: Option<serde_json::Value>,
}

impl PolicyBundle {
    /// The requested lifetime normalized to a single duration, if any.
    pub fn ttl(&self) -> Option<Duration> {
        match (self.ttl_hours, self.ttl_minutes) {
            (Some(hours), Some(minutes)) => {
                tracing::warn!(
                    ttl_hours = hours,
                    ttl_minutes = minutes,
                    "both ttlHours and ttlMinutes set, using ttlMinutes"
                );
                Some(Duration::minutes(i64::from(minutes)))
            }
            (None, Some(minutes)) => Some(Duration::minutes(i64::from(minutes))),
            (Some(hours), None) => Some(Duration::hours(i64::from(hours))),
            (None, None) => None,
        }
    }
}
