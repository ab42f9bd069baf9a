// drift.rs — Drift schedule planning.

use crate::bundle::{DriftManagement, DriftMode};
use crate::concerns::Scope;
use crate::config::DriftScheduling;
use crate::resource::{Declaration, DriftScheduleArgs, ResourceKind, ResourceOptions};

pub const SUFFIX: &str = "driftschedule";

/// Hourly, on the hour.
pub const DEFAULT_CRON: &str = "0 * * * *";

/// Decide whether to schedule drift runs and whether they remediate.
///
/// `None` means no schedule. Under [`DriftScheduling::Always`] a schedule
/// is always declared; it remediates when the setting is unset, `false` or
/// `Correct`, and only detects for `true` or `DetectOnly`.
pub fn auto_remediate(setting: Option<DriftManagement>, scheduling: DriftScheduling) -> Option<bool> {
    match (scheduling, setting) {
        (_, Some(DriftManagement::Mode(DriftMode::Correct))) => Some(true),
        (_, Some(DriftManagement::Mode(DriftMode::DetectOnly)))
        | (_, Some(DriftManagement::Enabled(true))) => Some(false),
        (DriftScheduling::OptIn, None | Some(DriftManagement::Enabled(false))) => None,
        (DriftScheduling::Always, None | Some(DriftManagement::Enabled(false))) => Some(true),
    }
}

pub fn plan(
    scope: &Scope<'_>,
    setting: Option<DriftManagement>,
    cron: Option<&str>,
    scheduling: DriftScheduling,
) -> Option<Declaration> {
    let auto_remediate = auto_remediate(setting, scheduling)?;
    let identity = scope.identity;
    let args = DriftScheduleArgs {
        organization: identity.organization.clone(),
        project: identity.project.clone(),
        stack: identity.stack.clone(),
        schedule_cron: cron.unwrap_or(DEFAULT_CRON).to_string(),
        auto_remediate,
    };
    Some(Declaration::new(
        ResourceKind::DriftSchedule,
        scope.name(SUFFIX),
        &args,
        scope.options(ResourceOptions::default()),
    ))
}
