// ttl.rs — TTL schedule planning.
//
// The expiry is absolute (now + ttl) and rendered at whole-second precision
// with a literal `Z`. The timestamp is excluded from change detection so the
// schedule set on first application is not pushed forward on every run.

use chrono::{DateTime, Duration, Utc};

use crate::concerns::Scope;
use crate::resource::{Declaration, ResourceKind, ResourceOptions, TtlScheduleArgs};

pub const SUFFIX: &str = "ttlschedule";

/// Format accepted by the TTL schedule API.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// `now + ttl` as `YYYY-MM-DDTHH:MM:SSZ`. Saturates at the latest
/// representable instant.
pub fn expiration_timestamp(now: DateTime<Utc>, ttl: Duration) -> String {
    now.checked_add_signed(ttl)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Plan the TTL schedule. `ttl` is the bundle's request; `default` is used
/// when the bundle has none. Both absent means no schedule.
pub fn plan(
    scope: &Scope<'_>,
    ttl: Option<Duration>,
    default: Option<Duration>,
    now: DateTime<Utc>,
) -> Option<Declaration> {
    let ttl = ttl.or(default)?;
    let identity = scope.identity;
    let args = TtlScheduleArgs {
        organization: identity.organization.clone(),
        project: identity.project.clone(),
        stack: identity.stack.clone(),
        timestamp: expiration_timestamp(now, ttl),
        delete_after_destroy: false,
    };
    Some(Declaration::new(
        ResourceKind::TtlSchedule,
        scope.name(SUFFIX),
        &args,
        scope.options(ResourceOptions::default().ignore_changes("timestamp")),
    ))
}
