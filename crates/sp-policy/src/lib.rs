//! # sp-policy
//!
//! Stack policy applicator.
//!
//! Applies a declarative [`PolicyBundle`] to one deployed stack by issuing
//! declarations to a [`Provisioner`]: TTL expiry, drift scheduling, team
//! access, tags, output advertisement, and replication of deployment
//! settings from a template stack.
//!
//! ## Key invariants
//!
//! - **Deterministic names**: every declaration is named from the policy
//!   instance name plus a fixed suffix (and the tag key/value for tags), so
//!   re-applying converges instead of duplicating.
//! - **Review stacks are left alone**: stacks whose name contains
//!   `<prefix>-<org>-<project>` never get settings replicated.
//! - **Replication never blocks**: it runs on a detached task; the other
//!   concerns are declared without waiting for it.
//! - **TTL timestamps** are UTC, whole seconds, `Z`-suffixed.

pub mod applicator;
pub mod bundle;
pub mod concerns;
pub mod config;
pub mod error;
pub mod identity;
pub mod legacy;
pub mod provision;
pub mod replication;
pub mod resource;
pub mod settings;

pub use applicator::{AppliedPolicy, PolicyApplicator, COMPONENT_TYPE};
pub use bundle::{DriftManagement, DriftMode, PolicyBundle};
pub use config::{ApplicatorConfig, DriftScheduling, ReplicationFailure};
pub use error::{PolicyError, Result};
pub use identity::{AccessToken, ExecutionContext, StackIdentity, MISSING_TOKEN_SENTINEL};
pub use legacy::{CommandCachePatch, LegacyCachePatch};
pub use provision::{Provisioner, RecordingProvisioner};
pub use replication::{ReplicationOutcome, ReplicationTask};
pub use resource::{Declaration, ResourceHandle, ResourceKind, ResourceOptions};
pub use settings::{DeploymentSettingsDocument, SettingsSource};
