//! The independent policy concerns.
//!
//! Each concern reads its slice of the [`PolicyBundle`](crate::PolicyBundle)
//! and plans zero or more declarations. Planning is pure: nothing here talks
//! to the provisioner or the network, the applicator does that.

pub mod drift;
pub mod outputs;
pub mod tags;
pub mod team;
pub mod ttl;

use crate::identity::StackIdentity;
use crate::resource::ResourceOptions;

/// What every concern needs to name and key its declarations.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    /// Name of the policy instance. Prefix of every derived name.
    pub instance: &'a str,
    pub identity: &'a StackIdentity,
    /// Options inherited by every declaration (parent, caller hints).
    pub options: &'a ResourceOptions,
}

impl Scope<'_> {
    pub fn name(&self, suffix: &str) -> String {
        format!("{}-{}", self.instance, suffix)
    }

    /// Start from `own` hints and fold in the inherited ones.
    pub fn options(&self, own: ResourceOptions) -> ResourceOptions {
        own.merged_with(self.options)
    }
}
