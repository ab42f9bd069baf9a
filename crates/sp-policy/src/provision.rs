// provision.rs — The seam to the provisioning runtime.
//
// The runtime owns resource graphs, lifecycle and remote execution. The
// applicator only hands it declarations and keeps the returned handles.

use std::sync::{Mutex, MutexGuard};

use crate::error::{PolicyError, Result};
use crate::resource::{Declaration, ResourceHandle, ResourceKind};

/// Accepts declarations and returns handles to the declared entities.
///
/// Implementations must be shareable across tasks: deployment-settings
/// replication declares from a spawned task.
pub trait Provisioner: Send + Sync {
    fn declare(&self, declaration: Declaration) -> Result<ResourceHandle>;
}

/// Provisioner that records declarations in memory.
///
/// Used for dry-run planning and tests. Declaring the same (kind, name) twice
/// in one application is a naming collision and is rejected, the way the
/// real runtime rejects duplicate URNs.
#[derive(Debug, Default)]
pub struct RecordingProvisioner {
    declared: Mutex<Vec<Declaration>>,
}

impl RecordingProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything declared so far, in declaration order.
    pub fn declarations(&self) -> Vec<Declaration> {
        self.lock().clone()
    }

    pub fn of_kind(&self, kind: ResourceKind) -> Vec<Declaration> {
        self.lock()
            .iter()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Declaration>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.declared.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Provisioner for RecordingProvisioner {
    fn declare(&self, declaration: Declaration) -> Result<ResourceHandle> {
        let mut declared = self.lock();
        if declared
            .iter()
            .any(|d| d.kind == declaration.kind && d.name == declaration.name)
        {
            return Err(PolicyError::Provision {
                name: declaration.name,
                reason: "duplicate resource name".to_string(),
            });
        }
        let handle = ResourceHandle {
            kind: declaration.kind,
            name: declaration.name.clone(),
            urn: format!("urn:{}::{}", declaration.kind.type_token(), declaration.name),
        };
        tracing::debug!(kind = %declaration.kind, name = %declaration.name, "recorded declaration");
        declared.push(declaration);
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{CommandArgs, ResourceOptions};

    fn command(name: &str) -> Declaration {
        Declaration::new(
            ResourceKind::Command,
            name,
            &CommandArgs {
                create: "true".to_string(),
            },
            ResourceOptions::default(),
        )
    }

    #[test]
    fn records_in_order_and_returns_urn() {
        let provisioner = RecordingProvisioner::new();
        let first = provisioner.declare(command("a")).unwrap();
        provisioner.declare(command("b")).unwrap();

        assert_eq!(first.urn, "urn:command:local:Command::a");
        let names: Vec<_> = provisioner
            .declarations()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(provisioner.of_kind(ResourceKind::Command).len(), 2);
        assert!(provisioner.of_kind(ResourceKind::StackTag).is_empty());
    }

    #[test]
    fn duplicate_name_is_a_collision() {
        let provisioner = RecordingProvisioner::new();
        provisioner.declare(command("a")).unwrap();
        let err = provisioner.declare(command("a")).unwrap_err();
        assert!(matches!(err, PolicyError::Provision { ref name, .. } if name == "a"));
        assert_eq!(provisioner.len(), 1);
    }
}
