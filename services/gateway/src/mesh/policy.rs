//! ACL policy synchronization.
//!
//! # Purpose
//! Keeps the mesh-control service's access policy consistent with the set of
//! known realms: each realm gets exactly one `accept` rule permitting its
//! namespace to reach only itself.
//!
//! # Key invariants
//! - Adding a realm that already has a rule is a no-op.
//! - The read-modify-write cycle is serialized by a single mutex: two
//!   concurrent logins appending to a stale read would silently drop one
//!   rule. Policy writes are rare relative to logins, so the coarse lock is
//!   the correct tradeoff here.
use meshgate_mesh::{AclPolicy, AclRule, MeshControl, MeshResult};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct AclSync {
    mesh: Arc<dyn MeshControl>,
    write_lock: Mutex<()>,
}

impl AclSync {
    pub fn new(mesh: Arc<dyn MeshControl>) -> Self {
        Self {
            mesh,
            write_lock: Mutex::new(()),
        }
    }

    /// Ensure the policy contains the isolation rule for `namespace`.
    pub async fn add_realm_to_policy(&self, namespace: &str) -> MeshResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut policy = self.mesh.get_policy().await?;
        if policy.has_rule_for(namespace) {
            return Ok(());
        }
        policy.acls.push(AclRule::isolate(namespace));
        self.mesh.put_policy(&policy).await?;
        metrics::counter!("meshgate_acl_syncs_total").increment(1);
        tracing::info!(namespace, "added realm to mesh acl policy");
        Ok(())
    }

    /// Replace the policy with an empty rule set (initialization only).
    pub async fn set_empty_policy(&self) -> MeshResult<()> {
        let _guard = self.write_lock.lock().await;
        self.mesh.put_policy(&AclPolicy::default()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::testing::FakeMesh;

    #[tokio::test]
    async fn adding_a_realm_twice_yields_one_rule() {
        let mesh = Arc::new(FakeMesh::default());
        let sync = AclSync::new(mesh.clone());

        sync.add_realm_to_policy("r-abc").await.expect("first");
        sync.add_realm_to_policy("r-abc").await.expect("second");

        let policy = mesh.policy_snapshot();
        let matching: Vec<_> = policy
            .acls
            .iter()
            .filter(|rule| rule.src == vec!["r-abc".to_string()])
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].dst, vec!["r-abc:*".to_string()]);
    }

    #[tokio::test]
    async fn concurrent_adds_do_not_drop_rules() {
        let mesh = Arc::new(FakeMesh::default());
        let sync = Arc::new(AclSync::new(mesh.clone()));

        let mut handles = Vec::new();
        for i in 0..16 {
            let sync = sync.clone();
            handles.push(tokio::spawn(async move {
                sync.add_realm_to_policy(&format!("r-{i}")).await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("sync");
        }

        let policy = mesh.policy_snapshot();
        assert_eq!(policy.acls.len(), 16);
        for i in 0..16 {
            assert!(policy.has_rule_for(&format!("r-{i}")));
        }
    }

    #[tokio::test]
    async fn write_failures_surface() {
        let mesh = Arc::new(FakeMesh::default());
        mesh.fail_policy_writes
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let sync = AclSync::new(mesh);
        assert!(sync.add_realm_to_policy("r-abc").await.is_err());
    }

    #[tokio::test]
    async fn set_empty_policy_clears_rules() {
        let mesh = Arc::new(FakeMesh::default());
        let sync = AclSync::new(mesh.clone());
        sync.add_realm_to_policy("r-abc").await.expect("add");
        sync.set_empty_policy().await.expect("clear");
        assert!(mesh.policy_snapshot().acls.is_empty());
    }
}
