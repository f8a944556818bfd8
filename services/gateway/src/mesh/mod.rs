//! Mesh-control orchestration.
//!
//! # Purpose
//! The realm manager (identity -> isolated namespace) and the ACL policy
//! synchronizer, both layered over the [`meshgate_mesh::MeshControl`] client.
pub mod policy;
pub mod realm;

pub use policy::AclSync;
pub use realm::{RealmError, RealmManager};
