//! Caller identity, method access rules, row-level permission scoping and
//! audit records.

mod access;
mod audit;
mod context;
mod permission;

pub use access::{AccessRules, Method};
pub use audit::{
    AuditAction, AuditRecord, AuditSink, MemoryAuditSink, NullAuditSink, TracingAuditSink,
};
pub use context::{UserContext, UserRole};
pub use permission::{
    Hop, HostPath, MapSharing, MemberScope, Membership, Permission, PermissionFilter,
    PermissionScope, PermissionStrategy,
};
