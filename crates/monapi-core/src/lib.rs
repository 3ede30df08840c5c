//! monapi core - permission-scoped query composition and related-object
//! aggregation for monitoring API services.
//!
//! A `get` call flows through four stages: options are normalized against
//! the entity catalog, a permission scope is derived from the caller, the
//! query builder renders one SELECT, and resolvers attach related objects to
//! the permission-filtered rows. Mutations reuse the same pipeline to find
//! their targets and run inside one transaction with an audit record.

pub mod catalog;
pub mod config;
pub mod entities;
pub mod error;
pub mod options;
pub mod query;
pub mod relation;
pub mod security;
pub mod service;
pub mod storage;

pub use catalog::{Catalog, EntityDescriptor, FieldDef, FieldType};
pub use config::ApiConfig;
pub use error::{Error, Result};
pub use options::OptionNormalizer;
pub use query::{QueryBuilder, Sql};
pub use relation::{RelatedResolver, RelatedSource, RelationMap};
pub use security::{
    AccessRules, AuditAction, AuditRecord, AuditSink, MemoryAuditSink, Method, NullAuditSink,
    Permission, PermissionFilter, PermissionScope, PermissionStrategy, TracingAuditSink,
    UserContext, UserRole,
};
pub use service::{ApiService, InputSchema, RuleValidator, Validator};
pub use storage::{SqlExecutor, SqliteStore};

/// Re-export protocol types.
pub use monapi_proto as proto;
