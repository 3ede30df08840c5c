//! API service: entry points for `get`, `create`, `update` and `delete`.
//!
//! Access rules are checked once per public call. Nested calls made by
//! related-object resolvers go through [`NestedCalls`], which skips them and
//! disables row permissions, since the parent rows already proved visibility.
//!
//! # Example
//!
//! ```
//! use monapi_core::{ApiService, Catalog, SqliteStore, UserContext};
//! use serde_json::json;
//!
//! let store = SqliteStore::open_in_memory().unwrap();
//! store.install_schema().unwrap();
//! let catalog = Catalog::standard();
//! let service = ApiService::new(&catalog, &store);
//! let admin = UserContext::super_admin(1);
//!
//! service
//!     .create(&admin, "proxy", &json!({"name": "edge"}))
//!     .unwrap();
//! let count = service
//!     .get(&admin, "proxy", &json!({"countOutput": true}))
//!     .unwrap();
//! assert_eq!(count.count(), Some(1));
//! ```

mod assembler;
mod get;
mod mutation;
mod validator;

pub use validator::{ChildSchema, FieldRule, InputSchema, RuleValidator, Validator};

use crate::catalog::{Catalog, EntityDescriptor};
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::options::OptionNormalizer;
use crate::query::Sql;
use crate::relation::RelatedSource;
use crate::security::{AuditSink, Method, NullAuditSink, UserContext};
use crate::storage::SqlExecutor;
use monapi_proto::{GetOptions, GetResult, Id, Row};
use serde_json::Value as Json;

/// Entry point for API calls against one store.
pub struct ApiService<'a> {
    catalog: &'a Catalog,
    store: &'a dyn SqlExecutor,
    audit: &'a dyn AuditSink,
    validator: &'a dyn Validator,
    config: ApiConfig,
}

impl<'a> ApiService<'a> {
    /// Create a service with default configuration, no audit trail and the
    /// built-in validator.
    pub fn new(catalog: &'a Catalog, store: &'a dyn SqlExecutor) -> Self {
        Self {
            catalog,
            store,
            audit: &NullAuditSink,
            validator: &RuleValidator,
            config: ApiConfig::default(),
        }
    }

    /// Record mutations to `audit`.
    pub fn with_audit(mut self, audit: &'a dyn AuditSink) -> Self {
        self.audit = audit;
        self
    }

    /// Replace the input validator.
    pub fn with_validator(mut self, validator: &'a dyn Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: ApiConfig) -> Self {
        self.config = config;
        self
    }

    /// The catalog this service serves.
    pub fn catalog(&self) -> &Catalog {
        self.catalog
    }

    /// The active configuration.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// `entity.get` with JSON options.
    pub fn get(&self, user: &UserContext, entity: &str, params: &Json) -> Result<GetResult> {
        let descriptor = self.authorize(user, entity, Method::Get)?;
        let options = OptionNormalizer::new(self.catalog).normalize(descriptor, params)?;
        self.run_get(user, descriptor, &options, 0)
    }

    /// `entity.get` with typed options.
    pub fn get_with(
        &self,
        user: &UserContext,
        entity: &str,
        options: GetOptions,
    ) -> Result<GetResult> {
        let descriptor = self.authorize(user, entity, Method::Get)?;
        let options = OptionNormalizer::new(self.catalog).complete(descriptor, options)?;
        self.run_get(user, descriptor, &options, 0)
    }

    /// Dispatch a `"entity.method"` call and serialize the result.
    pub fn call(&self, user: &UserContext, method: &str, params: &Json) -> Result<Json> {
        let (entity, name) = method
            .split_once('.')
            .ok_or_else(|| Error::invalid(format!("Incorrect method \"{}\".", method)))?;
        let method_kind = Method::parse(name)
            .ok_or_else(|| Error::invalid(format!("Incorrect method \"{}\".", method)))?;

        let json = match method_kind {
            Method::Get => serde_json::to_value(self.get(user, entity, params)?)?,
            Method::Create => serde_json::to_value(self.create(user, entity, params)?)?,
            Method::Update => serde_json::to_value(self.update(user, entity, params)?)?,
            Method::Delete => serde_json::to_value(self.delete(user, entity, params)?)?,
        };
        Ok(json)
    }

    fn authorize(&self, user: &UserContext, entity: &str, method: Method) -> Result<&'a EntityDescriptor> {
        let descriptor = self.catalog.entity(entity)?;
        descriptor.access.check(entity, method, user)?;
        Ok(descriptor)
    }

    /// Internal keyed lookup used by mutations: completes `options`, forces
    /// `preservekeys` and skips access rules.
    fn lookup(
        &self,
        user: &UserContext,
        entity: &EntityDescriptor,
        options: GetOptions,
    ) -> Result<Vec<(Id, Row)>> {
        let options = OptionNormalizer::new(self.catalog).complete(entity, options.preserve_keys())?;
        match self.run_get(user, entity, &options, 0)? {
            GetResult::Keyed(rows) => Ok(rows),
            other => Err(Error::internal(format!(
                "lookup on \"{}\" returned {} unkeyed rows",
                entity.name,
                other.len()
            ))),
        }
    }
}

/// [`RelatedSource`] for resolvers running inside one request.
pub struct NestedCalls<'s, 'a> {
    service: &'s ApiService<'a>,
    user: &'s UserContext,
    depth: usize,
}

impl<'s, 'a> NestedCalls<'s, 'a> {
    fn new(service: &'s ApiService<'a>, user: &'s UserContext, depth: usize) -> Self {
        Self {
            service,
            user,
            depth,
        }
    }
}

impl RelatedSource for NestedCalls<'_, '_> {
    fn get(&self, entity: &str, options: GetOptions) -> Result<GetResult> {
        if self.depth >= self.service.config.max_nesting_depth {
            return Err(Error::internal(format!(
                "related object nesting deeper than {} levels",
                self.service.config.max_nesting_depth
            )));
        }
        let descriptor = self.service.catalog.entity(entity)?;
        let options = OptionNormalizer::new(self.service.catalog).complete(descriptor, options)?;
        self.service
            .run_get(self.user, descriptor, &options, self.depth + 1)
    }

    fn select(&self, sql: &Sql) -> Result<Vec<Row>> {
        self.service.store.select(sql)
    }

    fn chunk_size(&self) -> usize {
        self.service.config.in_chunk_size
    }
}
