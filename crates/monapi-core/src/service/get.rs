//! The `get` pipeline: permission scope, query, related objects, shaping.

use super::assembler;
use super::{ApiService, NestedCalls};
use crate::catalog::EntityDescriptor;
use crate::error::Result;
use crate::query::QueryBuilder;
use crate::security::{Permission, PermissionFilter, UserContext};
use monapi_proto::{GetOptions, GetResult};
use tracing::debug;

impl<'a> ApiService<'a> {
    /// Run completed options against an entity.
    pub(super) fn run_get(
        &self,
        user: &UserContext,
        entity: &EntityDescriptor,
        options: &GetOptions,
        depth: usize,
    ) -> Result<GetResult> {
        let scope = PermissionFilter::new(self.config.in_chunk_size).scope(
            &entity.permission,
            user,
            Permission::requested(options.editable),
            options.no_permissions,
        );
        let plan = QueryBuilder::new(entity, self.config.in_chunk_size).build(options, &scope)?;
        debug!(entity = %entity.name, depth, sql = %plan.sql, "running get");

        let rows = self.store.select(&plan.sql)?;
        if options.count_output {
            return if options.group_count {
                Ok(GetResult::GroupCounts(rows))
            } else {
                assembler::count(&rows)
            };
        }

        let Some(pk) = entity.pk.as_deref() else {
            let mut rows: Vec<_> = rows.into_iter().map(|row| (0, row)).collect();
            assembler::strip(&mut rows, &plan.strip);
            return Ok(assembler::finish(rows, false));
        };

        let mut keyed = assembler::key_rows(rows, pk)?;
        if !keyed.is_empty() {
            let source = NestedCalls::new(self, user, depth);
            for resolver in &entity.resolvers {
                let Some(selection) = options.selection(resolver.option()) else {
                    continue;
                };
                debug!(entity = %entity.name, option = resolver.option(), "resolving related objects");
                resolver.resolve(&source, selection, &mut keyed)?;
            }
        }

        assembler::strip(&mut keyed, &plan.strip);
        Ok(assembler::finish(keyed, options.preserve_keys))
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::Catalog;
    use crate::security::UserContext;
    use crate::service::ApiService;
    use crate::storage::SqliteStore;
    use monapi_proto::{GetOptions, GetResult, Output, Value};
    use serde_json::json;

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.install_schema().unwrap();
        store
            .execute_batch(
                "INSERT INTO proxy (proxyid, name, operating_mode) VALUES (1, 'alpha', 0), (2, 'beta', 1);
                 INSERT INTO proxy_rtdata (proxyid, lastaccess, version, compatibility, state) VALUES (1, 100, 70000, 1, 2), (2, 0, 0, 0, 0);
                 INSERT INTO hosts (hostid, host, name, status, proxyid, flags) VALUES (10, 'web', 'web', 0, 1, 0), (11, 'db', 'db', 0, 1, 0);",
            )
            .unwrap();
        store
    }

    #[test]
    fn test_get_strips_internal_fields() {
        let store = store();
        let catalog = Catalog::standard();
        let service = ApiService::new(&catalog, &store);
        let admin = UserContext::super_admin(1);

        let result = service
            .get(
                &admin,
                "proxy",
                &json!({"output": ["name"], "sortfield": "name", "sortorder": "DESC"}),
            )
            .unwrap();
        let names = result.column("name");
        assert_eq!(names, vec![Value::from("beta"), Value::from("alpha")]);
        assert!(result.rows().iter().all(|row| row.len() == 1));
    }

    #[test]
    fn test_related_count_and_keys() {
        let store = store();
        let catalog = Catalog::standard();
        let service = ApiService::new(&catalog, &store);
        let admin = UserContext::super_admin(1);

        let options = GetOptions::new()
            .with_output(Output::fields(["name"]))
            .select("selectHosts", Output::Count)
            .preserve_keys();
        let result = service.get_with(&admin, "proxy", options).unwrap();
        assert_eq!(result.keys(), vec![1, 2]);
        assert_eq!(result.column("hosts"), vec![Value::Int(2), Value::Int(0)]);
    }

    #[test]
    fn test_count_ignores_limit() {
        let store = store();
        let catalog = Catalog::standard();
        let service = ApiService::new(&catalog, &store);
        let admin = UserContext::super_admin(1);

        let result = service
            .get(&admin, "proxy", &json!({"countOutput": true, "limit": 1}))
            .unwrap();
        assert_eq!(result, GetResult::Count(2));
    }
}
