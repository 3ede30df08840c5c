//! Row-level permission scoping.
//!
//! A [`PermissionStrategy`] is declared per entity. At read time
//! [`PermissionFilter::scope`] turns it into a [`PermissionScope`]: no
//! restriction, a predicate injected into the query, or an empty result.
//! Read-time scoping never raises.

use super::context::UserContext;
use crate::query::{condition_int, CompareOp, Predicate, SubQuery};

/// Permission level stored in `rights.permission` and share rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Permission {
    /// Access denied.
    Deny,
    /// Read-only.
    Read,
    /// Read-write.
    ReadWrite,
}

impl Permission {
    /// Stored value (0, 2, 3).
    pub fn value(self) -> i64 {
        match self {
            Permission::Deny => 0,
            Permission::Read => 2,
            Permission::ReadWrite => 3,
        }
    }

    /// Level requested by a `get` call.
    pub fn requested(editable: bool) -> Self {
        if editable {
            Permission::ReadWrite
        } else {
            Permission::Read
        }
    }
}

/// One step from the base row towards `hosts_groups`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    /// Table name.
    pub table: String,
    /// Alias, unique within the permission subquery.
    pub alias: String,
    /// Column matched against the previous step.
    pub key: String,
    /// Column carried to the next step.
    pub next: String,
}

impl Hop {
    /// Create a hop.
    pub fn new(
        table: impl Into<String>,
        alias: impl Into<String>,
        key: impl Into<String>,
        next: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            key: key.into(),
            next: next.into(),
        }
    }
}

/// Path from a base row to the host ids whose groups decide visibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPath {
    /// Qualified base column.
    pub base_column: String,
    /// Steps ending at a column holding host ids; empty when the base column
    /// already holds host ids.
    pub hops: Vec<Hop>,
}

impl HostPath {
    /// The base column holds host ids.
    pub fn direct(base_column: impl Into<String>) -> Self {
        Self {
            base_column: base_column.into(),
            hops: Vec::new(),
        }
    }

    /// Add a hop.
    pub fn via(mut self, hop: Hop) -> Self {
        self.hops.push(hop);
        self
    }
}

/// Whose membership a [`Membership`] strategy matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberScope {
    /// Link rows whose match column is the caller's user id.
    Caller,
    /// Link rows whose match column is one of the caller's groups.
    CallerGroups,
}

/// Visibility through a membership link table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    /// Qualified base column.
    pub base_column: String,
    /// Link table.
    pub table: String,
    /// Link alias.
    pub alias: String,
    /// Link column compared with the base column.
    pub select_column: String,
    /// Link column compared with the caller.
    pub match_column: String,
    /// Whose membership counts.
    pub scope: MemberScope,
    /// Also admit the row equal to the caller's own id.
    pub include_self: bool,
}

/// Visibility of map-owned rows through map sharing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSharing {
    /// Qualified base column holding the map id.
    pub base_column: String,
}

/// Per-entity permission strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionStrategy {
    /// Every caller that passed the access rule sees every row.
    Unrestricted,
    /// Host group rights aggregated over the hosts reached by the path.
    HostGroups(HostPath),
    /// Host group rights on the base row itself (host groups).
    GroupRights {
        /// Qualified base column holding the host group id.
        column: String,
    },
    /// Restricted to rows linked to the caller; never editable.
    Membership(Membership),
    /// Readable by all; write access for super administrators only.
    SuperAdminWrite,
    /// Public, owned or shared maps.
    Sharing(MapSharing),
}

/// Result of permission scoping.
#[derive(Debug, Clone, PartialEq)]
pub enum PermissionScope {
    /// No restriction.
    Unrestricted,
    /// Rows must satisfy the predicate.
    Restricted(Predicate),
    /// No row is visible at the requested level.
    RejectAll,
}

/// Builds permission scopes.
pub struct PermissionFilter {
    chunk_size: usize,
}

impl PermissionFilter {
    /// Create a filter rendering id sets in blocks of `chunk_size`.
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    /// Scope for `user` at `level` under `strategy`.
    pub fn scope(
        &self,
        strategy: &PermissionStrategy,
        user: &UserContext,
        level: Permission,
        no_permissions: bool,
    ) -> PermissionScope {
        if user.is_super_admin() || no_permissions {
            return PermissionScope::Unrestricted;
        }

        match strategy {
            PermissionStrategy::Unrestricted => PermissionScope::Unrestricted,
            PermissionStrategy::HostGroups(path) => {
                PermissionScope::Restricted(self.host_groups(path, user, level))
            }
            PermissionStrategy::GroupRights { column } => {
                PermissionScope::Restricted(self.group_rights(column, user, level))
            }
            PermissionStrategy::Membership(membership) => {
                if level == Permission::ReadWrite {
                    PermissionScope::RejectAll
                } else {
                    PermissionScope::Restricted(self.membership(membership, user))
                }
            }
            PermissionStrategy::SuperAdminWrite => {
                if level == Permission::ReadWrite {
                    PermissionScope::RejectAll
                } else {
                    PermissionScope::Unrestricted
                }
            }
            PermissionStrategy::Sharing(sharing) => {
                PermissionScope::Restricted(self.map_sharing(sharing, user, level))
            }
        }
    }

    /// Deny anywhere in the linked groups blocks the row; at least one group
    /// must grant the requested level.
    fn rights_having(level: Permission) -> Predicate {
        Predicate::and(vec![
            Predicate::int("MIN(r.permission)", CompareOp::Gt, Permission::Deny.value()),
            Predicate::int("MAX(r.permission)", CompareOp::Ge, level.value()),
        ])
    }

    /// A host denied or lacking rights for the caller fails the row.
    fn rights_missing(level: Permission) -> Predicate {
        Predicate::or(vec![
            Predicate::int("MAX(r.permission)", CompareOp::Lt, level.value()),
            Predicate::is_null("MIN(r.permission)"),
            Predicate::int("MIN(r.permission)", CompareOp::Eq, Permission::Deny.value()),
        ])
    }

    fn host_groups(&self, path: &HostPath, user: &UserContext, level: Permission) -> Predicate {
        let rights_on = Predicate::and(vec![
            Predicate::columns_eq("r.id", "hgg.groupid"),
            condition_int("r.groupid", &user.group_values(), false, self.chunk_size),
        ]);

        let mut from = Vec::with_capacity(path.hops.len() + 1);
        let mut links = Vec::with_capacity(path.hops.len() + 1);
        let mut previous = path.base_column.clone();
        for hop in &path.hops {
            from.push(format!("{} {}", hop.table, hop.alias));
            links.push(Predicate::columns_eq(
                previous,
                format!("{}.{}", hop.alias, hop.key),
            ));
            previous = format!("{}.{}", hop.alias, hop.next);
        }
        links.push(Predicate::columns_eq(previous.as_str(), "hgg.hostid"));
        from.push("hosts_groups hgg".to_string());

        let subquery = || {
            let mut query = SubQuery::select("NULL", from[0].as_str());
            for entry in &from[1..] {
                query = query.from(entry.as_str());
            }
            query
        };

        let Some(first) = path.hops.first() else {
            return Predicate::exists(
                subquery()
                    .join("rights", "r", rights_on)
                    .filter(Predicate::and(links))
                    .group_by("hgg.hostid")
                    .having(Self::rights_having(level)),
            );
        };

        // Every host reached through the hops must pass on its own.
        let granted = Predicate::exists(
            subquery()
                .join("rights", "r", rights_on.clone())
                .filter(Predicate::and(links.clone()))
                .group_by(format!("{}.{}", first.alias, first.key))
                .having(Self::rights_having(level)),
        );
        let missing = Predicate::exists(
            subquery()
                .left_join("rights", "r", rights_on)
                .filter(Predicate::and(links))
                .group_by(previous)
                .having(Self::rights_missing(level)),
        );
        Predicate::and(vec![granted, missing.negate()])
    }

    fn group_rights(&self, column: &str, user: &UserContext, level: Permission) -> Predicate {
        Predicate::exists(
            SubQuery::select("NULL", "rights r")
                .filter(Predicate::and(vec![
                    Predicate::columns_eq(column, "r.id"),
                    condition_int("r.groupid", &user.group_values(), false, self.chunk_size),
                ]))
                .group_by("r.id")
                .having(Self::rights_having(level)),
        )
    }

    fn membership(&self, membership: &Membership, user: &UserContext) -> Predicate {
        let matched = format!("{}.{}", membership.alias, membership.match_column);
        let caller = match membership.scope {
            MemberScope::Caller => Predicate::int(matched, CompareOp::Eq, user.user_id as i64),
            MemberScope::CallerGroups => {
                condition_int(&matched, &user.group_values(), false, self.chunk_size)
            }
        };
        let linked = Predicate::InSubquery {
            column: membership.base_column.clone(),
            query: Box::new(
                SubQuery::select(
                    format!("{}.{}", membership.alias, membership.select_column),
                    format!("{} {}", membership.table, membership.alias),
                )
                .filter(caller),
            ),
        };

        if membership.include_self {
            Predicate::or(vec![
                Predicate::int(
                    membership.base_column.as_str(),
                    CompareOp::Eq,
                    user.user_id as i64,
                ),
                linked,
            ])
        } else {
            linked
        }
    }

    fn map_sharing(&self, sharing: &MapSharing, user: &UserContext, level: Permission) -> Predicate {
        let user_id = user.user_id as i64;
        let mut grants = vec![Predicate::int("m.userid", CompareOp::Eq, user_id)];
        if level == Permission::Read {
            grants.push(Predicate::int("m.private", CompareOp::Eq, 0));
        }
        grants.push(Predicate::exists(
            SubQuery::select("NULL", "sysmap_user mu").filter(Predicate::and(vec![
                Predicate::columns_eq("m.sysmapid", "mu.sysmapid"),
                Predicate::int("mu.userid", CompareOp::Eq, user_id),
                Predicate::int("mu.permission", CompareOp::Ge, level.value()),
            ])),
        ));
        grants.push(Predicate::exists(
            SubQuery::select("NULL", "sysmap_usrgrp mug").filter(Predicate::and(vec![
                Predicate::columns_eq("m.sysmapid", "mug.sysmapid"),
                condition_int("mug.usrgrpid", &user.group_values(), false, self.chunk_size),
                Predicate::int("mug.permission", CompareOp::Ge, level.value()),
            ])),
        ));

        Predicate::exists(SubQuery::select("NULL", "sysmaps m").filter(Predicate::and(vec![
            Predicate::columns_eq("m.sysmapid", sharing.base_column.as_str()),
            Predicate::or(grants),
        ])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::render_predicate;
    use crate::security::UserRole;

    fn user() -> UserContext {
        UserContext::new(5, UserRole::Admin).with_groups([7])
    }

    #[test]
    fn test_super_admin_and_nopermissions_are_unrestricted() {
        let filter = PermissionFilter::new(950);
        let strategy = PermissionStrategy::HostGroups(HostPath::direct("a.hostid"));
        assert_eq!(
            filter.scope(&strategy, &UserContext::super_admin(1), Permission::ReadWrite, false),
            PermissionScope::Unrestricted
        );
        assert_eq!(
            filter.scope(&strategy, &user(), Permission::ReadWrite, true),
            PermissionScope::Unrestricted
        );
    }

    #[test]
    fn test_host_groups_direct() {
        let filter = PermissionFilter::new(950);
        let strategy = PermissionStrategy::HostGroups(HostPath::direct("a.hostid"));
        let PermissionScope::Restricted(predicate) =
            filter.scope(&strategy, &user(), Permission::Read, false)
        else {
            panic!("expected a restriction");
        };
        assert_eq!(
            render_predicate(&predicate).text,
            "EXISTS (SELECT NULL FROM hosts_groups hgg JOIN rights r ON r.id=hgg.groupid \
             AND r.groupid=7 WHERE a.hostid=hgg.hostid GROUP BY hgg.hostid \
             HAVING MIN(r.permission)>0 AND MAX(r.permission)>=2)"
        );
    }

    #[test]
    fn test_host_groups_through_hops() {
        let filter = PermissionFilter::new(950);
        let path = HostPath::direct("p.objectid")
            .via(Hop::new("functions", "f", "triggerid", "itemid"))
            .via(Hop::new("items", "fi", "itemid", "hostid"));
        let PermissionScope::Restricted(predicate) = filter.scope(
            &PermissionStrategy::HostGroups(path),
            &user(),
            Permission::ReadWrite,
            false,
        ) else {
            panic!("expected a restriction");
        };
        assert_eq!(
            render_predicate(&predicate).text,
            "EXISTS (SELECT NULL FROM functions f,items fi,hosts_groups hgg JOIN rights r \
             ON r.id=hgg.groupid AND r.groupid=7 WHERE p.objectid=f.triggerid \
             AND f.itemid=fi.itemid AND fi.hostid=hgg.hostid GROUP BY f.triggerid \
             HAVING MIN(r.permission)>0 AND MAX(r.permission)>=3) \
             AND NOT (EXISTS (SELECT NULL FROM functions f,items fi,hosts_groups hgg \
             LEFT JOIN rights r ON r.id=hgg.groupid AND r.groupid=7 \
             WHERE p.objectid=f.triggerid AND f.itemid=fi.itemid AND fi.hostid=hgg.hostid \
             GROUP BY fi.hostid HAVING (MAX(r.permission)<3 OR MIN(r.permission) IS NULL \
             OR MIN(r.permission)=0)))"
        );
    }

    #[test]
    fn test_no_groups_sees_nothing() {
        let filter = PermissionFilter::new(950);
        let lonely = UserContext::new(9, UserRole::User);
        let PermissionScope::Restricted(predicate) = filter.scope(
            &PermissionStrategy::HostGroups(HostPath::direct("h.hostid")),
            &lonely,
            Permission::Read,
            false,
        ) else {
            panic!("expected a restriction");
        };
        assert!(render_predicate(&predicate).text.contains("JOIN rights r ON 1=0"));
    }

    #[test]
    fn test_write_restricted_strategies_reject_editable() {
        let filter = PermissionFilter::new(950);
        assert_eq!(
            filter.scope(&PermissionStrategy::SuperAdminWrite, &user(), Permission::ReadWrite, false),
            PermissionScope::RejectAll
        );
        assert_eq!(
            filter.scope(&PermissionStrategy::SuperAdminWrite, &user(), Permission::Read, false),
            PermissionScope::Unrestricted
        );
    }

    #[test]
    fn test_membership() {
        let filter = PermissionFilter::new(950);
        let strategy = PermissionStrategy::Membership(Membership {
            base_column: "g.usrgrpid".into(),
            table: "users_groups".into(),
            alias: "uug".into(),
            select_column: "usrgrpid".into(),
            match_column: "userid".into(),
            scope: MemberScope::Caller,
            include_self: false,
        });
        let PermissionScope::Restricted(predicate) =
            filter.scope(&strategy, &user(), Permission::Read, false)
        else {
            panic!("expected a restriction");
        };
        assert_eq!(
            render_predicate(&predicate).text,
            "g.usrgrpid IN (SELECT uug.usrgrpid FROM users_groups uug WHERE uug.userid=5)"
        );
        assert_eq!(
            filter.scope(&strategy, &user(), Permission::ReadWrite, false),
            PermissionScope::RejectAll
        );
    }

    #[test]
    fn test_map_sharing_editable_drops_public_maps() {
        let filter = PermissionFilter::new(950);
        let strategy = PermissionStrategy::Sharing(MapSharing {
            base_column: "se.sysmapid".into(),
        });
        let read = filter.scope(&strategy, &user(), Permission::Read, false);
        let write = filter.scope(&strategy, &user(), Permission::ReadWrite, false);
        let (PermissionScope::Restricted(read), PermissionScope::Restricted(write)) = (read, write)
        else {
            panic!("expected restrictions");
        };
        assert!(render_predicate(&read).text.contains("m.private=0"));
        assert!(!render_predicate(&write).text.contains("m.private=0"));
    }
}
