//! Caller identity passed explicitly through every call.

use monapi_proto::Id;

/// User type, ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UserRole {
    /// Regular user.
    User,
    /// Administrator.
    Admin,
    /// Super administrator; bypasses row-level scoping.
    SuperAdmin,
}

impl UserRole {
    /// Decode the stored user type (1, 2, 3).
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(UserRole::User),
            2 => Some(UserRole::Admin),
            3 => Some(UserRole::SuperAdmin),
            _ => None,
        }
    }

    /// Stored user type.
    pub fn code(self) -> i64 {
        match self {
            UserRole::User => 1,
            UserRole::Admin => 2,
            UserRole::SuperAdmin => 3,
        }
    }
}

/// The caller of an API operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    /// User id.
    pub user_id: Id,
    /// User type.
    pub role: UserRole,
    /// User groups the caller belongs to.
    pub group_ids: Vec<Id>,
}

impl UserContext {
    /// Create a context without group memberships.
    pub fn new(user_id: Id, role: UserRole) -> Self {
        Self {
            user_id,
            role,
            group_ids: Vec::new(),
        }
    }

    /// Super administrator context.
    pub fn super_admin(user_id: Id) -> Self {
        Self::new(user_id, UserRole::SuperAdmin)
    }

    /// Set group memberships.
    pub fn with_groups(mut self, group_ids: impl IntoIterator<Item = Id>) -> Self {
        self.group_ids = group_ids.into_iter().collect();
        self
    }

    /// Check for super administrator.
    pub fn is_super_admin(&self) -> bool {
        self.role == UserRole::SuperAdmin
    }

    /// Group ids as signed integers for SQL conditions.
    pub fn group_values(&self) -> Vec<i64> {
        self.group_ids
            .iter()
            .filter_map(|id| i64::try_from(*id).ok())
            .collect()
    }
}
