//! Method-level access rules.

use super::context::{UserContext, UserRole};
use crate::error::{Error, Result};

/// API method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Retrieval.
    Get,
    /// Creation.
    Create,
    /// Update.
    Update,
    /// Deletion.
    Delete,
}

impl Method {
    /// Parse a method name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "get" => Some(Method::Get),
            "create" => Some(Method::Create),
            "update" => Some(Method::Update),
            "delete" => Some(Method::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "get"),
            Method::Create => write!(f, "create"),
            Method::Update => write!(f, "update"),
            Method::Delete => write!(f, "delete"),
        }
    }
}

/// Minimum user type per method; `None` means the method is not offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessRules {
    /// `get`.
    pub get: Option<UserRole>,
    /// `create`.
    pub create: Option<UserRole>,
    /// `update`.
    pub update: Option<UserRole>,
    /// `delete`.
    pub delete: Option<UserRole>,
}

impl AccessRules {
    /// Only `get`.
    pub fn read_only(get: UserRole) -> Self {
        Self {
            get: Some(get),
            ..Self::default()
        }
    }

    /// `get` plus create/update/delete at one level.
    pub fn crud(get: UserRole, write: UserRole) -> Self {
        Self {
            get: Some(get),
            create: Some(write),
            update: Some(write),
            delete: Some(write),
        }
    }

    /// Minimum user type for a method.
    pub fn min_role(&self, method: Method) -> Option<UserRole> {
        match method {
            Method::Get => self.get,
            Method::Create => self.create,
            Method::Update => self.update,
            Method::Delete => self.delete,
        }
    }

    /// Check that the caller may call `entity.method`.
    pub fn check(&self, entity: &str, method: Method, user: &UserContext) -> Result<()> {
        match self.min_role(method) {
            None => Err(Error::invalid(format!(
                "Incorrect method \"{}.{}\".",
                entity, method
            ))),
            Some(min) if user.role < min => Err(Error::denied(format!(
                "No permissions to call \"{}.{}\".",
                entity, method
            ))),
            Some(_) => Ok(()),
        }
    }
}
