//! Back-office user aggregate.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::criteria::{Criterion, Field, FieldValue, Predicate, PredicateBuilder};
use crate::entity::{Entity, EntityId};
use crate::error::StoreResult;

/// Role assigned to a back-office user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Customer => "customer",
        }
    }
}

/// A back-office user account.
///
/// Credential material and token issuance live in the identity
/// subsystem; this aggregate only carries the profile the back office
/// manages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: EntityId::new(),
            username: username.into(),
            email: email.into(),
            role,
            is_active: true,
            created_at: Timestamp::now(),
        }
    }
}

impl Entity for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> EntityId {
        self.id
    }
}

/// Sparse search criteria over users.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    /// Case-insensitive substring over the username
    pub username: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UserFilter {
    pub fn predicate(&self) -> StoreResult<Predicate<User>> {
        Ok(PredicateBuilder::new()
            .field(
                Field::text("username", |u: &User| u.username.clone()),
                self.username.clone().map(Criterion::Contains),
            )?
            .field(
                Field::text("role", |u: &User| u.role.as_str().to_string()),
                self.role
                    .map(|r| Criterion::Equals(FieldValue::Text(r.as_str().to_string()))),
            )?
            .field(
                Field::flag("is_active", |u: &User| u.is_active),
                self.is_active.map(|v| Criterion::Equals(FieldValue::Flag(v))),
            )?
            .build())
    }
}
