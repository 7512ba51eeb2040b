use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable, monotonically assigned account identifier.
///
/// Ordering follows registration order, which is what the batch scan walks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl AccountId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for AccountId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Read-only view of an account as exposed by the account directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl Account {
    pub fn new(id: impl Into<AccountId>, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    pub fn with_names(
        mut self,
        display_name: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        self.display_name = display_name.into();
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    /// Name fields that carry a value, in display, first, last order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        [
            self.display_name.as_str(),
            self.first_name.as_str(),
            self.last_name.as_str(),
        ]
        .into_iter()
        .filter(|name| !name.trim().is_empty())
    }

    /// Whether every name field is filled in.
    pub fn has_complete_profile(&self) -> bool {
        self.names().count() == 3
    }
}
