use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The unit of pagination and caching isolation: either the default
/// favorites collection or a named basket.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BasketScope {
    Default,
    Basket(String),
}

impl BasketScope {
    pub fn from_id(basket_id: Option<&str>) -> Self {
        match basket_id {
            Some(id) => BasketScope::Basket(id.to_string()),
            None => BasketScope::Default,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            BasketScope::Default => None,
            BasketScope::Basket(id) => Some(id),
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, BasketScope::Default)
    }
}

impl Default for BasketScope {
    fn default() -> Self {
        BasketScope::Default
    }
}

/// A named favorites collection owned by a user. Created and deleted only
/// by explicit user action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FavoriteBasket {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl FavoriteBasket {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at,
        }
    }

    pub fn scope(&self) -> BasketScope {
        BasketScope::Basket(self.id.clone())
    }
}
