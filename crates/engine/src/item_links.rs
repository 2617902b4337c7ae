//! Links between grocery items and purchases.
//!
//! A [`Link`] joins one grocery item to at most one purchase. The optional
//! purchase reference *is* the state of the item:
//!
//! - no purchase: the item is [`LinkState::Pending`], still to be bought;
//! - a purchase: the item is [`LinkState::Bought`] and its cost is paid by
//!   the purchase's member.
//!
//! Deleting a purchase moves its links back to `Pending` instead of deleting
//! them.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LinkState {
    Pending,
    Bought { purchase_id: Uuid },
}

impl LinkState {
    pub fn from_purchase(purchase_id: Option<Uuid>) -> Self {
        match purchase_id {
            Some(purchase_id) => Self::Bought { purchase_id },
            None => Self::Pending,
        }
    }

    pub fn purchase_id(self) -> Option<Uuid> {
        match self {
            Self::Pending => None,
            Self::Bought { purchase_id } => Some(purchase_id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: Uuid,
    pub grocery_item_id: Uuid,
    pub state: LinkState,
}

impl Link {
    pub fn pending(grocery_item_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            grocery_item_id,
            state: LinkState::Pending,
        }
    }

    pub fn bought(grocery_item_id: Uuid, purchase_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            grocery_item_id,
            state: LinkState::Bought { purchase_id },
        }
    }

    /// `true` exactly when the link references a purchase.
    pub fn is_bought(&self) -> bool {
        matches!(self.state, LinkState::Bought { .. })
    }

    pub fn purchase_id(&self) -> Option<Uuid> {
        self.state.purchase_id()
    }
}

/// Replacement values for an existing link.
///
/// `purchase_id: None` moves the link to the pending pool.
#[derive(Clone, Debug)]
pub struct LinkUpdate {
    pub id: Uuid,
    pub grocery_item_id: Uuid,
    pub purchase_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "item_links")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub grocery_item_id: String,
    pub purchase_id: Option<String>,
    pub revision: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::grocery_items::Entity",
        from = "Column::GroceryItemId",
        to = "super::grocery_items::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    GroceryItems,
    #[sea_orm(
        belongs_to = "super::purchases::Entity",
        from = "Column::PurchaseId",
        to = "super::purchases::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Purchases,
}

impl Related<super::grocery_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroceryItems.def()
    }
}

impl Related<super::purchases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Link> for ActiveModel {
    fn from(value: &Link) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            grocery_item_id: ActiveValue::Set(value.grocery_item_id.to_string()),
            purchase_id: ActiveValue::Set(value.purchase_id().map(|id| id.to_string())),
            revision: ActiveValue::Set(0),
        }
    }
}

impl TryFrom<Model> for Link {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let purchase_id = model
            .purchase_id
            .as_deref()
            .map(|id| parse_uuid(id, "purchase"))
            .transpose()?;
        Ok(Self {
            id: parse_uuid(&model.id, "link")?,
            grocery_item_id: parse_uuid(&model.grocery_item_id, "grocery_item")?,
            state: LinkState::from_purchase(purchase_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bought_flag_follows_purchase_reference() {
        let item_id = Uuid::new_v4();
        let purchase_id = Uuid::new_v4();

        let pending = Link::pending(item_id);
        assert!(!pending.is_bought());
        assert_eq!(pending.purchase_id(), None);

        let bought = Link::bought(item_id, purchase_id);
        assert!(bought.is_bought());
        assert_eq!(bought.purchase_id(), Some(purchase_id));
    }

    #[test]
    fn model_round_trip_keeps_state() {
        let item_id = Uuid::new_v4();
        let purchase_id = Uuid::new_v4();
        let link = Link::bought(item_id, purchase_id);

        let model = Model {
            id: link.id.to_string(),
            grocery_item_id: item_id.to_string(),
            purchase_id: Some(purchase_id.to_string()),
            revision: 3,
        };
        assert_eq!(Link::try_from(model).unwrap(), link);

        let model = Model {
            id: link.id.to_string(),
            grocery_item_id: item_id.to_string(),
            purchase_id: None,
            revision: 0,
        };
        let reverted = Link::try_from(model).unwrap();
        assert_eq!(reverted.state, LinkState::Pending);
    }

    #[test]
    fn malformed_purchase_reference_is_rejected() {
        let model = Model {
            id: Uuid::new_v4().to_string(),
            grocery_item_id: Uuid::new_v4().to_string(),
            purchase_id: Some("not-a-uuid".to_string()),
            revision: 0,
        };
        assert_eq!(
            Link::try_from(model),
            Err(EngineError::InvalidId("invalid purchase id".to_string()))
        );
    }
}
