//! The module contains `GroceryItem` struct and its implementation.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

/// A grocery item.
///
/// Items exist independently of members; they are attributed to a payer only
/// through a bought [`Link`](crate::Link).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroceryItem {
    pub id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: f64,
}

impl GroceryItem {
    pub fn new(name: String, quantity: i32, unit_price: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            quantity,
            unit_price,
        }
    }

    /// `quantity × unit_price`.
    pub fn cost(&self) -> f64 {
        f64::from(self.quantity) * self.unit_price
    }
}

/// Values for a grocery item about to be created.
#[derive(Clone, Debug)]
pub struct NewGroceryItem {
    pub name: String,
    pub quantity: i32,
    pub unit_price: f64,
}

/// Replacement values for an existing grocery item.
///
/// `id` must match the item being updated.
#[derive(Clone, Debug)]
pub struct GroceryItemUpdate {
    pub id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: f64,
}

/// Where an item currently stands with respect to purchases.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    /// The item has never been linked, or every link was removed.
    Unlinked,
    /// The item sits in the pending pool.
    Pending,
    /// Most recent purchase that bought the item.
    Bought {
        purchase_id: Uuid,
        payer_name: String,
        date_purchased: NaiveDate,
    },
}

/// An item together with its most relevant link.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroceryItemDetail {
    pub item: GroceryItem,
    pub total_amount: f64,
    pub status: ItemStatus,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "grocery_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub revision: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::item_links::Entity")]
    ItemLinks,
}

impl Related<super::item_links::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ItemLinks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&GroceryItem> for ActiveModel {
    fn from(value: &GroceryItem) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            quantity: ActiveValue::Set(value.quantity),
            unit_price: ActiveValue::Set(value.unit_price),
            revision: ActiveValue::Set(0),
        }
    }
}

impl TryFrom<Model> for GroceryItem {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "grocery_item")?,
            name: model.name,
            quantity: model.quantity,
            unit_price: model.unit_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_is_quantity_times_price() {
        let item = GroceryItem::new("Milk".to_string(), 2, 15.0);
        assert_eq!(item.cost(), 30.0);

        let free = GroceryItem::new("Sample".to_string(), 3, 0.0);
        assert_eq!(free.cost(), 0.0);
    }
}
