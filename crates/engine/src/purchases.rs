//! Purchases and their history projection.
//!
//! A `Purchase` is paid by exactly one member on a given date. The items it
//! bought are reached through [`Link`](crate::Link)s; [`PurchaseHistory`]
//! flattens the two into the record shown in the purchase history.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, GroceryItem, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub member_id: Uuid,
    pub date_purchased: NaiveDate,
}

impl Purchase {
    pub fn new(member_id: Uuid, date_purchased: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
            date_purchased,
        }
    }
}

/// Replacement values for an existing purchase.
///
/// `id` must match the purchase being updated.
#[derive(Clone, Debug)]
pub struct PurchaseUpdate {
    pub id: Uuid,
    pub member_id: Uuid,
    pub date_purchased: NaiveDate,
}

/// A purchase as shown in the purchase history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseHistory {
    pub purchase_id: Uuid,
    pub date_purchased: NaiveDate,
    pub payer_name: String,
    /// Names of the bought items, alphabetical.
    pub item_names: Vec<String>,
    /// Sum of `quantity × unit_price` over the bought items.
    pub total_amount: f64,
}

impl PurchaseHistory {
    /// Project a purchase and the items linked to it.
    pub fn collect<'a>(
        purchase: &Purchase,
        payer_name: &str,
        items: impl IntoIterator<Item = &'a GroceryItem>,
    ) -> Self {
        let mut item_names = Vec::new();
        let mut total_amount = 0.0;
        for item in items {
            item_names.push(item.name.clone());
            total_amount += item.cost();
        }
        item_names.sort();

        Self {
            purchase_id: purchase.id,
            date_purchased: purchase.date_purchased,
            payer_name: payer_name.to_owned(),
            item_names,
            total_amount,
        }
    }
}

/// A page of purchase history, newest first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseHistoryPage {
    pub items: Vec<PurchaseHistory>,
    pub next_cursor: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub member_id: String,
    pub date_purchased: Date,
    pub revision: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::members::Entity",
        from = "Column::MemberId",
        to = "super::members::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Members,
    #[sea_orm(has_many = "super::item_links::Entity")]
    ItemLinks,
}

impl Related<super::members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::item_links::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ItemLinks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Purchase> for ActiveModel {
    fn from(value: &Purchase) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            member_id: ActiveValue::Set(value.member_id.to_string()),
            date_purchased: ActiveValue::Set(value.date_purchased),
            revision: ActiveValue::Set(0),
        }
    }
}

impl TryFrom<Model> for Purchase {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "purchase")?,
            member_id: parse_uuid(&model.member_id, "member")?,
            date_purchased: model.date_purchased,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
    }

    #[test]
    fn history_sums_linked_items() {
        let purchase = Purchase::new(Uuid::new_v4(), date());
        let milk = GroceryItem::new("Milk".to_string(), 2, 15.0);
        let bread = GroceryItem::new("Bread".to_string(), 1, 10.0);

        let history = PurchaseHistory::collect(&purchase, "Alice", [&milk, &bread]);

        assert_eq!(history.purchase_id, purchase.id);
        assert_eq!(history.payer_name, "Alice");
        assert_eq!(history.item_names, vec!["Bread", "Milk"]);
        assert!((history.total_amount - 40.0).abs() < 1e-9);
    }

    #[test]
    fn history_of_empty_purchase() {
        let purchase = Purchase::new(Uuid::new_v4(), date());
        let history = PurchaseHistory::collect(&purchase, "Bob", Vec::<&GroceryItem>::new());
        assert!(history.item_names.is_empty());
        assert_eq!(history.total_amount, 0.0);
        assert_eq!(history.date_purchased, date());
    }
}
