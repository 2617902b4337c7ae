use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    GroceryItem, GroceryItemDetail, GroceryItemUpdate, ItemStatus, Link, LinkState, Member,
    NewGroceryItem, Purchase, ResultEngine, grocery_items, item_links, members, purchases,
    util::{ensure_same_id, normalize_required_name, validate_item_amounts},
};

use super::{Engine, with_tx, with_write_tx};

impl Engine {
    /// Return every grocery item with its most relevant link.
    pub async fn list_grocery_items(&self) -> ResultEngine<Vec<GroceryItemDetail>> {
        with_tx!(self, |db_tx| {
            let models = grocery_items::Entity::find()
                .order_by_asc(grocery_items::Column::Name)
                .order_by_asc(grocery_items::Column::Id)
                .all(&db_tx)
                .await?;
            let link_models = item_links::Entity::find().all(&db_tx).await?;
            let context = self.purchase_context(&db_tx).await?;

            let mut links_by_item: HashMap<Uuid, Vec<Link>> = HashMap::new();
            for model in link_models {
                let link = Link::try_from(model)?;
                links_by_item
                    .entry(link.grocery_item_id)
                    .or_default()
                    .push(link);
            }

            let mut out = Vec::with_capacity(models.len());
            for model in models {
                let item = GroceryItem::try_from(model)?;
                let links = links_by_item.remove(&item.id).unwrap_or_default();
                out.push(context.detail(item, &links));
            }
            Ok(out)
        })
    }

    /// Return a grocery item with its most relevant link.
    pub async fn grocery_item(&self, item_id: Uuid) -> ResultEngine<GroceryItemDetail> {
        with_tx!(self, |db_tx| {
            let model = self.require_grocery_item(&db_tx, item_id).await?;
            let item = GroceryItem::try_from(model)?;
            let links = item_links::Entity::find()
                .filter(item_links::Column::GroceryItemId.eq(item_id.to_string()))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Link::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            let context = self.purchase_context(&db_tx).await?;
            Ok(context.detail(item, &links))
        })
    }

    /// Add an item already bought by `member_id` on `date_purchased`.
    ///
    /// Creates the item, a new purchase for the member and the bought link in
    /// one transaction. Returns the item id.
    pub async fn add_grocery_item(
        &self,
        new: NewGroceryItem,
        member_id: Uuid,
        date_purchased: NaiveDate,
    ) -> ResultEngine<Uuid> {
        let item = build_item(new)?;
        with_tx!(self, |db_tx| {
            self.require_member(&db_tx, member_id).await?;

            let item_model: grocery_items::ActiveModel = (&item).into();
            item_model.insert(&db_tx).await?;

            let purchase = Purchase::new(member_id, date_purchased);
            let purchase_model: purchases::ActiveModel = (&purchase).into();
            purchase_model.insert(&db_tx).await?;

            let link = Link::bought(item.id, purchase.id);
            let link_model: item_links::ActiveModel = (&link).into();
            link_model.insert(&db_tx).await?;

            tracing::debug!(item = %item.id, purchase = %purchase.id, "item added as bought");
            Ok(item.id)
        })
    }

    /// Add an item to the pending pool (wish list). Returns the item id.
    pub async fn add_wanted_item(&self, new: NewGroceryItem) -> ResultEngine<Uuid> {
        let item = build_item(new)?;
        with_tx!(self, |db_tx| {
            let item_model: grocery_items::ActiveModel = (&item).into();
            item_model.insert(&db_tx).await?;
            self.insert_pending_link(&db_tx, item.id).await?;
            Ok(item.id)
        })
    }

    /// Replace name, quantity and unit price of an item.
    pub async fn update_grocery_item(
        &self,
        item_id: Uuid,
        update: GroceryItemUpdate,
    ) -> ResultEngine<()> {
        ensure_same_id(item_id, update.id, "grocery_item")?;
        let name = normalize_required_name(&update.name, "grocery_item")?;
        validate_item_amounts(update.quantity, update.unit_price)?;
        with_write_tx!(self, grocery_item_conflict(item_id), |db_tx| {
            let current = self.require_grocery_item(&db_tx, item_id).await?;

            let result = grocery_items::Entity::update_many()
                .col_expr(grocery_items::Column::Name, Expr::value(name))
                .col_expr(grocery_items::Column::Quantity, Expr::value(update.quantity))
                .col_expr(
                    grocery_items::Column::UnitPrice,
                    Expr::value(update.unit_price),
                )
                .col_expr(
                    grocery_items::Column::Revision,
                    Expr::value(current.revision + 1),
                )
                .filter(grocery_items::Column::Id.eq(current.id.as_str()))
                .filter(grocery_items::Column::Revision.eq(current.revision))
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(self.grocery_item_conflict(&db_tx, item_id).await);
            }
            Ok(())
        })
    }

    /// Delete an item and every link to it.
    pub async fn delete_grocery_item(&self, item_id: Uuid) -> ResultEngine<()> {
        with_write_tx!(self, grocery_item_conflict(item_id), |db_tx| {
            let item = self.require_grocery_item(&db_tx, item_id).await?;
            item_links::Entity::delete_many()
                .filter(item_links::Column::GroceryItemId.eq(item.id.as_str()))
                .exec(&db_tx)
                .await?;
            let result = grocery_items::Entity::delete_by_id(item.id)
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(self.grocery_item_conflict(&db_tx, item_id).await);
            }
            Ok(())
        })
    }

    async fn purchase_context(&self, db: &DatabaseTransaction) -> ResultEngine<PurchaseContext> {
        let purchases = purchases::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|model| Purchase::try_from(model).map(|p| (p.id, p)))
            .collect::<ResultEngine<HashMap<_, _>>>()?;
        let payer_names = members::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|model| Member::try_from(model).map(|m| (m.id, m.name)))
            .collect::<ResultEngine<HashMap<_, _>>>()?;
        Ok(PurchaseContext {
            purchases,
            payer_names,
        })
    }
}

fn build_item(new: NewGroceryItem) -> ResultEngine<GroceryItem> {
    let name = normalize_required_name(&new.name, "grocery_item")?;
    validate_item_amounts(new.quantity, new.unit_price)?;
    Ok(GroceryItem::new(name, new.quantity, new.unit_price))
}

/// Purchases and payer names needed to describe items.
struct PurchaseContext {
    purchases: HashMap<Uuid, Purchase>,
    payer_names: HashMap<Uuid, String>,
}

impl PurchaseContext {
    fn detail(&self, item: GroceryItem, links: &[Link]) -> GroceryItemDetail {
        let status = self.status(links);
        GroceryItemDetail {
            total_amount: item.cost(),
            item,
            status,
        }
    }

    /// A pending link wins, so the item shows up as it does in the pending
    /// pool. Otherwise the latest purchase by (date, id) wins.
    fn status(&self, links: &[Link]) -> ItemStatus {
        if links.iter().any(|link| !link.is_bought()) {
            return ItemStatus::Pending;
        }

        let latest = links
            .iter()
            .filter_map(|link| match link.state {
                LinkState::Bought { purchase_id } => self.purchases.get(&purchase_id),
                LinkState::Pending => None,
            })
            .max_by_key(|purchase| (purchase.date_purchased, purchase.id));

        match latest {
            Some(purchase) => ItemStatus::Bought {
                purchase_id: purchase.id,
                payer_name: self
                    .payer_names
                    .get(&purchase.member_id)
                    .cloned()
                    .unwrap_or_default(),
                date_purchased: purchase.date_purchased,
            },
            None => ItemStatus::Unlinked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, day).unwrap()
    }

    fn context(purchases: &[Purchase], payers: &[(Uuid, &str)]) -> PurchaseContext {
        PurchaseContext {
            purchases: purchases.iter().map(|p| (p.id, p.clone())).collect(),
            payer_names: payers
                .iter()
                .map(|(id, name)| (*id, (*name).to_owned()))
                .collect(),
        }
    }

    #[test]
    fn latest_purchase_is_most_relevant() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let older = Purchase::new(alice, date(1));
        let newer = Purchase::new(bob, date(9));
        let ctx = context(&[older.clone(), newer.clone()], &[(alice, "Alice"), (bob, "Bob")]);

        let item = GroceryItem::new("Rice".to_string(), 1, 3.5);
        let mut links = vec![
            Link::bought(item.id, older.id),
            Link::bought(item.id, newer.id),
        ];

        let detail = ctx.detail(item.clone(), &links);
        assert_eq!(
            detail.status,
            ItemStatus::Bought {
                purchase_id: newer.id,
                payer_name: "Bob".to_string(),
                date_purchased: date(9),
            }
        );
        assert!((detail.total_amount - 3.5).abs() < 1e-9);

        links.push(Link::pending(item.id));
        assert_eq!(ctx.detail(item, &links).status, ItemStatus::Pending);
    }

    #[test]
    fn pending_and_unlinked_items() {
        let ctx = context(&[], &[]);
        let item = GroceryItem::new("Salt".to_string(), 1, 1.0);

        let pending = ctx.detail(item.clone(), &[Link::pending(item.id)]);
        assert_eq!(pending.status, ItemStatus::Pending);

        let unlinked = ctx.detail(item, &[]);
        assert_eq!(unlinked.status, ItemStatus::Unlinked);
    }

    #[test]
    fn invalid_new_items_are_rejected() {
        let bad_qty = NewGroceryItem {
            name: "Milk".to_string(),
            quantity: 0,
            unit_price: 1.0,
        };
        assert!(build_item(bad_qty).is_err());

        let blank = NewGroceryItem {
            name: "  ".to_string(),
            quantity: 1,
            unit_price: 1.0,
        };
        assert!(build_item(blank).is_err());

        let ok = NewGroceryItem {
            name: " Milk ".to_string(),
            quantity: 2,
            unit_price: 1.25,
        };
        assert_eq!(build_item(ok).unwrap().name, "Milk");
    }
}
