//! State transitions of grocery items between pending and bought.
//!
//! All transitions go through the item's [`Link`]s:
//!
//! - absorbing an item into a purchase reuses the item's pending link when
//!   there is one, and creates a bought link otherwise;
//! - deleting a purchase clears the purchase reference of its links, so the
//!   items return to the pending pool;
//! - an item has at most one pending link. A reverted link whose item is
//!   already pending is folded into the existing pending link.

use uuid::Uuid;

use sea_orm::{
    DatabaseTransaction, JoinType, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*, sea_query::Expr,
};

use crate::{
    EngineError, GroceryItem, Link, LinkUpdate, ResultEngine, grocery_items, item_links,
    util::{ensure_same_id, parse_uuid},
};

use super::{Engine, with_tx, with_write_tx};

impl Engine {
    /// Return every link with its state.
    pub async fn list_links(&self) -> ResultEngine<Vec<Link>> {
        with_tx!(self, |db_tx| {
            let models = item_links::Entity::find()
                .order_by_asc(item_links::Column::GroceryItemId)
                .order_by_asc(item_links::Column::Id)
                .all(&db_tx)
                .await?;
            let links = models
                .into_iter()
                .map(Link::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok(links)
        })
    }

    /// Return a link snapshot from DB.
    pub async fn link(&self, link_id: Uuid) -> ResultEngine<Link> {
        with_tx!(self, |db_tx| {
            let model = self.require_link(&db_tx, link_id).await?;
            Link::try_from(model)
        })
    }

    /// The pending pool: items still to be bought, ordered by name.
    pub async fn pending_items(&self) -> ResultEngine<Vec<GroceryItem>> {
        with_tx!(self, |db_tx| {
            let models = grocery_items::Entity::find()
                .join(JoinType::InnerJoin, grocery_items::Relation::ItemLinks.def())
                .filter(item_links::Column::PurchaseId.is_null())
                .distinct()
                .order_by_asc(grocery_items::Column::Name)
                .order_by_asc(grocery_items::Column::Id)
                .all(&db_tx)
                .await?;
            let items = models
                .into_iter()
                .map(GroceryItem::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok(items)
        })
    }

    /// Put an existing item into the pending pool.
    ///
    /// Fails with `ExistingKey` if the item is already pending.
    pub async fn mark_item_pending(&self, item_id: Uuid) -> ResultEngine<Uuid> {
        with_tx!(self, |db_tx| {
            self.require_grocery_item(&db_tx, item_id).await?;
            self.insert_pending_link(&db_tx, item_id).await
        })
    }

    /// Bind an existing item to an existing purchase.
    ///
    /// If the item is pending, its pending link is the one that becomes
    /// bought. Fails with `ExistingKey` if the pair is already linked.
    pub async fn link_item(&self, item_id: Uuid, purchase_id: Uuid) -> ResultEngine<Uuid> {
        with_tx!(self, |db_tx| {
            self.require_purchase(&db_tx, purchase_id).await?;
            self.absorb_item(&db_tx, item_id, purchase_id).await
        })
    }

    /// Remove the link between an item and a purchase.
    ///
    /// The link is deleted, not reverted to pending.
    pub async fn unlink_item(&self, item_id: Uuid, purchase_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let link = self
                .pair_link(&db_tx, item_id, purchase_id)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("link not exists".to_string()))?;
            item_links::Entity::delete_by_id(link.id).exec(&db_tx).await?;
            tracing::debug!(item = %item_id, purchase = %purchase_id, "item unlinked");
            Ok(())
        })
    }

    /// Move a link to another item and/or purchase.
    ///
    /// `purchase_id: None` turns the link into the item's pending link.
    pub async fn update_link(&self, link_id: Uuid, update: LinkUpdate) -> ResultEngine<()> {
        ensure_same_id(link_id, update.id, "link")?;
        with_write_tx!(self, link_conflict(link_id), |db_tx| {
            let current = self.require_link(&db_tx, link_id).await?;
            self.require_grocery_item(&db_tx, update.grocery_item_id)
                .await?;

            let clash = match update.purchase_id {
                Some(purchase_id) => {
                    self.require_purchase(&db_tx, purchase_id).await?;
                    self.pair_link(&db_tx, update.grocery_item_id, purchase_id)
                        .await?
                }
                None => self.pending_link(&db_tx, update.grocery_item_id).await?,
            };
            if clash.is_some_and(|other| other.id != current.id) {
                return Err(EngineError::ExistingKey(link_key(
                    update.grocery_item_id,
                    update.purchase_id,
                )));
            }

            let result = item_links::Entity::update_many()
                .col_expr(
                    item_links::Column::GroceryItemId,
                    Expr::value(update.grocery_item_id.to_string()),
                )
                .col_expr(
                    item_links::Column::PurchaseId,
                    Expr::value(update.purchase_id.map(|id| id.to_string())),
                )
                .col_expr(item_links::Column::Revision, Expr::value(current.revision + 1))
                .filter(item_links::Column::Id.eq(current.id.as_str()))
                .filter(item_links::Column::Revision.eq(current.revision))
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(self.link_conflict(&db_tx, link_id).await);
            }
            Ok(())
        })
    }

    /// Delete a link outright.
    pub async fn delete_link(&self, link_id: Uuid) -> ResultEngine<()> {
        with_write_tx!(self, link_conflict(link_id), |db_tx| {
            let link = self.require_link(&db_tx, link_id).await?;
            let result = item_links::Entity::delete_by_id(link.id)
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(self.link_conflict(&db_tx, link_id).await);
            }
            Ok(())
        })
    }

    pub(super) async fn insert_pending_link(
        &self,
        db: &DatabaseTransaction,
        item_id: Uuid,
    ) -> ResultEngine<Uuid> {
        if self.pending_link(db, item_id).await?.is_some() {
            return Err(EngineError::ExistingKey(link_key(item_id, None)));
        }
        let link = Link::pending(item_id);
        let model: item_links::ActiveModel = (&link).into();
        model.insert(db).await?;
        Ok(link.id)
    }

    /// Mark `item_id` as bought by `purchase_id`.
    ///
    /// The purchase must already exist in `db`.
    pub(super) async fn absorb_item(
        &self,
        db: &DatabaseTransaction,
        item_id: Uuid,
        purchase_id: Uuid,
    ) -> ResultEngine<Uuid> {
        self.require_grocery_item(db, item_id).await?;
        if self.pair_link(db, item_id, purchase_id).await?.is_some() {
            return Err(EngineError::ExistingKey(link_key(
                item_id,
                Some(purchase_id),
            )));
        }

        if let Some(pending) = self.pending_link(db, item_id).await? {
            let link_id = parse_uuid(&pending.id, "link")?;
            self.set_link_purchase(db, &pending, Some(purchase_id))
                .await?;
            tracing::debug!(item = %item_id, purchase = %purchase_id, "pending item bought");
            return Ok(link_id);
        }

        let link = Link::bought(item_id, purchase_id);
        let model: item_links::ActiveModel = (&link).into();
        model.insert(db).await?;
        tracing::debug!(item = %item_id, purchase = %purchase_id, "item bought");
        Ok(link.id)
    }

    /// Send every item bought by `purchase_id` back to the pending pool.
    ///
    /// Must run before the purchase row is deleted. Returns how many items
    /// were reverted.
    pub(super) async fn revert_purchase_links(
        &self,
        db: &DatabaseTransaction,
        purchase_id: &str,
    ) -> ResultEngine<usize> {
        let bound = item_links::Entity::find()
            .filter(item_links::Column::PurchaseId.eq(purchase_id))
            .all(db)
            .await?;

        for link in &bound {
            let item_id = parse_uuid(&link.grocery_item_id, "grocery_item")?;
            if self.pending_link(db, item_id).await?.is_some() {
                item_links::Entity::delete_by_id(link.id.clone())
                    .exec(db)
                    .await?;
            } else {
                self.set_link_purchase(db, link, None).await?;
            }
        }

        tracing::debug!(purchase = %purchase_id, items = bound.len(), "purchase links reverted");
        Ok(bound.len())
    }

    async fn set_link_purchase(
        &self,
        db: &DatabaseTransaction,
        link: &item_links::Model,
        purchase_id: Option<Uuid>,
    ) -> ResultEngine<()> {
        let result = item_links::Entity::update_many()
            .col_expr(
                item_links::Column::PurchaseId,
                Expr::value(purchase_id.map(|id| id.to_string())),
            )
            .col_expr(item_links::Column::Revision, Expr::value(link.revision + 1))
            .filter(item_links::Column::Id.eq(link.id.as_str()))
            .filter(item_links::Column::Revision.eq(link.revision))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            let link_id = parse_uuid(&link.id, "link")?;
            return Err(self.link_conflict(db, link_id).await);
        }
        Ok(())
    }
}

fn link_key(item_id: Uuid, purchase_id: Option<Uuid>) -> String {
    match purchase_id {
        Some(purchase_id) => format!("link {item_id} -> {purchase_id}"),
        None => format!("pending link {item_id}"),
    }
}
