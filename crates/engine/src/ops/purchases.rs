use std::collections::HashMap;

use base64::Engine as _;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    Condition, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*, sea_query::Expr,
};

use crate::{
    EngineError, GroceryItem, Link, Member, Purchase, PurchaseHistory, PurchaseHistoryPage,
    PurchaseUpdate, ResultEngine, grocery_items, item_links, members, purchases,
    util::ensure_same_id,
};

use super::{Engine, with_tx, with_write_tx};

const DEFAULT_PAGE_LIMIT: u64 = 50;
const MAX_PAGE_LIMIT: u64 = 200;

/// Paging options for the purchase history.
#[derive(Clone, Debug, Default)]
pub struct PurchaseHistoryQuery {
    /// Only purchases paid by this member.
    pub member_id: Option<Uuid>,
    /// Page size, clamped to `1..=200` (default 50).
    pub limit: Option<u64>,
    /// Opaque cursor returned by the previous page.
    pub cursor: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct HistoryCursor {
    date_purchased: NaiveDate,
    purchase_id: String,
}

impl HistoryCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid history cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input)
            .map_err(|_| EngineError::InvalidCursor("invalid history cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid history cursor".to_string()))
    }
}

impl Engine {
    /// Return the whole purchase history, newest first.
    pub async fn list_purchases(&self) -> ResultEngine<Vec<PurchaseHistory>> {
        with_tx!(self, |db_tx| {
            let models = purchases::Entity::find()
                .order_by_desc(purchases::Column::DatePurchased)
                .order_by_desc(purchases::Column::Id)
                .all(&db_tx)
                .await?;
            self.histories(&db_tx, models).await
        })
    }

    /// Return one page of the purchase history, newest first.
    pub async fn purchase_history_page(
        &self,
        query: PurchaseHistoryQuery,
    ) -> ResultEngine<PurchaseHistoryPage> {
        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT);
        let cursor = query
            .cursor
            .as_deref()
            .map(HistoryCursor::decode)
            .transpose()?;

        with_tx!(self, |db_tx| {
            let mut select = purchases::Entity::find();
            if let Some(member_id) = query.member_id {
                self.require_member(&db_tx, member_id).await?;
                select = select.filter(purchases::Column::MemberId.eq(member_id.to_string()));
            }
            if let Some(cursor) = &cursor {
                select = select.filter(
                    Condition::any()
                        .add(purchases::Column::DatePurchased.lt(cursor.date_purchased))
                        .add(
                            Condition::all()
                                .add(purchases::Column::DatePurchased.eq(cursor.date_purchased))
                                .add(purchases::Column::Id.lt(cursor.purchase_id.as_str())),
                        ),
                );
            }

            let mut models = select
                .order_by_desc(purchases::Column::DatePurchased)
                .order_by_desc(purchases::Column::Id)
                .limit(limit.saturating_add(1))
                .all(&db_tx)
                .await?;

            let next_cursor = if models.len() as u64 > limit {
                models.truncate(limit as usize);
                match models.last() {
                    Some(last) => Some(
                        HistoryCursor {
                            date_purchased: last.date_purchased,
                            purchase_id: last.id.clone(),
                        }
                        .encode()?,
                    ),
                    None => None,
                }
            } else {
                None
            };

            let items = self.histories(&db_tx, models).await?;
            Ok(PurchaseHistoryPage { items, next_cursor })
        })
    }

    /// Return the history record of a purchase.
    pub async fn purchase_history(&self, purchase_id: Uuid) -> ResultEngine<PurchaseHistory> {
        with_tx!(self, |db_tx| {
            let model = self.require_purchase(&db_tx, purchase_id).await?;
            let mut histories = self.histories(&db_tx, vec![model]).await?;
            histories
                .pop()
                .ok_or_else(|| EngineError::KeyNotFound("purchase not exists".to_string()))
        })
    }

    /// Return a purchase snapshot from DB.
    pub async fn purchase(&self, purchase_id: Uuid) -> ResultEngine<Purchase> {
        with_tx!(self, |db_tx| {
            let model = self.require_purchase(&db_tx, purchase_id).await?;
            Purchase::try_from(model)
        })
    }

    /// Record an empty purchase paid by `member_id`.
    pub async fn add_purchase(
        &self,
        member_id: Uuid,
        date_purchased: NaiveDate,
    ) -> ResultEngine<Uuid> {
        with_tx!(self, |db_tx| {
            self.require_member(&db_tx, member_id).await?;
            let purchase = Purchase::new(member_id, date_purchased);
            let model: purchases::ActiveModel = (&purchase).into();
            model.insert(&db_tx).await?;
            Ok(purchase.id)
        })
    }

    /// Record a purchase and mark the given items as bought by it.
    ///
    /// Pending items are moved out of the pending pool; other items get a new
    /// bought link. Duplicated ids are linked once. Either every item is
    /// linked and the purchase exists, or nothing is written.
    pub async fn add_purchase_with_items(
        &self,
        member_id: Uuid,
        date_purchased: NaiveDate,
        item_ids: &[Uuid],
    ) -> ResultEngine<Uuid> {
        let mut unique: Vec<Uuid> = Vec::with_capacity(item_ids.len());
        for id in item_ids {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }
        if unique.is_empty() {
            return Err(EngineError::InvalidInput(
                "a purchase needs at least one item".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            self.require_member(&db_tx, member_id).await?;
            let purchase = Purchase::new(member_id, date_purchased);
            let model: purchases::ActiveModel = (&purchase).into();
            model.insert(&db_tx).await?;

            for item_id in &unique {
                self.absorb_item(&db_tx, *item_id, purchase.id).await?;
            }
            tracing::debug!(
                purchase = %purchase.id,
                items = unique.len(),
                "purchase recorded"
            );
            Ok(purchase.id)
        })
    }

    /// Change date and payer of a purchase.
    pub async fn update_purchase(
        &self,
        purchase_id: Uuid,
        update: PurchaseUpdate,
    ) -> ResultEngine<()> {
        ensure_same_id(purchase_id, update.id, "purchase")?;
        with_write_tx!(self, purchase_conflict(purchase_id), |db_tx| {
            let current = self.require_purchase(&db_tx, purchase_id).await?;
            self.require_member(&db_tx, update.member_id).await?;

            let result = purchases::Entity::update_many()
                .col_expr(
                    purchases::Column::MemberId,
                    Expr::value(update.member_id.to_string()),
                )
                .col_expr(
                    purchases::Column::DatePurchased,
                    Expr::value(update.date_purchased),
                )
                .col_expr(purchases::Column::Revision, Expr::value(current.revision + 1))
                .filter(purchases::Column::Id.eq(current.id.as_str()))
                .filter(purchases::Column::Revision.eq(current.revision))
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(self.purchase_conflict(&db_tx, purchase_id).await);
            }
            Ok(())
        })
    }

    /// Delete a purchase.
    ///
    /// Its items go back to the pending pool first, then the purchase row is
    /// removed.
    pub async fn delete_purchase(&self, purchase_id: Uuid) -> ResultEngine<()> {
        with_write_tx!(self, purchase_conflict(purchase_id), |db_tx| {
            let purchase = self.require_purchase(&db_tx, purchase_id).await?;
            self.revert_purchase_links(&db_tx, &purchase.id).await?;

            let result = purchases::Entity::delete_by_id(purchase.id)
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(self.purchase_conflict(&db_tx, purchase_id).await);
            }
            Ok(())
        })
    }

    /// Project purchases into history records, keeping their order.
    async fn histories(
        &self,
        db: &DatabaseTransaction,
        models: Vec<purchases::Model>,
    ) -> ResultEngine<Vec<PurchaseHistory>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }
        let purchase_ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
        let member_ids: Vec<String> = models.iter().map(|m| m.member_id.clone()).collect();

        let links = item_links::Entity::find()
            .filter(item_links::Column::PurchaseId.is_in(purchase_ids))
            .all(db)
            .await?
            .into_iter()
            .map(Link::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        let item_ids: Vec<String> = links
            .iter()
            .map(|link| link.grocery_item_id.to_string())
            .collect();
        let items: HashMap<Uuid, GroceryItem> = grocery_items::Entity::find()
            .filter(grocery_items::Column::Id.is_in(item_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|model| GroceryItem::try_from(model).map(|item| (item.id, item)))
            .collect::<ResultEngine<_>>()?;

        let payers: HashMap<Uuid, Member> = members::Entity::find()
            .filter(members::Column::Id.is_in(member_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|model| Member::try_from(model).map(|member| (member.id, member)))
            .collect::<ResultEngine<_>>()?;

        let mut items_by_purchase: HashMap<Uuid, Vec<&GroceryItem>> = HashMap::new();
        for link in &links {
            let Some(purchase_id) = link.purchase_id() else {
                continue;
            };
            let item = items.get(&link.grocery_item_id).ok_or_else(|| {
                EngineError::KeyNotFound("grocery_item not exists".to_string())
            })?;
            items_by_purchase.entry(purchase_id).or_default().push(item);
        }

        let mut out = Vec::with_capacity(models.len());
        for model in models {
            let purchase = Purchase::try_from(model)?;
            let payer = payers
                .get(&purchase.member_id)
                .ok_or_else(|| EngineError::KeyNotFound("member not exists".to_string()))?;
            let bought = items_by_purchase.remove(&purchase.id).unwrap_or_default();
            out.push(PurchaseHistory::collect(&purchase, &payer.name, bought));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trip() {
        let cursor = HistoryCursor {
            date_purchased: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            purchase_id: Uuid::new_v4().to_string(),
        };
        let encoded = cursor.encode().unwrap();
        assert!(!encoded.contains('='));
        assert_eq!(HistoryCursor::decode(&encoded).unwrap(), cursor);
    }

    #[test]
    fn garbage_cursor_is_rejected() {
        assert_eq!(
            HistoryCursor::decode("not base64 at all!"),
            Err(EngineError::InvalidCursor("invalid history cursor".to_string()))
        );
        let not_json = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(b"[1,2]");
        assert!(HistoryCursor::decode(&not_json).is_err());
    }
}
