use sea_orm::{ConnectionTrait, DatabaseTransaction, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, grocery_items, item_links, members, purchases};

use super::Engine;

/// Generates a `require_*` lookup and the matching post-conflict re-check for
/// an entity keyed by a string UUID.
///
/// The re-check runs once after a guarded update matched no row, or after
/// the write lost a lock race: a missing row becomes `KeyNotFound`, a row
/// that is still there was changed by a concurrent write and becomes
/// `Conflict`.
macro_rules! impl_require {
    ($require_fn:ident, $recheck_fn:ident, $entity:path, $label:literal) => {
        pub(super) async fn $require_fn(
            &self,
            db: &DatabaseTransaction,
            id: Uuid,
        ) -> ResultEngine<<$entity as EntityTrait>::Model> {
            <$entity>::find_by_id(id.to_string())
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(concat!($label, " not exists").to_string()))
        }

        pub(super) async fn $recheck_fn<C: ConnectionTrait>(&self, db: &C, id: Uuid) -> EngineError {
            match <$entity>::find_by_id(id.to_string()).one(db).await {
                Ok(Some(_)) => EngineError::Conflict(
                    concat!($label, " was modified concurrently").to_string(),
                ),
                Ok(None) => EngineError::KeyNotFound(concat!($label, " not exists").to_string()),
                Err(err) => err.into(),
            }
        }
    };
}

impl Engine {
    impl_require!(require_member, member_conflict, members::Entity, "member");

    impl_require!(
        require_grocery_item,
        grocery_item_conflict,
        grocery_items::Entity,
        "grocery_item"
    );

    impl_require!(
        require_purchase,
        purchase_conflict,
        purchases::Entity,
        "purchase"
    );

    impl_require!(require_link, link_conflict, item_links::Entity, "link");

    /// The pending link of an item, if any.
    pub(super) async fn pending_link(
        &self,
        db: &DatabaseTransaction,
        item_id: Uuid,
    ) -> ResultEngine<Option<item_links::Model>> {
        item_links::Entity::find()
            .filter(item_links::Column::GroceryItemId.eq(item_id.to_string()))
            .filter(item_links::Column::PurchaseId.is_null())
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// The link binding `item_id` to `purchase_id`, if any.
    pub(super) async fn pair_link(
        &self,
        db: &DatabaseTransaction,
        item_id: Uuid,
        purchase_id: Uuid,
    ) -> ResultEngine<Option<item_links::Model>> {
        item_links::Entity::find()
            .filter(item_links::Column::GroceryItemId.eq(item_id.to_string()))
            .filter(item_links::Column::PurchaseId.eq(purchase_id.to_string()))
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// Fails with `ExistingKey` if the email belongs to another member.
    pub(super) async fn require_email_free(
        &self,
        db: &DatabaseTransaction,
        email: &str,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query = members::Entity::find().filter(members::Column::Email.eq(email));
        if let Some(id) = except {
            query = query.filter(members::Column::Id.ne(id.to_string()));
        }
        if query.one(db).await?.is_some() {
            return Err(EngineError::ExistingKey(email.to_string()));
        }
        Ok(())
    }
}
