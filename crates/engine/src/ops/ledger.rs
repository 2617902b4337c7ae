use uuid::Uuid;

use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    EngineError, GroceryItem, Ledger, Link, Member, MemberBalance, Purchase, ResultEngine,
    grocery_items, item_links, members, purchases,
};

use super::{Engine, with_tx};

impl Engine {
    /// Compute paid and owed amounts for every member.
    ///
    /// Fails with `KeyNotFound` when there are no members.
    pub async fn ledger(&self) -> ResultEngine<Ledger> {
        with_tx!(self, |db_tx| {
            let members = members::Entity::find()
                .order_by_asc(members::Column::Name)
                .order_by_asc(members::Column::Id)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Member::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            let purchases = purchases::Entity::find()
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Purchase::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            let links = item_links::Entity::find()
                .filter(item_links::Column::PurchaseId.is_not_null())
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Link::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            let items = grocery_items::Entity::find()
                .all(&db_tx)
                .await?
                .into_iter()
                .map(GroceryItem::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            Ledger::compute(&members, &purchases, &links, &items)
        })
    }

    /// Balance of a single member.
    pub async fn member_balance(&self, member_id: Uuid) -> ResultEngine<MemberBalance> {
        let ledger = self.ledger().await?;
        ledger
            .balance(member_id)
            .cloned()
            .ok_or_else(|| EngineError::KeyNotFound("member not exists".to_string()))
    }
}
