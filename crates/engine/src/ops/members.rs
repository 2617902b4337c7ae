use uuid::Uuid;

use sea_orm::{
    JoinType, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    Member, MemberUpdate, ResultEngine, grocery_items, item_links, members, purchases,
    util::{ensure_same_id, normalize_email, normalize_required_name},
};

use super::{Engine, with_tx, with_write_tx};

impl Engine {
    /// Return every member, ordered by name.
    pub async fn list_members(&self) -> ResultEngine<Vec<Member>> {
        with_tx!(self, |db_tx| {
            let models = members::Entity::find()
                .order_by_asc(members::Column::Name)
                .order_by_asc(members::Column::Id)
                .all(&db_tx)
                .await?;
            let members = models
                .into_iter()
                .map(Member::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok(members)
        })
    }

    /// Return a member snapshot from DB.
    pub async fn member(&self, member_id: Uuid) -> ResultEngine<Member> {
        with_tx!(self, |db_tx| {
            let model = self.require_member(&db_tx, member_id).await?;
            Member::try_from(model)
        })
    }

    /// Add a new member.
    ///
    /// The email is stored in canonical form and must be unique.
    pub async fn add_member(&self, name: &str, email: &str) -> ResultEngine<Uuid> {
        let name = normalize_required_name(name, "member")?;
        let email = normalize_email(email)?;
        with_tx!(self, |db_tx| {
            self.require_email_free(&db_tx, &email, None).await?;

            let member = Member::new(name, email);
            let model: members::ActiveModel = (&member).into();
            model.insert(&db_tx).await?;
            Ok(member.id)
        })
    }

    /// Replace name and email of a member.
    pub async fn update_member(&self, member_id: Uuid, update: MemberUpdate) -> ResultEngine<()> {
        ensure_same_id(member_id, update.id, "member")?;
        let name = normalize_required_name(&update.name, "member")?;
        let email = normalize_email(&update.email)?;
        with_write_tx!(self, member_conflict(member_id), |db_tx| {
            let current = self.require_member(&db_tx, member_id).await?;
            self.require_email_free(&db_tx, &email, Some(member_id))
                .await?;

            let result = members::Entity::update_many()
                .col_expr(members::Column::Name, Expr::value(name))
                .col_expr(members::Column::Email, Expr::value(email))
                .col_expr(members::Column::Revision, Expr::value(current.revision + 1))
                .filter(members::Column::Id.eq(current.id.as_str()))
                .filter(members::Column::Revision.eq(current.revision))
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(self.member_conflict(&db_tx, member_id).await);
            }
            Ok(())
        })
    }

    /// Delete a member together with the purchases they paid.
    ///
    /// Items bought through those purchases go back to the pending pool.
    pub async fn delete_member(&self, member_id: Uuid) -> ResultEngine<()> {
        with_write_tx!(self, member_conflict(member_id), |db_tx| {
            let member = self.require_member(&db_tx, member_id).await?;

            let purchase_models = purchases::Entity::find()
                .filter(purchases::Column::MemberId.eq(member.id.as_str()))
                .all(&db_tx)
                .await?;
            for purchase in &purchase_models {
                self.revert_purchase_links(&db_tx, &purchase.id).await?;
            }
            purchases::Entity::delete_many()
                .filter(purchases::Column::MemberId.eq(member.id.as_str()))
                .exec(&db_tx)
                .await?;

            let result = members::Entity::delete_by_id(member.id.clone())
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(self.member_conflict(&db_tx, member_id).await);
            }
            tracing::debug!(
                member = %member_id,
                purchases = purchase_models.len(),
                "member deleted"
            );
            Ok(())
        })
    }

    /// Names of the items bought through the member's purchases, alphabetical.
    ///
    /// An item bought in several of the member's purchases is listed once.
    pub async fn items_bought_by_member(&self, member_id: Uuid) -> ResultEngine<Vec<String>> {
        with_tx!(self, |db_tx| {
            let member = self.require_member(&db_tx, member_id).await?;

            let items = grocery_items::Entity::find()
                .join(JoinType::InnerJoin, grocery_items::Relation::ItemLinks.def())
                .join(JoinType::InnerJoin, item_links::Relation::Purchases.def())
                .filter(purchases::Column::MemberId.eq(member.id.as_str()))
                .distinct()
                .order_by_asc(grocery_items::Column::Name)
                .all(&db_tx)
                .await?;
            Ok(items.into_iter().map(|item| item.name).collect::<Vec<_>>())
        })
    }
}
