//! At most one pending link per grocery item.
//!
//! The composite unique index on `(grocery_item_id, purchase_id)` does not
//! cover pending links, since NULLs never compare equal. A partial index
//! closes that gap.

use sea_orm::ConnectionTrait;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS \"idx-item_links-pending-unique\" \
                 ON item_links (grocery_item_id) WHERE purchase_id IS NULL",
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS \"idx-item_links-pending-unique\"")
            .await?;
        Ok(())
    }
}
