//! Initial schema of the shared basket.
//!
//! - `members`: people sharing the basket, unique by email
//! - `grocery_items`: things to buy or already bought
//! - `purchases`: a shopping trip paid by one member
//! - `item_links`: item state; `purchase_id` NULL means pending
//!
//! Every table carries a `revision` counter used for optimistic updates.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Members {
    Table,
    Id,
    Name,
    Email,
    Revision,
}

#[derive(Iden)]
enum GroceryItems {
    Table,
    Id,
    Name,
    Quantity,
    UnitPrice,
    Revision,
}

#[derive(Iden)]
enum Purchases {
    Table,
    Id,
    MemberId,
    DatePurchased,
    Revision,
}

#[derive(Iden)]
enum ItemLinks {
    Table,
    Id,
    GroceryItemId,
    PurchaseId,
    Revision,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Members::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Members::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Members::Name).string().not_null())
                    .col(ColumnDef::new(Members::Email).string().not_null())
                    .col(
                        ColumnDef::new(Members::Revision)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-members-email-unique")
                    .table(Members::Table)
                    .col(Members::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroceryItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroceryItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GroceryItems::Name).string().not_null())
                    .col(ColumnDef::new(GroceryItems::Quantity).integer().not_null())
                    .col(ColumnDef::new(GroceryItems::UnitPrice).double().not_null())
                    .col(
                        ColumnDef::new(GroceryItems::Revision)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Purchases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Purchases::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Purchases::MemberId).string().not_null())
                    .col(ColumnDef::new(Purchases::DatePurchased).date().not_null())
                    .col(
                        ColumnDef::new(Purchases::Revision)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchases-member_id")
                            .from(Purchases::Table, Purchases::MemberId)
                            .to(Members::Table, Members::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-purchases-member_id")
                    .table(Purchases::Table)
                    .col(Purchases::MemberId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-purchases-date_purchased-id")
                    .table(Purchases::Table)
                    .col(Purchases::DatePurchased)
                    .col(Purchases::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ItemLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ItemLinks::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ItemLinks::GroceryItemId).string().not_null())
                    .col(ColumnDef::new(ItemLinks::PurchaseId).string())
                    .col(
                        ColumnDef::new(ItemLinks::Revision)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-item_links-grocery_item_id")
                            .from(ItemLinks::Table, ItemLinks::GroceryItemId)
                            .to(GroceryItems::Table, GroceryItems::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-item_links-purchase_id")
                            .from(ItemLinks::Table, ItemLinks::PurchaseId)
                            .to(Purchases::Table, Purchases::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-item_links-grocery_item_id-purchase_id-unique")
                    .table(ItemLinks::Table)
                    .col(ItemLinks::GroceryItemId)
                    .col(ItemLinks::PurchaseId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-item_links-purchase_id")
                    .table(ItemLinks::Table)
                    .col(ItemLinks::PurchaseId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ItemLinks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Purchases::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroceryItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Members::Table).to_owned())
            .await
    }
}
