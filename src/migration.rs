use sea_orm::{EntityTrait, Schema};
use sea_orm_migration::prelude::*;

use crate::entity::{
    AuditLogs, CartItems, Carts, DiscountCodeUses, DiscountCodes, OrderDetails, Orders, Pays,
    Products, Shipments, audit_logs, cart_items,
};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250101_000001_create_storefront_tables::Migration)]
    }
}

mod m20250101_000001_create_storefront_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_storefront_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let schema = Schema::new(manager.get_database_backend());

            // Referenced tables first so foreign keys resolve on Postgres.
            create(manager, &schema, Products).await?;
            create(manager, &schema, Carts).await?;
            create(manager, &schema, CartItems).await?;
            create(manager, &schema, Orders).await?;
            create(manager, &schema, OrderDetails).await?;
            create(manager, &schema, Pays).await?;
            create(manager, &schema, Shipments).await?;
            create(manager, &schema, DiscountCodes).await?;
            create(manager, &schema, DiscountCodeUses).await?;
            create(manager, &schema, AuditLogs).await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_audit_logs_order")
                        .table(AuditLogs)
                        .col(audit_logs::Column::OrderId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_cart_items_cart_product")
                        .table(CartItems)
                        .col(cart_items::Column::CartId)
                        .col(cart_items::Column::ProductId)
                        .unique()
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            drop_entity(manager, AuditLogs).await?;
            drop_entity(manager, DiscountCodeUses).await?;
            drop_entity(manager, DiscountCodes).await?;
            drop_entity(manager, Shipments).await?;
            drop_entity(manager, Pays).await?;
            drop_entity(manager, OrderDetails).await?;
            drop_entity(manager, Orders).await?;
            drop_entity(manager, CartItems).await?;
            drop_entity(manager, Carts).await?;
            drop_entity(manager, Products).await
        }
    }

    async fn create<E: EntityTrait>(
        manager: &SchemaManager<'_>,
        schema: &Schema,
        entity: E,
    ) -> Result<(), DbErr> {
        let mut stmt = schema.create_table_from_entity(entity);
        stmt.if_not_exists();
        manager.create_table(stmt).await
    }

    async fn drop_entity<E: EntityTrait>(manager: &SchemaManager<'_>, entity: E) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(entity).if_exists().to_owned())
            .await
    }
}
