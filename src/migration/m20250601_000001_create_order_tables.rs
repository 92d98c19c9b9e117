use sea_orm::{EntityTrait, Schema};
use sea_orm_migration::prelude::*;

use crate::entity::{AuditLogs, OrderItems, Orders, Payments, Products, Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Parents before children so foreign keys resolve.
        create_from_entity(manager, Users).await?;
        create_from_entity(manager, Products).await?;
        create_from_entity(manager, Orders).await?;
        create_from_entity(manager, OrderItems).await?;
        create_from_entity(manager, Payments).await?;
        create_from_entity(manager, AuditLogs).await?;

        for (name, table, column) in [
            ("idx_orders_buyer_id", "orders", "buyer_id"),
            ("idx_orders_seller_id", "orders", "seller_id"),
            ("idx_orders_status", "orders", "status"),
            ("idx_order_items_order_id", "order_items", "order_id"),
            ("idx_payments_order_id", "payments", "order_id"),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Alias::new(table))
                        .col(Alias::new(column))
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            "audit_logs",
            "payments",
            "order_items",
            "orders",
            "products",
            "users",
        ] {
            manager
                .drop_table(Table::drop().table(Alias::new(table)).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}

async fn create_from_entity<E: EntityTrait>(
    manager: &SchemaManager<'_>,
    entity: E,
) -> Result<(), DbErr> {
    let schema = Schema::new(manager.get_database_backend());
    manager
        .create_table(schema.create_table_from_entity(entity).if_not_exists().to_owned())
        .await
}
