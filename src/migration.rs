use sea_orm::{EntityTrait, Schema};
use sea_orm_migration::prelude::*;

use crate::entity::{
    AuditLogs, CartItems, Deliveries, OrderItems, Orders, Payments, Products, Users,
};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateMarketplaceTables)]
    }
}

/// Tables are derived from the entity definitions so the schema follows the models.
pub struct CreateMarketplaceTables;

impl MigrationName for CreateMarketplaceTables {
    fn name(&self) -> &str {
        "m20250101_000001_create_marketplace_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateMarketplaceTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());

        // Parents before children so foreign keys resolve on Postgres.
        create(manager, &schema, Users).await?;
        create(manager, &schema, Products).await?;
        create(manager, &schema, CartItems).await?;
        create(manager, &schema, Orders).await?;
        create(manager, &schema, OrderItems).await?;
        create(manager, &schema, Deliveries).await?;
        create(manager, &schema, Payments).await?;
        create(manager, &schema, AuditLogs).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        drop_table_of(manager, AuditLogs).await?;
        drop_table_of(manager, Payments).await?;
        drop_table_of(manager, Deliveries).await?;
        drop_table_of(manager, OrderItems).await?;
        drop_table_of(manager, Orders).await?;
        drop_table_of(manager, CartItems).await?;
        drop_table_of(manager, Products).await?;
        drop_table_of(manager, Users).await?;
        Ok(())
    }
}

async fn create<E>(manager: &SchemaManager<'_>, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    manager
        .create_table(schema.create_table_from_entity(entity).if_not_exists().to_owned())
        .await?;
    for mut index in schema.create_index_from_entity(entity) {
        manager.create_index(index.if_not_exists().to_owned()).await?;
    }
    Ok(())
}

async fn drop_table_of<E>(manager: &SchemaManager<'_>, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    manager
        .drop_table(Table::drop().table(entity).if_exists().to_owned())
        .await
}
