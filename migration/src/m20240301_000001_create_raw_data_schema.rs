use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS raw_data;")
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Only drops when empty; a schema holding data is left alone
        manager
            .get_connection()
            .execute_unprepared("DROP SCHEMA IF EXISTS raw_data RESTRICT;")
            .await?;

        Ok(())
    }
}
