use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per observed instant: overlapping 30-day pulls repeat points,
        // the most recent ingestion wins.
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE OR REPLACE VIEW raw_data.bitcoin_prices_silver AS
                SELECT DISTINCT ON (price_timestamp)
                    price_timestamp,
                    price AS price_usd,
                    source,
                    ingestion_timestamp
                FROM raw_data.bitcoin_prices_bronze
                WHERE asset_id = 'bitcoin'
                  AND currency = 'usd'
                  AND price IS NOT NULL
                  AND price > 0
                  AND price_timestamp IS NOT NULL
                ORDER BY price_timestamp, ingestion_timestamp DESC;
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP VIEW IF EXISTS raw_data.bitcoin_prices_silver;")
            .await?;

        Ok(())
    }
}
