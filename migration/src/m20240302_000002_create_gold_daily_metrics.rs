use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Days are UTC calendar days
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE OR REPLACE VIEW raw_data.gold_bitcoin_daily_metrics AS
                WITH daily AS (
                    SELECT
                        (price_timestamp AT TIME ZONE 'UTC')::date AS data_referencia,
                        (ARRAY_AGG(price_usd ORDER BY price_timestamp DESC))[1] AS preco_fechamento_usd,
                        MAX(price_usd) AS preco_maximo_usd,
                        MIN(price_usd) AS preco_minimo_usd,
                        AVG(price_usd)::double precision AS preco_medio_usd,
                        COUNT(*) AS total_coletas_dia
                    FROM raw_data.bitcoin_prices_silver
                    GROUP BY 1
                )
                SELECT
                    data_referencia,
                    preco_fechamento_usd,
                    preco_maximo_usd,
                    preco_minimo_usd,
                    preco_medio_usd,
                    AVG(preco_fechamento_usd) OVER (
                        ORDER BY data_referencia
                        ROWS BETWEEN 6 PRECEDING AND CURRENT ROW
                    )::double precision AS media_movel_7d,
                    total_coletas_dia
                FROM daily;
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP VIEW IF EXISTS raw_data.gold_bitcoin_daily_metrics;")
            .await?;

        Ok(())
    }
}
