pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_raw_data_schema;
mod m20240301_000002_create_bitcoin_prices_bronze;
mod m20240302_000001_create_bitcoin_prices_silver;
mod m20240302_000002_create_gold_daily_metrics;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_raw_data_schema::Migration),
            Box::new(m20240301_000002_create_bitcoin_prices_bronze::Migration),
            Box::new(m20240302_000001_create_bitcoin_prices_silver::Migration),
            Box::new(m20240302_000002_create_gold_daily_metrics::Migration),
        ]
    }
}
