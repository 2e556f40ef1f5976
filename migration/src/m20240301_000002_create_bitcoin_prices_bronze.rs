use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Same column layout the loader creates on a first append
        manager
            .create_table(
                Table::create()
                    .table((RawData, BitcoinPricesBronze::Table))
                    .if_not_exists()
                    .col(ColumnDef::new(BitcoinPricesBronze::AssetId).text())
                    .col(ColumnDef::new(BitcoinPricesBronze::Currency).text())
                    .col(ColumnDef::new(BitcoinPricesBronze::Price).double())
                    .col(
                        ColumnDef::new(BitcoinPricesBronze::PriceTimestamp)
                            .timestamp_with_time_zone(),
                    )
                    .col(
                        ColumnDef::new(BitcoinPricesBronze::IngestionTimestamp)
                            .timestamp_with_time_zone(),
                    )
                    .col(ColumnDef::new(BitcoinPricesBronze::RunId).text())
                    .col(ColumnDef::new(BitcoinPricesBronze::Source).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bitcoin_prices_bronze_price_timestamp")
                    .table((RawData, BitcoinPricesBronze::Table))
                    .col(BitcoinPricesBronze::PriceTimestamp)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table((RawData, BitcoinPricesBronze::Table))
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
struct RawData;

#[derive(DeriveIden)]
enum BitcoinPricesBronze {
    Table,
    AssetId,
    Currency,
    Price,
    PriceTimestamp,
    IngestionTimestamp,
    RunId,
    Source,
}
