use sea_orm_migration::prelude::*;

use codedrop_download_migration::Migrator;

#[tokio::main]
async fn main() {
    cli::run_cli(Migrator).await;
}
