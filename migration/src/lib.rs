pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_user_table;
mod m20240301_000002_create_wallet_table;
mod m20240301_000003_create_payment_table;
mod m20240301_000004_create_subscription_table;
mod m20240301_000005_create_task_table;
mod m20240301_000006_create_referral_table;
mod m20240301_000007_create_chat_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_user_table::Migration),
            Box::new(m20240301_000002_create_wallet_table::Migration),
            Box::new(m20240301_000003_create_payment_table::Migration),
            Box::new(m20240301_000004_create_subscription_table::Migration),
            Box::new(m20240301_000005_create_task_table::Migration),
            Box::new(m20240301_000006_create_referral_table::Migration),
            Box::new(m20240301_000007_create_chat_table::Migration),
        ]
    }
}
