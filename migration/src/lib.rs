pub use sea_orm_migration::prelude::*;

mod m20260116_000001_init;
mod m20260116_000002_crm_core;
mod m20260116_000003_sequences;

pub struct Migrator;
#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260116_000001_init::Migration),
            Box::new(m20260116_000002_crm_core::Migration),
            Box::new(m20260116_000003_sequences::Migration),
        ]
    }
}
