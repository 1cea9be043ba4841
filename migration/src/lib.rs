//! Database migrations for the Jira sync service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_11_10_100000_create_connections;
mod m2025_11_10_100100_create_sync_jobs;
mod m2025_11_10_100200_create_boards;
mod m2025_11_10_100300_create_assignees;
mod m2025_11_10_100400_create_sprints;
mod m2025_11_10_100500_create_issues;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_11_10_100000_create_connections::Migration),
            Box::new(m2025_11_10_100100_create_sync_jobs::Migration),
            Box::new(m2025_11_10_100200_create_boards::Migration),
            Box::new(m2025_11_10_100300_create_assignees::Migration),
            Box::new(m2025_11_10_100400_create_sprints::Migration),
            Box::new(m2025_11_10_100500_create_issues::Migration),
        ]
    }
}
