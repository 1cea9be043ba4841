//! # Data Models
//!
//! SeaORM entity models for everything the sync engine persists.

pub mod assignee;
pub mod board;
pub mod connection;
pub mod issue;
pub mod sprint;
pub mod sync_job;

pub use assignee::Entity as Assignee;
pub use board::Entity as Board;
pub use connection::Entity as Connection;
pub use issue::Entity as Issue;
pub use sprint::Entity as Sprint;
pub use sync_job::Entity as SyncJob;
