//! # Repositories
//!
//! Database access layer. Each repository owns one table and keeps the
//! upsert semantics in one place.

pub mod assignee;
pub mod board;
pub mod connection;
pub mod issue;
pub mod sprint;
pub mod sync_job;

pub use assignee::AssigneeRepository;
pub use board::BoardRepository;
pub use connection::ConnectionRepository;
pub use issue::IssueRepository;
pub use sprint::SprintRepository;
pub use sync_job::SyncJobRepository;
