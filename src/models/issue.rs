//! Issue entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "issues")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub connection_id: Uuid,

    /// Local id of the board this issue was fetched through
    pub board_id: Uuid,

    /// Local assignee row; null when the issue is unassigned
    pub assignee_id: Option<Uuid>,

    /// Remote issue id, unique per connection
    pub jira_id: String,

    /// Human-readable key such as PROJ-123
    pub key: String,

    pub summary: String,

    pub issue_type: String,

    pub status: String,

    pub status_category: Option<String>,

    pub priority: Option<String>,

    pub jira_created_at: Option<DateTimeWithTimeZone>,

    pub jira_updated_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::connection::Entity",
        from = "Column::ConnectionId",
        to = "super::connection::Column::Id"
    )]
    Connection,
    #[sea_orm(
        belongs_to = "super::board::Entity",
        from = "Column::BoardId",
        to = "super::board::Column::Id"
    )]
    Board,
    #[sea_orm(
        belongs_to = "super::assignee::Entity",
        from = "Column::AssigneeId",
        to = "super::assignee::Column::Id"
    )]
    Assignee,
}

impl Related<super::connection::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Connection.def()
    }
}

impl Related<super::board::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Board.def()
    }
}

impl Related<super::assignee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
