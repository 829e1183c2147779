//! `SeaORM` Entity for manager withdrawal requests

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::PayoutStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "public", table_name = "ManagerPayout")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    #[sea_orm(column_name = "managerId", column_type = "Text")]
    pub manager_id: String,
    pub amount: i64,
    pub status: PayoutStatus,
    #[sea_orm(column_name = "requestedAt")]
    pub requested_at: DateTime,
    #[sea_orm(column_name = "processedAt", nullable)]
    pub processed_at: Option<DateTime>,
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::manager::Entity",
        from = "Column::ManagerId",
        to = "super::manager::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Manager,
}

impl Related<super::manager::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Manager.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
