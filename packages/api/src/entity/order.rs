//! `SeaORM` Entity for advertising orders

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{OrderStatus, PlacementFormat};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "public", table_name = "AdOrder")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    #[sea_orm(column_name = "slotId", column_type = "Text")]
    pub slot_id: String,
    #[sea_orm(column_name = "clientId", column_type = "Text")]
    pub client_id: String,
    #[sea_orm(column_name = "managerId", column_type = "Text", nullable)]
    pub manager_id: Option<String>,
    pub format: PlacementFormat,
    #[sea_orm(column_name = "basePrice")]
    pub base_price: i64,
    /// Discount in percent, 0-100
    #[sea_orm(column_name = "discountPercent")]
    pub discount_percent: i16,
    #[sea_orm(column_name = "finalPrice")]
    pub final_price: i64,
    pub status: OrderStatus,
    #[sea_orm(column_name = "paidAt", nullable)]
    pub paid_at: Option<DateTime>,
    #[sea_orm(column_name = "postedAt", nullable)]
    pub posted_at: Option<DateTime>,
    #[sea_orm(column_name = "completedAt", nullable)]
    pub completed_at: Option<DateTime>,
    #[sea_orm(column_name = "cancelledAt", nullable)]
    pub cancelled_at: Option<DateTime>,
    pub version: i64,
    #[sea_orm(column_name = "createdAt")]
    pub created_at: DateTime,
    #[sea_orm(column_name = "updatedAt")]
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::slot::Entity",
        from = "Column::SlotId",
        to = "super::slot::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    Slot,
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    Client,
    #[sea_orm(
        belongs_to = "super::manager::Entity",
        from = "Column::ManagerId",
        to = "super::manager::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Manager,
}

impl Related<super::slot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Slot.def()
    }
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::manager::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Manager.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
