//! `SeaORM` Entity for sales managers and their progression counters

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::ManagerStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "public", table_name = "Manager")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    #[sea_orm(column_name = "telegramId")]
    pub telegram_id: i64,
    #[sea_orm(column_type = "Text")]
    pub name: String,
    pub status: ManagerStatus,
    pub level: i16,
    #[sea_orm(column_name = "experiencePoints")]
    pub experience_points: i64,
    /// Commission in percent, overwritten on level-up
    #[sea_orm(column_name = "commissionRate")]
    pub commission_rate: i32,
    pub balance: i64,
    #[sea_orm(column_name = "totalEarned")]
    pub total_earned: i64,
    #[sea_orm(column_name = "totalSales")]
    pub total_sales: i64,
    #[sea_orm(column_name = "totalRevenue")]
    pub total_revenue: i64,
    pub version: i64,
    #[sea_orm(column_name = "createdAt")]
    pub created_at: DateTime,
    #[sea_orm(column_name = "updatedAt")]
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order::Entity")]
    Order,
    #[sea_orm(has_many = "super::manager_payout::Entity")]
    ManagerPayout,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::manager_payout::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ManagerPayout.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
