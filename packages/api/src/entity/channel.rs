//! `SeaORM` Entity for advertising channels

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "public", table_name = "Channel")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    /// Identifier on the messaging platform
    #[sea_orm(column_name = "externalId", column_type = "Text", unique)]
    pub external_id: String,
    #[sea_orm(column_type = "Text")]
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub username: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub category: String,
    #[sea_orm(column_name = "priceTop1Feed24", nullable)]
    pub price_top1_feed24: Option<i64>,
    #[sea_orm(column_name = "priceTop1Feed48", nullable)]
    pub price_top1_feed48: Option<i64>,
    #[sea_orm(column_name = "priceTop2Feed48", nullable)]
    pub price_top2_feed48: Option<i64>,
    #[sea_orm(column_name = "priceNative", nullable)]
    pub price_native: Option<i64>,
    pub subscribers: i64,
    #[sea_orm(column_name = "reach24h")]
    pub reach_24h: i64,
    #[sea_orm(column_name = "reach48h")]
    pub reach_48h: i64,
    #[sea_orm(column_name = "reach72h")]
    pub reach_72h: i64,
    /// Engagement rate in percent
    #[sea_orm(column_name = "errPercent", column_type = "Double")]
    pub err_percent: f64,
    #[sea_orm(column_name = "err24Percent", column_type = "Double")]
    pub err24_percent: f64,
    #[sea_orm(nullable)]
    pub cpm: Option<i64>,
    #[sea_orm(column_name = "analyticsRefreshedAt", nullable)]
    pub analytics_refreshed_at: Option<DateTime>,
    #[sea_orm(column_name = "isActive")]
    pub is_active: bool,
    pub version: i64,
    #[sea_orm(column_name = "createdAt")]
    pub created_at: DateTime,
    #[sea_orm(column_name = "updatedAt")]
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::slot::Entity")]
    Slot,
}

impl Related<super::slot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Slot.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
