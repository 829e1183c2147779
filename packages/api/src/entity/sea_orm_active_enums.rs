//! Database enums mirroring the domain enums of the core crate

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use adslot::model::{
    CompetitionStatus as DomainCompetitionStatus, LeaderboardMetric as DomainLeaderboardMetric,
    ManagerStatus as DomainManagerStatus, OrderStatus as DomainOrderStatus,
    PayoutStatus as DomainPayoutStatus, PlacementFormat as DomainPlacementFormat,
    SlotStatus as DomainSlotStatus,
};

/// Generates `From` conversions in both directions between a database enum
/// and its domain counterpart with identically named variants.
macro_rules! mirror_enum {
    ($db:ident <=> $domain:ident { $($variant:ident),+ $(,)? }) => {
        impl From<$db> for $domain {
            fn from(value: $db) -> Self {
                match value {
                    $($db::$variant => $domain::$variant,)+
                }
            }
        }

        impl From<$domain> for $db {
            fn from(value: $domain) -> Self {
                match value {
                    $($domain::$variant => $db::$variant,)+
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "SlotStatus")]
pub enum SlotStatus {
    #[sea_orm(string_value = "AVAILABLE")]
    Available,
    #[sea_orm(string_value = "RESERVED")]
    Reserved,
    #[sea_orm(string_value = "BOOKED")]
    Booked,
    #[sea_orm(string_value = "EXPIRED")]
    Expired,
}

mirror_enum!(SlotStatus <=> DomainSlotStatus {
    Available,
    Reserved,
    Booked,
    Expired,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "OrderStatus")]
pub enum OrderStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "PAYMENT_UPLOADED")]
    PaymentUploaded,
    #[sea_orm(string_value = "MODERATION")]
    Moderation,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    #[sea_orm(string_value = "PAYMENT_CONFIRMED")]
    PaymentConfirmed,
    #[sea_orm(string_value = "POSTED")]
    Posted,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

mirror_enum!(OrderStatus <=> DomainOrderStatus {
    Pending,
    PaymentUploaded,
    Moderation,
    Rejected,
    PaymentConfirmed,
    Posted,
    Completed,
    Cancelled,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "PlacementFormat")]
pub enum PlacementFormat {
    #[sea_orm(string_value = "TOP1_FEED24")]
    Top1Feed24,
    #[sea_orm(string_value = "TOP1_FEED48")]
    Top1Feed48,
    #[sea_orm(string_value = "TOP2_FEED48")]
    Top2Feed48,
    #[sea_orm(string_value = "NATIVE")]
    Native,
}

mirror_enum!(PlacementFormat <=> DomainPlacementFormat {
    Top1Feed24,
    Top1Feed48,
    Top2Feed48,
    Native,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "ManagerStatus")]
pub enum ManagerStatus {
    #[sea_orm(string_value = "TRAINEE")]
    Trainee,
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "INACTIVE")]
    Inactive,
}

mirror_enum!(ManagerStatus <=> DomainManagerStatus {
    Trainee,
    Active,
    Inactive,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "PayoutStatus")]
pub enum PayoutStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    #[sea_orm(string_value = "PAID")]
    Paid,
}

mirror_enum!(PayoutStatus <=> DomainPayoutStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "CompetitionStatus")]
pub enum CompetitionStatus {
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "FINISHED")]
    Finished,
}

mirror_enum!(CompetitionStatus <=> DomainCompetitionStatus { Active, Finished });

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "LeaderboardMetric")]
pub enum LeaderboardMetric {
    #[sea_orm(string_value = "SALES")]
    Sales,
    #[sea_orm(string_value = "REVENUE")]
    Revenue,
    #[sea_orm(string_value = "XP")]
    Xp,
}

mirror_enum!(LeaderboardMetric <=> DomainLeaderboardMetric { Sales, Revenue, Xp });
