//! `SeaORM` entities for the booking tables
//!
//! Hand-maintained to match the migration schema. Every table carries a
//! `version` column used as the compare-and-set guard on updates.

pub mod prelude;

pub mod channel;
pub mod client;
pub mod competition;
pub mod manager;
pub mod manager_payout;
pub mod order;
pub mod sea_orm_active_enums;
pub mod slot;
