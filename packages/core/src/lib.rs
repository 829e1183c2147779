//! Slot reservation, order workflow and manager progression for advertising
//! slot sales on messaging channels.

pub mod clock;
pub mod competition;
pub mod config;
pub mod directory;
pub mod ledger;
pub mod model;
pub mod orders;
pub mod payouts;
pub mod posting;
pub mod pricing;
pub mod progression;
pub mod store;

mod services;

pub use services::Services;

pub fn create_id() -> String {
    cuid2::create_id()
}
