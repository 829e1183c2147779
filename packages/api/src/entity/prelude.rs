pub use super::channel::Entity as Channel;
pub use super::client::Entity as Client;
pub use super::competition::Entity as Competition;
pub use super::manager::Entity as Manager;
pub use super::manager_payout::Entity as ManagerPayout;
pub use super::order::Entity as AdOrder;
pub use super::slot::Entity as Slot;
