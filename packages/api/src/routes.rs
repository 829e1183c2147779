pub mod assistant;
pub mod channels;
pub mod clients;
pub mod competitions;
pub mod health;
pub mod managers;
pub mod orders;
pub mod payouts;
pub mod pricing;
pub mod slots;
