pub mod auth;
pub mod cart;
pub mod dashboard;
pub mod deliveries;
pub mod orders;
pub mod payments;
pub mod products;
