pub mod auth;
pub mod health;
pub mod messages;
pub mod reports;
pub mod tickets;
pub mod uploads;
pub mod users;
pub mod workflow;
