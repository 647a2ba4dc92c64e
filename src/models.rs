pub mod auth;
pub mod report;
pub mod response;
pub mod ticket;
