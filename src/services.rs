pub mod auth;
pub mod export;
pub mod notifier;
pub mod report_service;
pub mod sla;
pub mod ticket_service;
pub mod upload_service;
pub mod user_service;
pub mod workflow;
