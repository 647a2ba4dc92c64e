pub mod auth;
pub mod i18n;
pub mod origin;
pub mod rbac;
