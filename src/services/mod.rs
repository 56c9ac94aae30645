//! Business logic services layer

pub mod account_service;
pub mod audit_service;

pub use account_service::AccountService;
pub use audit_service::AuditService;
