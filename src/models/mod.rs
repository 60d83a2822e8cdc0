pub mod backup_event;
pub mod backup_log_record;
pub mod backup_request;
pub mod backup_result;
pub mod config;
pub mod config_validator;
pub mod error;
