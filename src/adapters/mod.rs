//! Concrete adapter implementations for ports.

pub mod channel_event_publisher;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod logging_order_sink;
pub mod memory_repository;
