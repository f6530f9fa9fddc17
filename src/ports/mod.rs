//! Port traits: the seams between the domain core and the outside world.

pub mod config_port;
pub mod data_port;
pub mod event_port;
pub mod order_port;
pub mod repository_port;
