pub mod draw_engine;
pub mod draw_service;
pub mod registration_service;
pub mod serial_validator;

pub use draw_engine::*;
pub use draw_service::*;
pub use registration_service::*;
pub use serial_validator::*;
