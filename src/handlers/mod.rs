pub mod draw;
pub mod registration;
pub mod serial;

pub use draw::draw_config;
pub use registration::registration_config;
pub use serial::serial_config;
