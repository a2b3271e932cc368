pub mod common;
pub mod draw;
pub mod registration;
pub mod serial;
pub mod validation;

pub use common::*;
pub use draw::*;
pub use registration::*;
pub use serial::*;
pub use validation::*;
