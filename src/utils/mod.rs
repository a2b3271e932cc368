pub mod identity;
pub mod sequence;
pub mod serial;

pub use identity::*;
pub use sequence::{Sequenced, Ticket};
pub use serial::{NormalizationRule, normalize_serial, validate_serial_format};
