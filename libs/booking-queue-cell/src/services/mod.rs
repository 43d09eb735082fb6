pub mod notifier;
pub mod register;

pub use notifier::*;
pub use register::*;
