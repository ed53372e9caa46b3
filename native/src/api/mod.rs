pub mod diagnostics;
pub mod saapi;

pub use diagnostics::*;
pub use saapi::*;
