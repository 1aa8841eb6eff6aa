pub mod market;
pub mod opportunity;
pub mod signal;

pub use market::*;
pub use opportunity::*;
pub use signal::*;
