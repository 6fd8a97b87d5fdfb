pub mod aggregate;
pub mod select;
pub mod types;

pub use aggregate::*;
pub use select::*;
pub use types::*;
