pub mod campaign;
pub mod common;
pub mod inventory;
pub mod pagination;
pub mod play;

pub use campaign::*;
pub use common::*;
pub use inventory::*;
pub use pagination::*;
pub use play::*;
