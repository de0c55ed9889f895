pub mod campaign_service;
pub mod inventory_service;
pub mod play_service;
pub mod stock_reconciliation_service;

pub use campaign_service::*;
pub use inventory_service::*;
pub use play_service::*;
pub use stock_reconciliation_service::*;
