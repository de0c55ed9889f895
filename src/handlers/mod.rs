pub mod campaign;
pub mod inventory;
pub mod play;

pub use campaign::campaign_config;
pub use inventory::inventory_config;
pub use play::play_config;
