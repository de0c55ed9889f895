pub mod campaign_plays;
pub mod campaign_rewards;
pub mod campaigns;
pub mod organizations;
pub mod product_inventory;
pub mod stock_movements;

pub use campaign_plays as campaign_play_entity;
pub use campaign_rewards as campaign_reward_entity;
pub use campaigns as campaign_entity;
pub use organizations as organization_entity;
pub use product_inventory as inventory_entity;
pub use stock_movements as stock_movement_entity;

pub use campaign_rewards::RewardType;
pub use campaigns::{CampaignStatus, GameType};
pub use stock_movements::MovementType;
