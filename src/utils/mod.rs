pub mod inventory_target;
pub mod jwt;
pub mod reward_quota;
pub mod stock_delta;

pub use inventory_target::select_target_inventory;
pub use jwt::*;
pub use reward_quota::{NoPrizeQuota, calculate_no_prize_quota, reward_probability};
pub use stock_delta::{RewardAllocation, StockDelta, StockOverflow, compute_stock_deltas};
