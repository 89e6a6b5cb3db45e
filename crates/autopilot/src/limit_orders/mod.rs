mod balance_tracker;
mod metrics;
mod quoter;

pub use balance_tracker::BalanceTracker;
pub use metrics::LimitOrderMetrics;
pub use quoter::LimitOrderQuoter;
