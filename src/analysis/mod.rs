pub mod champion_pool;
pub mod grading;
pub mod query;
pub mod stat_aggregator;
