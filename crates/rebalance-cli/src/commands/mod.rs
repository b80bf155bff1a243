pub mod rebalance;
