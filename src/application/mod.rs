pub mod daily_summary;
pub mod label_generator;
pub mod matrix_builder;
pub mod partitioner;
pub mod pipeline;
pub mod ranking;
pub mod ticker_summary;
pub mod topic_aggregator;
