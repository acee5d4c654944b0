pub mod feeds;
pub mod market;
