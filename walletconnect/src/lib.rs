pub mod cli;
pub mod config;
pub mod constants;
pub mod device;
pub mod errors;
pub mod flow;
pub mod normalize;
pub mod session;
pub mod storage;
pub mod types;
