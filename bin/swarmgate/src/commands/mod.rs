pub mod check;
pub mod config_cmd;
pub mod match_cmd;
pub mod stats;
