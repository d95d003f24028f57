pub mod aggregate;
pub mod dedup;
pub mod diff;
pub mod emit;
pub mod input;
pub mod json_logger;
pub mod normalize;
pub mod status;
pub mod track;

pub mod config;
pub mod persistence;
pub mod pipeline;
pub mod popularity;
