pub mod config;
pub mod consolidate;
pub mod error;
pub mod output;
pub mod period;
pub mod pipeline;
pub mod population;
pub mod region;
pub mod revenue;
pub mod sheet;
