pub mod logging;
pub mod error;
pub mod util;

pub mod components;
pub mod envs;
pub mod agents;
pub mod metrics;
pub mod engines;

pub mod configs;
pub mod registry;
pub mod cli;
