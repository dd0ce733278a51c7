#[cfg(test)]
#[macro_use]
mod test_macros;

pub mod command_util;
pub mod config;
pub mod decision;
pub mod error;
pub mod library;
pub mod live_status;
pub mod models;
pub mod notifier;
pub mod player;
pub mod quiet_hours;
pub mod selector;
pub mod tracing_ext;

mod file_util;
