pub mod template;
pub mod time;

pub use template::*;
pub use time::*;

#[cfg(test)]
#[path = "time_tests.rs"]
mod time_tests;
