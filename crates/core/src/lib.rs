#![forbid(unsafe_code)]

pub mod model;
pub mod scoring;
pub mod time;

pub use scoring::QuizRules;
pub use time::Clock;
