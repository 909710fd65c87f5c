#![forbid(unsafe_code)]

pub mod gate;
pub mod model;
pub mod scoring;
pub mod selector;
pub mod time;
pub mod timer;

pub use time::Clock;
pub use timer::QuestionTimer;
