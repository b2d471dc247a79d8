mod app;
mod env;
mod scheduler;

pub use app::*;
