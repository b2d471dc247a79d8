mod telegram;

pub use telegram::*;
