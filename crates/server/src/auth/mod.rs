pub mod limiter;
pub mod session;
pub mod token;
pub mod utils;
