pub mod dialer;
pub mod error;
pub mod resolver;
pub mod timer;
