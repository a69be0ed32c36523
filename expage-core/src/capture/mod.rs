pub mod backtrace;
pub mod hook;
pub mod listener;
