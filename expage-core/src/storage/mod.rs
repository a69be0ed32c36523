pub mod file_sink;
pub mod log_entry;
pub mod routing;
