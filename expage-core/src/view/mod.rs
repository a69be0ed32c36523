pub mod hosted;
pub mod placeholder;
pub mod terminal;
