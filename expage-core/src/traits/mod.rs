pub mod template_engine;
pub mod view;
