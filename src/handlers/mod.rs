pub mod idea_handlers;

pub use idea_handlers::configure;
