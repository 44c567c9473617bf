pub mod bridge;
pub mod event_bus;
pub mod renderer;
