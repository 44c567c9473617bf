pub mod config;
pub mod controller;
pub mod performance;
pub mod record;
pub mod state;
pub mod tree;
