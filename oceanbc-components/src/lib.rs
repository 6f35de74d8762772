//! Ocean base models and the modifiers that adjust their outputs.

pub mod factory;
pub mod models;
pub mod modifiers;

pub use factory::OceanFactory;
