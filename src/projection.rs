pub mod engine;
pub mod item;

pub use engine::{ProjectionConfig, ProjectionEngine};
pub use item::{DisplayItem, ItemKind, ViewEffect, VisualStatus};

#[cfg(test)]
mod tests;
