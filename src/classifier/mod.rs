mod adapter;
mod engine;
mod tract;

pub use adapter::{Classification, ClassifierAdapter, CLASS_COUNT};
pub use engine::{FixedEngine, InferenceEngine};
pub use tract::TractEngine;
