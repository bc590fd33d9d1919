use anyhow::{anyhow, Result};

use crate::detect::backend::{ObjectModel, RawCandidate};
use crate::frame::Frame;

/// Scripted model for testing. Returns the same candidates for every frame,
/// or fails every call.
pub struct StubModel {
    name: String,
    outcome: Result<Vec<RawCandidate>, String>,
}

impl StubModel {
    pub fn new(name: impl Into<String>, candidates: Vec<RawCandidate>) -> Self {
        Self {
            name: name.into(),
            outcome: Ok(candidates),
        }
    }

    /// A model whose every inference fails with `message`.
    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: Err(message.into()),
        }
    }
}

impl ObjectModel for StubModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn infer(&self, _frame: &Frame, _threshold: f32) -> Result<Vec<RawCandidate>> {
        match &self.outcome {
            Ok(candidates) => Ok(candidates.clone()),
            Err(message) => Err(anyhow!("{}", message)),
        }
    }
}
