pub mod inference;
pub mod model_loader;

pub use inference::{InferencePipeline, Invocation, OUTPUT_COLUMN};
pub use model_loader::{load_artifact, ModelLoader, SharedScorer};
