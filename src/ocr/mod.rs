pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;

pub use engine::{OcrEngine, TesseractEngine};
pub use extract::{FrameOutcome, RegionExtractor, Rejection};
pub use setup::ensure_tesseract;
