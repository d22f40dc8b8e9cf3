//! File-based lesson content
//!
//! One directory per topic under the lessons root:
//!
//! ```text
//! lessons/
//!   photosynthesis/
//!     metadata.json     titles (required for the topic to be listed)
//!     content_en.txt    English material
//!     content_bn.txt    Bangla material (falls back to English)
//!     quiz.json         optional question list
//! ```

pub mod store;
pub mod types;

pub use store::LessonStore;
pub use types::{LessonError, LessonMetadata, LessonSummary, QuizQuestion};
