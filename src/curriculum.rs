pub mod completion;
pub mod library;
pub mod model;
pub mod progress;
pub mod reconcile;

pub use library::Library;
pub use model::{
    Chapter, ChapterInput, Difficulty, LearningPath, LearningPathInput, SubChapter,
    SubChapterInput,
};
pub use progress::{ChapterProgress, PathProgress};
