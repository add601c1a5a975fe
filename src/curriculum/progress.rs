use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{
    library::Library,
    model::{Chapter, LearningPath},
};
use crate::error::Result;

/// Completion counts for one chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChapterProgress {
    pub chapter_id: String,
    pub completed: usize,
    pub total: usize,
}

/// Completion of a path, computed from its current sub-chapters. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PathProgress {
    pub learning_path_id: String,
    pub completed: usize,
    pub total: usize,
    /// Rounded to the nearest integer, 0 for a path without sub-chapters.
    pub percentage: u8,
    pub chapters: Vec<ChapterProgress>,
}

pub fn percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed * 200 + total) / (total * 2)) as u8
}

impl Chapter {
    pub fn progress(&self) -> ChapterProgress {
        ChapterProgress {
            chapter_id: self.id.clone(),
            completed: self.sub_chapters.iter().filter(|s| s.completed).count(),
            total: self.sub_chapters.len(),
        }
    }
}

impl LearningPath {
    pub fn progress(&self) -> PathProgress {
        let chapters: Vec<_> = self.chapters.iter().map(Chapter::progress).collect();
        let completed = chapters.iter().map(|c| c.completed).sum();
        let total = chapters.iter().map(|c| c.total).sum();
        PathProgress {
            learning_path_id: self.id.clone(),
            completed,
            total,
            percentage: percentage(completed, total),
            chapters,
        }
    }
}

impl Library {
    pub async fn progress(&self, path_id: &str) -> Result<PathProgress> {
        Ok(self.read_one(path_id).await?.progress())
    }
}
