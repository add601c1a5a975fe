use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown difficulty: {0}")]
pub struct ParseDifficultyError(String);

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Easy" => Ok(Difficulty::Easy),
            "Medium" => Ok(Difficulty::Medium),
            "Hard" => Ok(Difficulty::Hard),
            other => Err(ParseDifficultyError(other.to_string())),
        }
    }
}

/// A persisted curriculum, fully expanded through its chapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    pub id: String,
    pub title: String,
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    pub learning_path_id: String,
    pub title: String,
    pub sub_chapters: Vec<SubChapter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubChapter {
    pub id: String,
    pub chapter_id: String,
    pub title: String,
    pub completed: bool,
    pub difficulty: Difficulty,
}

/// A path as submitted by a client. `id` is only trusted by update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub chapters: Vec<ChapterInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChapterInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub sub_chapters: Vec<SubChapterInput>,
}

/// `completed` is not part of the submission; it only changes through the
/// completion toggle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubChapterInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
}

fn check_title(kind: &str, title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{kind} title is empty")));
    }
    Ok(())
}

impl LearningPathInput {
    /// Rejects blank titles at every level. With `require_id`, the path itself
    /// must name the stored record it edits.
    pub fn validate(&self, require_id: bool) -> Result<()> {
        check_title("learning path", &self.title)?;
        if require_id && self.id.as_deref().is_none_or(|id| id.trim().is_empty()) {
            return Err(Error::InvalidInput(format!(
                "learning path \"{}\" has no id",
                self.title
            )));
        }
        for chapter in &self.chapters {
            check_title("chapter", &chapter.title)?;
            for sub_chapter in &chapter.sub_chapters {
                check_title("sub-chapter", &sub_chapter.title)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PathRow {
    pub id: String,
    pub title: String,
}

#[derive(Debug, FromRow)]
pub(crate) struct ChapterRow {
    pub id: String,
    pub learning_path_id: String,
    pub title: String,
}

#[derive(Debug, FromRow)]
pub(crate) struct SubChapterRow {
    pub id: String,
    pub chapter_id: String,
    pub title: String,
    pub completed: bool,
    pub difficulty: String,
}

impl TryFrom<SubChapterRow> for SubChapter {
    type Error = Error;

    fn try_from(row: SubChapterRow) -> Result<Self> {
        let difficulty = row
            .difficulty
            .parse()
            .map_err(|e| Error::Storage(sqlx::Error::Decode(Box::new(e))))?;
        Ok(SubChapter {
            id: row.id,
            chapter_id: row.chapter_id,
            title: row.title,
            completed: row.completed,
            difficulty,
        })
    }
}

/// Builds trees from flat rows. Rows keep their storage order; children whose
/// parent is missing from `paths`/`chapters` are dropped.
pub(crate) fn assemble(
    paths: Vec<PathRow>,
    chapters: Vec<ChapterRow>,
    sub_chapters: Vec<SubChapterRow>,
) -> Result<Vec<LearningPath>> {
    let mut forest: Vec<LearningPath> = Vec::with_capacity(paths.len());
    let mut path_index = HashMap::with_capacity(paths.len());
    for row in paths {
        path_index.insert(row.id.clone(), forest.len());
        forest.push(LearningPath {
            id: row.id,
            title: row.title,
            chapters: Vec::new(),
        });
    }

    // chapter id -> (path index, chapter index)
    let mut chapter_index = HashMap::with_capacity(chapters.len());
    for row in chapters {
        let Some(&p) = path_index.get(&row.learning_path_id) else {
            continue;
        };
        let path = &mut forest[p];
        chapter_index.insert(row.id.clone(), (p, path.chapters.len()));
        path.chapters.push(Chapter {
            id: row.id,
            learning_path_id: row.learning_path_id,
            title: row.title,
            sub_chapters: Vec::new(),
        });
    }

    for row in sub_chapters {
        let Some(&(p, c)) = chapter_index.get(&row.chapter_id) else {
            continue;
        };
        forest[p].chapters[c].sub_chapters.push(row.try_into()?);
    }
    Ok(forest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_accepts_client_payload_shape() {
        let json = r#"[{
            "id": "1718000000000",
            "title": "DSA",
            "chapters": [{
                "title": "Arrays",
                "subChapters": [{ "title": "Two Sum", "completed": true, "difficulty": "Hard" }]
            }]
        }]"#;
        let forest: Vec<LearningPathInput> = serde_json::from_str(json).unwrap();
        assert_eq!(forest[0].id.as_deref(), Some("1718000000000"));
        let sub = &forest[0].chapters[0].sub_chapters[0];
        assert_eq!(sub.title, "Two Sum");
        assert_eq!(sub.difficulty, Some(Difficulty::Hard));
    }

    #[test]
    fn validate_rejects_blank_titles_and_missing_ids() {
        let mut path = LearningPathInput {
            id: None,
            title: "DSA".into(),
            chapters: vec![ChapterInput {
                id: None,
                title: "  ".into(),
                sub_chapters: vec![],
            }],
        };
        assert!(matches!(path.validate(false), Err(Error::InvalidInput(_))));
        path.chapters[0].title = "Arrays".into();
        assert!(path.validate(false).is_ok());
        assert!(matches!(path.validate(true), Err(Error::InvalidInput(_))));
        path.id = Some("p".into());
        assert!(path.validate(true).is_ok());
    }

    fn path_row(id: &str, title: &str) -> PathRow {
        PathRow {
            id: id.into(),
            title: title.into(),
        }
    }

    fn chapter_row(id: &str, learning_path_id: &str, title: &str) -> ChapterRow {
        ChapterRow {
            id: id.into(),
            learning_path_id: learning_path_id.into(),
            title: title.into(),
        }
    }

    #[test]
    fn assemble_nests_rows_in_order() {
        let paths = vec![path_row("p1", "One"), path_row("p2", "Two")];
        let chapters = vec![
            chapter_row("c2", "p2", "B"),
            chapter_row("c1", "p1", "A"),
            chapter_row("c3", "p1", "C"),
        ];
        let subs = vec![SubChapterRow {
            id: "s1".into(),
            chapter_id: "c3".into(),
            title: "x".into(),
            completed: true,
            difficulty: "Medium".into(),
        }];
        let forest = assemble(paths, chapters, subs).unwrap();
        assert_eq!(forest.len(), 2);
        let titles: Vec<_> = forest[0].chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["A", "C"]);
        assert_eq!(forest[0].chapters[1].sub_chapters[0].difficulty, Difficulty::Medium);
        assert_eq!(forest[1].chapters[0].id, "c2");
    }

    #[test]
    fn unknown_difficulty_is_a_storage_error() {
        let row = SubChapterRow {
            id: "s".into(),
            chapter_id: "c".into(),
            title: "t".into(),
            completed: false,
            difficulty: "Impossible".into(),
        };
        assert!(matches!(SubChapter::try_from(row), Err(Error::Storage(_))));
    }
}
