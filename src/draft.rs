//! Client-side editable copy of the forest.
//!
//! Nodes live in three arenas and refer to each other by index, so an edit
//! touches one node instead of rebuilding nested vectors. Removing a node only
//! detaches it from its parent; a detached node is left out of the next
//! submission but stays in the arena until the draft is replaced.

use std::fmt::Display;

use crate::curriculum::{
    ChapterInput, Difficulty, LearningPath, LearningPathInput, SubChapter, SubChapterInput,
    progress::percentage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathKey(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChapterKey(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubChapterKey(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Path(PathKey),
    Chapter(ChapterKey),
    SubChapter(SubChapterKey),
}

impl From<PathKey> for NodeKey {
    fn from(key: PathKey) -> Self {
        NodeKey::Path(key)
    }
}
impl From<ChapterKey> for NodeKey {
    fn from(key: ChapterKey) -> Self {
        NodeKey::Chapter(key)
    }
}
impl From<SubChapterKey> for NodeKey {
    fn from(key: SubChapterKey) -> Self {
        NodeKey::SubChapter(key)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("node {0:?} is not in this draft")]
    UnknownNode(NodeKey),
    #[error("sub-chapter {0:?} has not been saved yet")]
    NotPersisted(SubChapterKey),
    #[error("failed to update sub-chapter {sub_chapter_id}: {reason}")]
    ToggleFailed {
        sub_chapter_id: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
struct PathNode {
    id: Option<String>,
    title: String,
    chapters: Vec<ChapterKey>,
}

#[derive(Debug, Clone)]
struct ChapterNode {
    id: Option<String>,
    parent: PathKey,
    title: String,
    sub_chapters: Vec<SubChapterKey>,
}

#[derive(Debug, Clone)]
struct SubChapterNode {
    id: Option<String>,
    parent: ChapterKey,
    title: String,
    completed: bool,
    difficulty: Difficulty,
    /// Bumped by every local toggle; only the newest pending toggle settles.
    generation: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Draft {
    roots: Vec<PathKey>,
    paths: Vec<PathNode>,
    chapters: Vec<ChapterNode>,
    sub_chapters: Vec<SubChapterNode>,
}

/// Completion of a path as currently held in the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftProgress {
    pub completed: usize,
    pub total: usize,
    pub percentage: u8,
}

/// A completion change applied locally and awaiting the server's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "settle the toggle once the server answers"]
pub struct PendingToggle {
    pub key: SubChapterKey,
    pub sub_chapter_id: String,
    pub previous: bool,
    pub requested: bool,
    generation: u64,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_forest(forest: &[LearningPath]) -> Self {
        let mut draft = Self::default();
        for path in forest {
            let p = draft.push_path(Some(path.id.clone()), path.title.clone());
            for chapter in &path.chapters {
                let c = draft.push_chapter(p, Some(chapter.id.clone()), chapter.title.clone());
                for sub in &chapter.sub_chapters {
                    let s = draft.push_sub_chapter(
                        c,
                        Some(sub.id.clone()),
                        sub.title.clone(),
                        sub.difficulty,
                    );
                    draft.sub_chapters[s.0].completed = sub.completed;
                }
            }
        }
        draft
    }

    /// Swaps the whole draft for the canonical forest the server returned.
    pub fn replace_with(&mut self, forest: &[LearningPath]) {
        *self = Self::from_forest(forest);
    }

    fn push_path(&mut self, id: Option<String>, title: String) -> PathKey {
        let key = PathKey(self.paths.len());
        self.paths.push(PathNode {
            id,
            title,
            chapters: Vec::new(),
        });
        self.roots.push(key);
        key
    }

    fn push_chapter(&mut self, parent: PathKey, id: Option<String>, title: String) -> ChapterKey {
        let key = ChapterKey(self.chapters.len());
        self.chapters.push(ChapterNode {
            id,
            parent,
            title,
            sub_chapters: Vec::new(),
        });
        self.paths[parent.0].chapters.push(key);
        key
    }

    fn push_sub_chapter(
        &mut self,
        parent: ChapterKey,
        id: Option<String>,
        title: String,
        difficulty: Difficulty,
    ) -> SubChapterKey {
        let key = SubChapterKey(self.sub_chapters.len());
        self.sub_chapters.push(SubChapterNode {
            id,
            parent,
            title,
            completed: false,
            difficulty,
            generation: 0,
        });
        self.chapters[parent.0].sub_chapters.push(key);
        key
    }

    fn check(&self, key: NodeKey) -> Result<(), DraftError> {
        let present = match key {
            NodeKey::Path(k) => k.0 < self.paths.len(),
            NodeKey::Chapter(k) => k.0 < self.chapters.len(),
            NodeKey::SubChapter(k) => k.0 < self.sub_chapters.len(),
        };
        if present {
            Ok(())
        } else {
            Err(DraftError::UnknownNode(key))
        }
    }

    pub fn add_path(&mut self, title: impl Into<String>) -> PathKey {
        self.push_path(None, title.into())
    }

    pub fn add_chapter(
        &mut self,
        path: PathKey,
        title: impl Into<String>,
    ) -> Result<ChapterKey, DraftError> {
        self.check(path.into())?;
        Ok(self.push_chapter(path, None, title.into()))
    }

    pub fn add_sub_chapter(
        &mut self,
        chapter: ChapterKey,
        title: impl Into<String>,
        difficulty: Difficulty,
    ) -> Result<SubChapterKey, DraftError> {
        self.check(chapter.into())?;
        Ok(self.push_sub_chapter(chapter, None, title.into(), difficulty))
    }

    pub fn rename(
        &mut self,
        key: impl Into<NodeKey>,
        title: impl Into<String>,
    ) -> Result<(), DraftError> {
        let key = key.into();
        self.check(key)?;
        let title = title.into();
        match key {
            NodeKey::Path(k) => self.paths[k.0].title = title,
            NodeKey::Chapter(k) => self.chapters[k.0].title = title,
            NodeKey::SubChapter(k) => self.sub_chapters[k.0].title = title,
        }
        Ok(())
    }

    /// Detaches a node (and with it its subtree) from its parent.
    pub fn remove(&mut self, key: impl Into<NodeKey>) -> Result<(), DraftError> {
        let key = key.into();
        self.check(key)?;
        match key {
            NodeKey::Path(k) => self.roots.retain(|&p| p != k),
            NodeKey::Chapter(k) => {
                let parent = self.chapters[k.0].parent;
                self.paths[parent.0].chapters.retain(|&c| c != k);
            }
            NodeKey::SubChapter(k) => {
                let parent = self.sub_chapters[k.0].parent;
                self.chapters[parent.0].sub_chapters.retain(|&s| s != k);
            }
        }
        Ok(())
    }

    pub fn paths(&self) -> &[PathKey] {
        &self.roots
    }

    pub fn chapters(&self, path: PathKey) -> &[ChapterKey] {
        self.paths
            .get(path.0)
            .map(|p| p.chapters.as_slice())
            .unwrap_or_default()
    }

    pub fn sub_chapters(&self, chapter: ChapterKey) -> &[SubChapterKey] {
        self.chapters
            .get(chapter.0)
            .map(|c| c.sub_chapters.as_slice())
            .unwrap_or_default()
    }

    pub fn title(&self, key: impl Into<NodeKey>) -> Option<&str> {
        match key.into() {
            NodeKey::Path(k) => self.paths.get(k.0).map(|n| n.title.as_str()),
            NodeKey::Chapter(k) => self.chapters.get(k.0).map(|n| n.title.as_str()),
            NodeKey::SubChapter(k) => self.sub_chapters.get(k.0).map(|n| n.title.as_str()),
        }
    }

    pub fn id(&self, key: impl Into<NodeKey>) -> Option<&str> {
        match key.into() {
            NodeKey::Path(k) => self.paths.get(k.0)?.id.as_deref(),
            NodeKey::Chapter(k) => self.chapters.get(k.0)?.id.as_deref(),
            NodeKey::SubChapter(k) => self.sub_chapters.get(k.0)?.id.as_deref(),
        }
    }

    pub fn is_completed(&self, key: SubChapterKey) -> Option<bool> {
        self.sub_chapters.get(key.0).map(|s| s.completed)
    }

    /// The forest to send to the server. Detached nodes are omitted and
    /// persisted ids travel with their nodes.
    pub fn submission(&self) -> Vec<LearningPathInput> {
        self.roots
            .iter()
            .map(|&p| {
                let path = &self.paths[p.0];
                LearningPathInput {
                    id: path.id.clone(),
                    title: path.title.clone(),
                    chapters: path
                        .chapters
                        .iter()
                        .map(|&c| {
                            let chapter = &self.chapters[c.0];
                            ChapterInput {
                                id: chapter.id.clone(),
                                title: chapter.title.clone(),
                                sub_chapters: chapter
                                    .sub_chapters
                                    .iter()
                                    .map(|&s| {
                                        let sub = &self.sub_chapters[s.0];
                                        SubChapterInput {
                                            id: sub.id.clone(),
                                            title: sub.title.clone(),
                                            difficulty: Some(sub.difficulty),
                                        }
                                    })
                                    .collect(),
                            }
                        })
                        .collect(),
                }
            })
            .collect()
    }

    /// True when every path in the draft has been saved before, i.e. the
    /// submission belongs to update rather than create.
    pub fn is_persisted(&self) -> bool {
        self.roots.iter().all(|p| self.paths[p.0].id.is_some())
    }

    pub fn progress(&self, path: PathKey) -> Option<DraftProgress> {
        let node = self.paths.get(path.0)?;
        let (mut completed, mut total) = (0, 0);
        for c in &node.chapters {
            for s in &self.chapters[c.0].sub_chapters {
                total += 1;
                if self.sub_chapters[s.0].completed {
                    completed += 1;
                }
            }
        }
        Some(DraftProgress {
            completed,
            total,
            percentage: percentage(completed, total),
        })
    }

    /// First phase of a completion change: applies it locally and returns
    /// the token to settle once the request finishes.
    pub fn begin_toggle(
        &mut self,
        key: SubChapterKey,
        completed: bool,
    ) -> Result<PendingToggle, DraftError> {
        self.check(key.into())?;
        let node = &mut self.sub_chapters[key.0];
        let sub_chapter_id = node.id.clone().ok_or(DraftError::NotPersisted(key))?;
        let previous = node.completed;
        node.completed = completed;
        node.generation += 1;
        Ok(PendingToggle {
            key,
            sub_chapter_id,
            previous,
            requested: completed,
            generation: node.generation,
        })
    }

    /// Second phase: keeps the server's value on success and reverts the local
    /// change on failure, returning the failure. Once a later toggle has been
    /// started on the same node, an older answer leaves the local value alone.
    pub fn settle<E: Display>(
        &mut self,
        pending: PendingToggle,
        outcome: Result<SubChapter, E>,
    ) -> Result<(), DraftError> {
        self.check(pending.key.into())?;
        let node = &mut self.sub_chapters[pending.key.0];
        let latest = node.generation == pending.generation;
        match outcome {
            Ok(sub) => {
                if latest {
                    node.completed = sub.completed;
                }
                Ok(())
            }
            Err(e) => {
                if latest {
                    node.completed = pending.previous;
                }
                Err(DraftError::ToggleFailed {
                    sub_chapter_id: pending.sub_chapter_id,
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::Chapter;

    fn saved_forest() -> Vec<LearningPath> {
        vec![LearningPath {
            id: "p1".into(),
            title: "DSA".into(),
            chapters: vec![Chapter {
                id: "c1".into(),
                learning_path_id: "p1".into(),
                title: "Arrays".into(),
                sub_chapters: vec![
                    SubChapter {
                        id: "s1".into(),
                        chapter_id: "c1".into(),
                        title: "Two Sum".into(),
                        completed: true,
                        difficulty: Difficulty::Easy,
                    },
                    SubChapter {
                        id: "s2".into(),
                        chapter_id: "c1".into(),
                        title: "3Sum".into(),
                        completed: false,
                        difficulty: Difficulty::Medium,
                    },
                ],
            }],
        }]
    }

    #[test]
    fn new_draft_submits_without_ids() {
        let mut draft = Draft::new();
        let p = draft.add_path("DSA");
        let c = draft.add_chapter(p, "Arrays").unwrap();
        draft.add_sub_chapter(c, "Two Sum", Difficulty::Hard).unwrap();
        assert!(!draft.is_persisted());

        let submission = draft.submission();
        assert_eq!(submission.len(), 1);
        assert_eq!(submission[0].id, None);
        let sub = &submission[0].chapters[0].sub_chapters[0];
        assert_eq!(sub.title, "Two Sum");
        assert_eq!(sub.difficulty, Some(Difficulty::Hard));
    }

    #[test]
    fn edits_keep_ids_and_removed_nodes_are_omitted() {
        let mut draft = Draft::from_forest(&saved_forest());
        assert!(draft.is_persisted());
        let p = draft.paths()[0];
        let c = draft.chapters(p)[0];
        let s2 = draft.sub_chapters(c)[1];

        draft.rename(c, "Arrays & Hashing").unwrap();
        draft.remove(s2).unwrap();
        let c2 = draft.add_chapter(p, "Graphs").unwrap();
        draft.add_sub_chapter(c2, "BFS", Difficulty::Easy).unwrap();

        let submission = draft.submission();
        let chapters = &submission[0].chapters;
        assert_eq!(submission[0].id.as_deref(), Some("p1"));
        assert_eq!(chapters[0].id.as_deref(), Some("c1"));
        assert_eq!(chapters[0].title, "Arrays & Hashing");
        assert_eq!(chapters[0].sub_chapters.len(), 1);
        assert_eq!(chapters[0].sub_chapters[0].id.as_deref(), Some("s1"));
        assert_eq!(chapters[1].id, None);
        assert_eq!(draft.title(s2), Some("3Sum"));
    }

    #[test]
    fn removing_a_path_drops_its_subtree() {
        let mut draft = Draft::from_forest(&saved_forest());
        let extra = draft.add_path("Scratch");
        draft.remove(draft.paths()[0]).unwrap();
        assert_eq!(draft.paths(), &[extra]);
        assert_eq!(draft.submission()[0].title, "Scratch");
    }

    #[test]
    fn foreign_keys_are_rejected() {
        let mut draft = Draft::new();
        let err = draft.add_chapter(PathKey(3), "x").unwrap_err();
        assert!(matches!(err, DraftError::UnknownNode(NodeKey::Path(PathKey(3)))));
    }

    #[test]
    fn progress_is_derived_from_current_flags() {
        let mut draft = Draft::from_forest(&saved_forest());
        let p = draft.paths()[0];
        assert_eq!(
            draft.progress(p),
            Some(DraftProgress {
                completed: 1,
                total: 2,
                percentage: 50,
            })
        );
        let c = draft.chapters(p)[0];
        let s2 = draft.sub_chapters(c)[1];
        let pending = draft.begin_toggle(s2, true).unwrap();
        assert_eq!(draft.progress(p).unwrap().percentage, 100);
        let _ = draft.settle::<String>(pending, Err("offline".into()));
        assert_eq!(draft.progress(p).unwrap().percentage, 50);
    }

    #[test]
    fn toggle_commits_server_value() {
        let mut draft = Draft::from_forest(&saved_forest());
        let c = draft.chapters(draft.paths()[0])[0];
        let s2 = draft.sub_chapters(c)[1];

        let pending = draft.begin_toggle(s2, true).unwrap();
        assert_eq!(pending.sub_chapter_id, "s2");
        assert_eq!(draft.is_completed(s2), Some(true));

        let mut confirmed = saved_forest()[0].chapters[0].sub_chapters[1].clone();
        confirmed.completed = true;
        draft.settle::<String>(pending, Ok(confirmed)).unwrap();
        assert_eq!(draft.is_completed(s2), Some(true));
    }

    #[test]
    fn failed_toggle_reverts_and_reports() {
        let mut draft = Draft::from_forest(&saved_forest());
        let c = draft.chapters(draft.paths()[0])[0];
        let s1 = draft.sub_chapters(c)[0];

        let pending = draft.begin_toggle(s1, false).unwrap();
        assert_eq!(draft.is_completed(s1), Some(false));
        let err = draft.settle(pending, Err("503")).unwrap_err();
        assert_eq!(draft.is_completed(s1), Some(true));
        assert!(matches!(
            err,
            DraftError::ToggleFailed { ref sub_chapter_id, .. } if sub_chapter_id == "s1"
        ));
    }

    #[test]
    fn failed_toggle_keeps_a_newer_local_change() {
        let mut draft = Draft::from_forest(&saved_forest());
        let c = draft.chapters(draft.paths()[0])[0];
        let s2 = draft.sub_chapters(c)[1];

        let first = draft.begin_toggle(s2, true).unwrap();
        let second = draft.begin_toggle(s2, false).unwrap();
        assert!(draft.settle(first, Err("timeout")).is_err());
        assert_eq!(draft.is_completed(s2), Some(false));
        assert!(second.previous);
    }

    #[test]
    fn stale_failure_keeps_latest_choice_after_flip_back() {
        let mut draft = Draft::from_forest(&saved_forest());
        let c = draft.chapters(draft.paths()[0])[0];
        let s2 = draft.sub_chapters(c)[1];

        let first = draft.begin_toggle(s2, true).unwrap();
        let _second = draft.begin_toggle(s2, false).unwrap();
        let third = draft.begin_toggle(s2, true).unwrap();
        assert!(draft.settle(first, Err("timeout")).is_err());
        assert_eq!(draft.is_completed(s2), Some(true));

        assert!(draft.settle(third, Err("timeout")).is_err());
        assert_eq!(draft.is_completed(s2), Some(false));
    }

    #[test]
    fn stale_success_does_not_overwrite_newer_local_value() {
        let mut draft = Draft::from_forest(&saved_forest());
        let c = draft.chapters(draft.paths()[0])[0];
        let s2 = draft.sub_chapters(c)[1];

        let first = draft.begin_toggle(s2, true).unwrap();
        let second = draft.begin_toggle(s2, false).unwrap();
        let mut confirmed = saved_forest()[0].chapters[0].sub_chapters[1].clone();
        confirmed.completed = true;
        draft.settle::<String>(first, Ok(confirmed.clone())).unwrap();
        assert_eq!(draft.is_completed(s2), Some(false));

        confirmed.completed = false;
        draft.settle::<String>(second, Ok(confirmed)).unwrap();
        assert_eq!(draft.is_completed(s2), Some(false));
    }

    #[test]
    fn unsaved_sub_chapter_cannot_toggle() {
        let mut draft = Draft::new();
        let p = draft.add_path("DSA");
        let c = draft.add_chapter(p, "Arrays").unwrap();
        let s = draft.add_sub_chapter(c, "Two Sum", Difficulty::Easy).unwrap();
        assert!(matches!(draft.begin_toggle(s, true), Err(DraftError::NotPersisted(_))));
        assert_eq!(draft.is_completed(s), Some(false));
    }

    #[test]
    fn replace_with_takes_server_ids() {
        let mut draft = Draft::new();
        draft.add_path("DSA");
        draft.replace_with(&saved_forest());
        assert_eq!(draft.id(draft.paths()[0]), Some("p1"));
        assert_eq!(draft.paths().len(), 1);
    }
}
