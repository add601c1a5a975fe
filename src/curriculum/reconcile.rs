//! Reconciles a client-held forest against stored state.
//!
//! Each top-level path is written in its own transaction and the paths of a
//! batch run concurrently. Nodes left out of a submission are never removed.

use futures::future::join_all;
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    library::{Library, load_path},
    model::{ChapterInput, Difficulty, LearningPath, LearningPathInput, SubChapterInput},
};
use crate::error::{Error, Result};

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl Library {
    /// Persists every submitted tree as new records, ignoring any ids the
    /// client sent. Returns the canonical forest in submission order.
    pub async fn create(&self, forest: Vec<LearningPathInput>) -> Result<Vec<LearningPath>> {
        for path in &forest {
            path.validate(false)?;
        }
        let results = join_all(forest.iter().map(|path| self.create_path(path))).await;
        let created = results.into_iter().collect::<Result<Vec<_>>>()?;
        info!("created {} learning paths", created.len());
        Ok(created)
    }

    /// Upserts every submitted tree: matched ids are edited in place, unmatched
    /// or missing ids are created under their submitted parent.
    pub async fn update(&self, forest: Vec<LearningPathInput>) -> Result<Vec<LearningPath>> {
        for path in &forest {
            path.validate(true)?;
        }
        let results = join_all(forest.iter().map(|path| self.update_path(path))).await;
        let updated = results.into_iter().collect::<Result<Vec<_>>>()?;
        info!("updated {} learning paths", updated.len());
        Ok(updated)
    }

    async fn create_path(&self, path: &LearningPathInput) -> Result<LearningPath> {
        let mut tx = self.database.begin().await?;
        let path_id = new_id();
        sqlx::query("insert into learning_path (id, title) values (?, ?)")
            .bind(&path_id)
            .bind(&path.title)
            .execute(&mut *tx)
            .await?;
        for chapter in &path.chapters {
            insert_chapter(&mut tx, &path_id, chapter).await?;
        }
        let created = load_path(&mut tx, &path_id).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn update_path(&self, path: &LearningPathInput) -> Result<LearningPath> {
        let path_id = path.id.as_deref().unwrap_or_default();
        let mut tx = self.database.begin().await?;
        let updated = sqlx::query("update learning_path set title = ? where id = ?")
            .bind(&path.title)
            .bind(path_id)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(Error::not_found("learning path", path_id));
        }
        for chapter in &path.chapters {
            upsert_chapter(&mut tx, path_id, chapter).await?;
        }
        let canonical = load_path(&mut tx, path_id).await?;
        tx.commit().await?;
        Ok(canonical)
    }
}

async fn insert_chapter(
    conn: &mut SqliteConnection,
    path_id: &str,
    chapter: &ChapterInput,
) -> Result<String> {
    let chapter_id = new_id();
    sqlx::query("insert into chapter (id, learning_path_id, title) values (?, ?, ?)")
        .bind(&chapter_id)
        .bind(path_id)
        .bind(&chapter.title)
        .execute(&mut *conn)
        .await?;
    for sub_chapter in &chapter.sub_chapters {
        insert_sub_chapter(conn, &chapter_id, sub_chapter).await?;
    }
    Ok(chapter_id)
}

async fn insert_sub_chapter(
    conn: &mut SqliteConnection,
    chapter_id: &str,
    sub_chapter: &SubChapterInput,
) -> Result<String> {
    let sub_chapter_id = new_id();
    let difficulty = sub_chapter.difficulty.unwrap_or_default();
    sqlx::query(
        "insert into sub_chapter (id, chapter_id, title, completed, difficulty) \
         values (?, ?, ?, false, ?)",
    )
    .bind(&sub_chapter_id)
    .bind(chapter_id)
    .bind(&sub_chapter.title)
    .bind(difficulty.as_str())
    .execute(&mut *conn)
    .await?;
    Ok(sub_chapter_id)
}

/// A chapter id only matches a chapter already owned by `path_id`; anything
/// else becomes a new chapter with all of its sub-chapters.
async fn upsert_chapter(
    conn: &mut SqliteConnection,
    path_id: &str,
    chapter: &ChapterInput,
) -> Result<()> {
    if let Some(chapter_id) = chapter.id.as_deref() {
        let updated =
            sqlx::query("update chapter set title = ? where id = ? and learning_path_id = ?")
                .bind(&chapter.title)
                .bind(chapter_id)
                .bind(path_id)
                .execute(&mut *conn)
                .await?;
        if updated.rows_affected() > 0 {
            for sub_chapter in &chapter.sub_chapters {
                upsert_sub_chapter(conn, chapter_id, sub_chapter).await?;
            }
            return Ok(());
        }
        debug!("chapter {} not under path {}, creating", chapter_id, path_id);
    }
    insert_chapter(conn, path_id, chapter).await?;
    Ok(())
}

async fn upsert_sub_chapter(
    conn: &mut SqliteConnection,
    chapter_id: &str,
    sub_chapter: &SubChapterInput,
) -> Result<()> {
    if let Some(sub_chapter_id) = sub_chapter.id.as_deref() {
        let updated = sqlx::query(
            "update sub_chapter set title = ?, difficulty = coalesce(?, difficulty) \
             where id = ? and chapter_id = ?",
        )
        .bind(&sub_chapter.title)
        .bind(sub_chapter.difficulty.map(|d: Difficulty| d.as_str()))
        .bind(sub_chapter_id)
        .bind(chapter_id)
        .execute(&mut *conn)
        .await?;
        if updated.rows_affected() > 0 {
            return Ok(());
        }
    }
    insert_sub_chapter(conn, chapter_id, sub_chapter).await?;
    Ok(())
}
