use std::str::FromStr;

use sqlx::{
    SqliteConnection, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::info;

use super::model::{ChapterRow, LearningPath, PathRow, SubChapterRow, assemble};
use crate::error::{Error, Result};

/// Handle on the curriculum store. Every operation reads and writes the
/// database directly; nothing is cached.
#[derive(Debug, Clone)]
pub struct Library {
    pub database: SqlitePool,
}

impl Library {
    /// Wraps an existing pool and brings its schema up to date.
    pub async fn new(database: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&database)
            .await
            .map_err(sqlx::Error::from)?;
        Ok(Self { database })
    }

    /// Opens (creating if missing) the database at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool_options = if url.contains(":memory:") {
            // one connection that never expires, or the data goes with it
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };
        let database = pool_options.connect_with(options).await?;
        info!("connected to database {}", url);
        Self::new(database).await
    }

    /// Every path, expanded through chapters and sub-chapters, in insertion
    /// order.
    pub async fn read_all(&self) -> Result<Vec<LearningPath>> {
        let mut conn = self.database.acquire().await?;
        load_forest(&mut conn, None).await
    }

    pub async fn read_one(&self, path_id: &str) -> Result<LearningPath> {
        let mut conn = self.database.acquire().await?;
        load_path(&mut conn, path_id).await
    }
}

pub(crate) async fn load_path(conn: &mut SqliteConnection, path_id: &str) -> Result<LearningPath> {
    load_forest(conn, Some(path_id))
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("learning path", path_id))
}

/// Three flat reads assembled in memory; `path_id` narrows all of them to a
/// single tree.
pub(crate) async fn load_forest(
    conn: &mut SqliteConnection,
    path_id: Option<&str>,
) -> Result<Vec<LearningPath>> {
    let paths = sqlx::query_as::<_, PathRow>(
        "select id, title from learning_path where (?1 is null or id = ?1) order by rowid",
    )
    .bind(path_id)
    .fetch_all(&mut *conn)
    .await?;
    let chapters = sqlx::query_as::<_, ChapterRow>(
        "select id, learning_path_id, title from chapter \
         where (?1 is null or learning_path_id = ?1) order by rowid",
    )
    .bind(path_id)
    .fetch_all(&mut *conn)
    .await?;
    let sub_chapters = sqlx::query_as::<_, SubChapterRow>(
        "select s.id, s.chapter_id, s.title, s.completed, s.difficulty \
         from sub_chapter s inner join chapter c on c.id = s.chapter_id \
         where (?1 is null or c.learning_path_id = ?1) order by s.rowid",
    )
    .bind(path_id)
    .fetch_all(&mut *conn)
    .await?;
    assemble(paths, chapters, sub_chapters)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) async fn memory_library() -> Library {
        Library::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn empty_store_reads_empty_forest() {
        let library = memory_library().await;
        assert!(library.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_one_unknown_path_is_not_found() {
        let library = memory_library().await;
        let err = library.read_one("missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "learning path", .. }));
    }

    #[tokio::test]
    async fn foreign_keys_cascade_on_path_delete() {
        let library = memory_library().await;
        sqlx::query("insert into learning_path (id, title) values ('p', 'P')")
            .execute(&library.database)
            .await
            .unwrap();
        sqlx::query("insert into chapter (id, learning_path_id, title) values ('c', 'p', 'C')")
            .execute(&library.database)
            .await
            .unwrap();
        sqlx::query("delete from learning_path where id = 'p'")
            .execute(&library.database)
            .await
            .unwrap();
        let (count,): (i64,) = sqlx::query_as("select count(*) from chapter")
            .fetch_one(&library.database)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
