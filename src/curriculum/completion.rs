use tracing::info;

use super::{
    library::Library,
    model::{SubChapter, SubChapterRow},
};
use crate::error::{Error, Result};

impl Library {
    /// Overwrites the `completed` flag of one sub-chapter. Parents are not
    /// touched; progress is derived on read.
    pub async fn set_completed(&self, sub_chapter_id: &str, completed: bool) -> Result<SubChapter> {
        let row = sqlx::query_as::<_, SubChapterRow>(
            "update sub_chapter set completed = ? where id = ? \
             returning id, chapter_id, title, completed, difficulty",
        )
        .bind(completed)
        .bind(sub_chapter_id)
        .fetch_optional(&self.database)
        .await?
        .ok_or_else(|| Error::not_found("sub-chapter", sub_chapter_id))?;
        info!("sub-chapter {} completed = {}", sub_chapter_id, completed);
        row.try_into()
    }
}
