use std::future::Future;

use sqlx::postgres::PgPool;
use thiserror::Error;

use super::word::Word;

/// Number of wrong options offered next to the correct translation.
pub const DISTRACTOR_COUNT: usize = 3;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Catalog and personal-list storage consumed by the quiz runner.
pub trait WordRepository: Send + Sync + 'static {
    /// Up to `limit` catalog entries in random order.
    fn random_words(&self, limit: usize) -> impl Future<Output = RepositoryResult<Vec<Word>>> + Send;

    /// Up to `count` wrong answers for `correct`.
    ///
    /// Entries whose English text contains the first three letters of the
    /// correct translation (case-insensitive) are preferred; the rest is
    /// padded with random entries until `count` is reached or the catalog
    /// runs out.
    fn distractors(
        &self,
        correct: &Word,
        count: usize,
    ) -> impl Future<Output = RepositoryResult<Vec<Word>>> + Send;

    /// The user's active entries in random order, optionally capped.
    fn active_words(
        &self,
        user_id: i64,
        limit: Option<usize>,
    ) -> impl Future<Output = RepositoryResult<Vec<Word>>> + Send;

    fn is_active(
        &self,
        user_id: i64,
        word_id: i32,
    ) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Adds the entry to the user's list, reactivating an existing link.
    fn activate(&self, user_id: i64, word_id: i32) -> impl Future<Output = RepositoryResult<()>> + Send;

    /// Marks the link inactive. The row is kept.
    fn deactivate(
        &self,
        user_id: i64,
        word_id: i32,
    ) -> impl Future<Output = RepositoryResult<()>> + Send;
}

pub struct Connection {
    pool: PgPool,
}

impl Connection {
    pub async fn connect(connection_string: &str) -> RepositoryResult<Self> {
        let pool = PgPool::connect(connection_string).await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> RepositoryResult<()> {
        tracing::info!("Running database migrations");
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }
}

/// Turns the first letters of `en` into an `ILIKE` pattern, escaping wildcards.
pub(crate) fn similarity_pattern(en: &str) -> String {
    let prefix: String = en.to_lowercase().chars().take(3).collect();
    let mut pattern = String::with_capacity(prefix.len() + 2);
    pattern.push('%');
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

impl WordRepository for Connection {
    async fn random_words(&self, limit: usize) -> RepositoryResult<Vec<Word>> {
        let words = sqlx::query_as::<_, Word>(
            "SELECT id, ru, en FROM words ORDER BY random() LIMIT $1",
        )
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(words)
    }

    async fn distractors(&self, correct: &Word, count: usize) -> RepositoryResult<Vec<Word>> {
        let mut words = sqlx::query_as::<_, Word>(
            "SELECT id, ru, en FROM words WHERE id <> $1 AND en ILIKE $2 ORDER BY random() LIMIT $3",
        )
        .bind(correct.id())
        .bind(similarity_pattern(correct.en()))
        .bind(sql_limit(count))
        .fetch_all(&self.pool)
        .await?;

        if words.len() < count {
            let taken: Vec<i32> = words.iter().map(Word::id).collect();
            tracing::debug!(
                word_id = correct.id(),
                similar = words.len(),
                "Padding distractors with random words"
            );
            let padding = sqlx::query_as::<_, Word>(
                "SELECT id, ru, en FROM words WHERE id <> $1 AND NOT (id = ANY($2)) ORDER BY random() LIMIT $3",
            )
            .bind(correct.id())
            .bind(taken)
            .bind(sql_limit(count - words.len()))
            .fetch_all(&self.pool)
            .await?;
            words.extend(padding);
        }

        Ok(words)
    }

    async fn active_words(&self, user_id: i64, limit: Option<usize>) -> RepositoryResult<Vec<Word>> {
        let words = sqlx::query_as::<_, Word>(
            "SELECT words.id, words.ru, words.en FROM words \
             INNER JOIN user_words ON user_words.word_id = words.id \
             WHERE user_words.user_id = $1 AND user_words.is_active \
             ORDER BY random() LIMIT $2",
        )
        .bind(user_id)
        .bind(limit.map(sql_limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(words)
    }

    async fn is_active(&self, user_id: i64, word_id: i32) -> RepositoryResult<bool> {
        let active = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM user_words WHERE user_id = $1 AND word_id = $2 AND is_active)",
        )
        .bind(user_id)
        .bind(word_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(active)
    }

    async fn activate(&self, user_id: i64, word_id: i32) -> RepositoryResult<()> {
        tracing::debug!("Creating transaction");
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO user_words (user_id, word_id, is_active) VALUES ($1, $2, TRUE) \
             ON CONFLICT (user_id, word_id) DO UPDATE SET is_active = TRUE",
        )
        .bind(user_id)
        .bind(word_id)
        .execute(&mut *tx)
        .await?;

        tracing::debug!("Closing transaction");
        tx.commit().await?;

        Ok(())
    }

    async fn deactivate(&self, user_id: i64, word_id: i32) -> RepositoryResult<()> {
        sqlx::query(
            "UPDATE user_words SET is_active = FALSE WHERE user_id = $1 AND word_id = $2 AND is_active",
        )
        .bind(user_id)
        .bind(word_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_uses_lowercased_prefix() {
        assert_eq!(similarity_pattern("Coffee"), "%cof%");
    }

    #[test]
    fn pattern_keeps_short_words_whole() {
        assert_eq!(similarity_pattern("TV"), "%tv%");
    }

    #[test]
    fn pattern_escapes_wildcards() {
        assert_eq!(similarity_pattern("5%_off"), "%5\\%\\_%");
    }
}
