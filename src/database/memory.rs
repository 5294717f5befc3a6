//! In-memory [`WordRepository`] with the same selection policy as the
//! PostgreSQL queries. Used by the test suite and handy for local runs
//! without a database.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;

use super::connection::{RepositoryError, RepositoryResult, WordRepository};
use super::word::{UserWord, Word};

#[derive(Default)]
pub struct MemoryRepository {
    catalog: Vec<Word>,
    links: Mutex<Vec<UserWord>>,
    offline: AtomicBool,
}

impl MemoryRepository {
    pub fn new(catalog: Vec<Word>) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    /// Builds a catalog from `(ru, en)` pairs, numbering ids from 1.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let catalog = pairs
            .into_iter()
            .zip(1..)
            .map(|((ru, en), id)| Word::new(id, ru, en))
            .collect();
        Self::new(catalog)
    }

    pub fn link(&self, user_id: i64, word_id: i32) -> Option<UserWord> {
        self.links
            .lock()
            .iter()
            .find(|link| link.user_id() == user_id && link.word_id() == word_id)
            .cloned()
    }

    pub fn link_count(&self) -> usize {
        self.links.lock().len()
    }

    /// While offline every operation fails with [`RepositoryError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> RepositoryResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("memory repository is offline".into()));
        }
        Ok(())
    }
}

/// Picks up to `count` wrong answers for `correct` out of `catalog`.
///
/// Entries sharing the first three letters of the correct translation come
/// first, random padding fills the remainder.
pub fn pick_distractors<R: Rng + ?Sized>(
    correct: &Word,
    catalog: &[Word],
    count: usize,
    rng: &mut R,
) -> Vec<Word> {
    let prefix: String = correct.en().to_lowercase().chars().take(3).collect();

    let (mut similar, mut rest): (Vec<&Word>, Vec<&Word>) = catalog
        .iter()
        .filter(|word| word.id() != correct.id())
        .partition(|word| word.en().to_lowercase().contains(&prefix));

    similar.shuffle(rng);
    let mut picked: Vec<Word> = similar.into_iter().take(count).cloned().collect();

    if picked.len() < count {
        rest.shuffle(rng);
        let need = count - picked.len();
        picked.extend(rest.into_iter().take(need).cloned());
    }

    picked
}

impl WordRepository for MemoryRepository {
    async fn random_words(&self, limit: usize) -> RepositoryResult<Vec<Word>> {
        self.ensure_online()?;
        let mut words = self.catalog.clone();
        words.shuffle(&mut rand::thread_rng());
        words.truncate(limit);
        Ok(words)
    }

    async fn distractors(&self, correct: &Word, count: usize) -> RepositoryResult<Vec<Word>> {
        self.ensure_online()?;
        Ok(pick_distractors(correct, &self.catalog, count, &mut rand::thread_rng()))
    }

    async fn active_words(&self, user_id: i64, limit: Option<usize>) -> RepositoryResult<Vec<Word>> {
        self.ensure_online()?;
        let mut words: Vec<Word> = {
            let links = self.links.lock();
            self.catalog
                .iter()
                .filter(|word| {
                    links.iter().any(|link| {
                        link.user_id() == user_id && link.word_id() == word.id() && link.is_active()
                    })
                })
                .cloned()
                .collect()
        };
        words.shuffle(&mut rand::thread_rng());
        if let Some(limit) = limit {
            words.truncate(limit);
        }
        Ok(words)
    }

    async fn is_active(&self, user_id: i64, word_id: i32) -> RepositoryResult<bool> {
        self.ensure_online()?;
        Ok(self.link(user_id, word_id).is_some_and(|link| link.is_active()))
    }

    async fn activate(&self, user_id: i64, word_id: i32) -> RepositoryResult<()> {
        self.ensure_online()?;
        let mut links = self.links.lock();
        match links
            .iter_mut()
            .find(|link| link.user_id() == user_id && link.word_id() == word_id)
        {
            Some(link) => link.set_active(true),
            None => links.push(UserWord::new(user_id, word_id)),
        }
        Ok(())
    }

    async fn deactivate(&self, user_id: i64, word_id: i32) -> RepositoryResult<()> {
        self.ensure_online()?;
        if let Some(link) = self
            .links
            .lock()
            .iter_mut()
            .find(|link| link.user_id() == user_id && link.word_id() == word_id)
        {
            link.set_active(false);
        }
        Ok(())
    }
}
