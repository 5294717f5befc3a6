use std::fmt;

use chrono::{DateTime, Utc};

/// A catalog entry: a Russian word and its English translation.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Word {
    id: i32,
    ru: String,
    en: String,
}

/// A user's personal-list membership for one catalog entry.
/// Mirrors a `user_words` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserWord {
    user_id: i64,
    word_id: i32,
    active: bool,
    added_at: DateTime<Utc>,
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.ru, self.en)
    }
}

impl Word {
    pub fn new(id: i32, ru: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            id,
            ru: ru.into(),
            en: en.into(),
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn ru(&self) -> &str {
        &self.ru
    }

    pub fn en(&self) -> &str {
        &self.en
    }
}

impl UserWord {
    pub fn new(user_id: i64, word_id: i32) -> Self {
        Self {
            user_id,
            word_id,
            active: true,
            added_at: Utc::now(),
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn word_id(&self) -> i32 {
        self.word_id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}
