use crate::database::word::Word;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizMode {
    /// Words from the whole catalog.
    Global,
    /// Only the user's active words.
    Personal,
}

/// The question currently waiting for an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentQuestion {
    pub(crate) word: Word,
    pub(crate) options: Vec<String>,
    pub(crate) correct_index: usize,
    pub(crate) is_added: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSession {
    pub(crate) mode: QuizMode,
    pub(crate) words: Vec<Word>,
    pub(crate) index: usize,
    pub(crate) total: usize,
    pub(crate) score: usize,
    pub(crate) current: Option<CurrentQuestion>,
}

/// Per-chat dialogue state kept in teloxide's dialogue storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum QuizState {
    #[default]
    Idle,
    Asking(QuizSession),
}

/// Why an interaction could not be applied to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stale {
    NoQuestion,
    OptionOutOfRange,
    OtherWord,
}

impl CurrentQuestion {
    pub fn new(word: Word, options: Vec<String>, correct_index: usize, is_added: bool) -> Self {
        Self {
            word,
            options,
            correct_index,
            is_added,
        }
    }

    pub fn word(&self) -> &Word {
        &self.word
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    pub fn is_added(&self) -> bool {
        self.is_added
    }
}

impl QuizSession {
    /// Returns `None` for an empty word set: no session is created then.
    pub fn start(mode: QuizMode, words: Vec<Word>, question_limit: usize) -> Option<Self> {
        if words.is_empty() {
            return None;
        }
        let total = question_limit.min(words.len());
        Some(Self {
            mode,
            words,
            index: 0,
            total,
            score: 0,
            current: None,
        })
    }

    pub fn mode(&self) -> QuizMode {
        self.mode
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn current(&self) -> Option<&CurrentQuestion> {
        self.current.as_ref()
    }

    /// The word to ask next, `None` once all questions were asked.
    pub fn next_word(&self) -> Option<&Word> {
        if self.index >= self.total {
            return None;
        }
        self.words.get(self.index)
    }

    pub fn with_question(mut self, question: CurrentQuestion) -> Self {
        self.current = Some(question);
        self
    }

    /// Scores `picked` against the outstanding question and moves the cursor.
    /// Buttons of any other question (`word_id` differs) are stale.
    ///
    /// Returns the advanced session, whether the answer was right and the
    /// correct translation.
    pub fn answer(&self, word_id: i32, picked: usize) -> Result<(Self, bool, String), Stale> {
        let current = self.current.as_ref().ok_or(Stale::NoQuestion)?;
        if current.word.id() != word_id {
            return Err(Stale::OtherWord);
        }
        if picked >= current.options.len() {
            return Err(Stale::OptionOutOfRange);
        }

        let is_correct = picked == current.correct_index;
        let correct_en = current.word.en().to_owned();

        let mut next = self.clone();
        if is_correct {
            next.score += 1;
        }
        next.index = (next.index + 1).min(next.total);
        next.current = None;

        Ok((next, is_correct, correct_en))
    }

    /// Flips the added flag of the outstanding question if it asks `word_id`.
    pub fn mark_added(&self, word_id: i32, is_added: bool) -> Result<Self, Stale> {
        let current = self.current.as_ref().ok_or(Stale::NoQuestion)?;
        if current.word.id() != word_id {
            return Err(Stale::OtherWord);
        }
        let mut next = self.clone();
        if let Some(current) = next.current.as_mut() {
            current.is_added = is_added;
        }
        Ok(next)
    }

    pub fn percent(&self) -> u32 {
        percent(self.score, self.total)
    }
}

/// Share of correct answers, rounded half up. Zero questions give 0%.
pub fn percent(score: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let rounded = (score * 200 + total) / (total * 2);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}
