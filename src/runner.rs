//! Quiz session state machine.
//!
//! [`QuizRunner::handle`] applies one [`QuizEvent`] to the chat's
//! [`QuizState`] and returns the [`Reply`] values the transport has to
//! render. Every repository call of a step runs before the new state is
//! written, so a failed step leaves the stored session untouched.

use std::sync::Arc;

use tracing::instrument;

use crate::{
    database::connection::{WordRepository, DISTRACTOR_COUNT},
    error::QuizError,
    options::build_options,
    state::{CurrentQuestion, QuizMode, QuizSession, QuizState},
    UserDialogue,
};

pub const NOT_ACTIVE: &str = "Квиз не активен";
pub const STALE_QUESTION: &str = "Этот вопрос уже неактуален";
pub const ALREADY_ADDED: &str = "Уже в личном словаре";
pub const EMPTY_CATALOG: &str = "Пока нет слов в словаре";
pub const EMPTY_PERSONAL: &str =
    "У тебя пока нет слов\nДобавляй слова во время квиза кнопкой «➕ Добавить»";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizEvent {
    Start(QuizMode),
    /// Option `picked` pressed under the question asking `word_id`.
    Answer { word_id: i32, picked: usize },
    AddWord(i32),
    RemoveWord(i32),
    AlreadyAdded,
    Stop,
}

/// Everything needed to draw a question with its buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionCard {
    pub text: String,
    pub options: Vec<String>,
    pub word_id: i32,
    pub is_added: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A new question message.
    Question(QuestionCard),
    /// Redraw the buttons of the question the user is looking at.
    Controls(QuestionCard),
    /// Verdict on the answered question.
    Feedback(String),
    Completed(String),
    Stopped(String),
    Notice(String),
    /// Short acknowledgement without a message.
    Toast(String),
}

pub fn question_text(number: usize, total: usize, ru: &str) -> String {
    format!("Вопрос {number}/{total}\nКак переводится: {ru}?")
}

impl QuestionCard {
    fn for_session(session: &QuizSession) -> Option<Self> {
        let current = session.current()?;
        Some(Self {
            text: question_text(session.index() + 1, session.total(), current.word().ru()),
            options: current.options().to_vec(),
            word_id: current.word().id(),
            is_added: current.is_added(),
        })
    }
}

pub struct QuizRunner<R> {
    repository: Arc<R>,
    question_limit: usize,
}

impl<R: WordRepository> QuizRunner<R> {
    pub fn new(repository: Arc<R>, question_limit: usize) -> Self {
        Self {
            repository,
            question_limit: question_limit.max(1),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    #[instrument(level = "debug", skip(self, dialogue), fields(chat_id = dialogue.chat_id().0))]
    pub async fn handle(
        &self,
        dialogue: &UserDialogue,
        user_id: i64,
        event: QuizEvent,
    ) -> Result<Vec<Reply>, QuizError> {
        let state = dialogue.get().await?.unwrap_or_default();

        match (state, event) {
            (_, QuizEvent::Start(mode)) => self.start(dialogue, user_id, mode).await,
            (_, QuizEvent::AlreadyAdded) => Ok(vec![Reply::Toast(ALREADY_ADDED.into())]),
            (QuizState::Asking(session), QuizEvent::Answer { word_id, picked }) => {
                self.answer(dialogue, user_id, &session, word_id, picked).await
            }
            (QuizState::Asking(session), QuizEvent::AddWord(word_id)) => {
                self.toggle(dialogue, user_id, &session, word_id, true).await
            }
            (QuizState::Asking(session), QuizEvent::RemoveWord(word_id)) => {
                self.toggle(dialogue, user_id, &session, word_id, false).await
            }
            (QuizState::Asking(session), QuizEvent::Stop) => self.stop(dialogue, &session).await,
            (QuizState::Idle, event) => {
                tracing::warn!(?event, "Quiz is not active");
                Ok(vec![Reply::Toast(NOT_ACTIVE.into())])
            }
        }
    }

    async fn start(
        &self,
        dialogue: &UserDialogue,
        user_id: i64,
        mode: QuizMode,
    ) -> Result<Vec<Reply>, QuizError> {
        let words = match mode {
            QuizMode::Global => self.repository.random_words(self.question_limit).await?,
            QuizMode::Personal => {
                self.repository
                    .active_words(user_id, Some(self.question_limit))
                    .await?
            }
        };

        let Some(session) = QuizSession::start(mode, words, self.question_limit) else {
            tracing::warn!(?mode, "No words to start a quiz with");
            let text = match mode {
                QuizMode::Global => EMPTY_CATALOG,
                QuizMode::Personal => EMPTY_PERSONAL,
            };
            return Ok(vec![Reply::Notice(text.into())]);
        };

        tracing::info!(?mode, total = session.total(), "Quiz started");
        self.ask(dialogue, user_id, session, Vec::new()).await
    }

    /// Sends the next question, or the result once every question was asked.
    async fn ask(
        &self,
        dialogue: &UserDialogue,
        user_id: i64,
        session: QuizSession,
        mut replies: Vec<Reply>,
    ) -> Result<Vec<Reply>, QuizError> {
        let Some(word) = session.next_word().cloned() else {
            let percent = session.percent();
            tracing::info!(
                score = session.score(),
                total = session.total(),
                percent,
                "Quiz finished"
            );
            dialogue.update(QuizState::Idle).await?;
            replies.push(Reply::Completed(format!(
                "Квиз завершен\nРезультат: {percent}%"
            )));
            return Ok(replies);
        };

        let distractors = self.repository.distractors(&word, DISTRACTOR_COUNT).await?;
        let is_added = self.repository.is_active(user_id, word.id()).await?;
        let (options, correct_index) = build_options(&word, &distractors);

        tracing::info!(
            question_index = session.index(),
            total = session.total(),
            word_id = word.id(),
            %word,
            is_added,
            "Sending question"
        );

        let session = session.with_question(CurrentQuestion::new(
            word,
            options,
            correct_index,
            is_added,
        ));
        let card = QuestionCard::for_session(&session);
        dialogue.update(QuizState::Asking(session)).await?;

        replies.extend(card.map(Reply::Question));
        Ok(replies)
    }

    async fn answer(
        &self,
        dialogue: &UserDialogue,
        user_id: i64,
        session: &QuizSession,
        word_id: i32,
        picked: usize,
    ) -> Result<Vec<Reply>, QuizError> {
        let (next, is_correct, correct_en) = match session.answer(word_id, picked) {
            Ok(answered) => answered,
            Err(stale) => {
                tracing::warn!(?stale, word_id, picked, "Ignoring stale answer");
                return Ok(vec![Reply::Toast(STALE_QUESTION.into())]);
            }
        };

        tracing::info!(
            question_index = session.index(),
            total = session.total(),
            picked,
            is_correct,
            correct_en = %correct_en,
            "Answer received"
        );

        let replies = if is_correct {
            vec![
                Reply::Toast("✅ Верно!".into()),
                Reply::Feedback(format!("✅ Верно! Ответ: {correct_en}")),
            ]
        } else {
            vec![
                Reply::Toast("❌ Неверно!".into()),
                Reply::Feedback(format!("❌ Неверно. Правильный ответ: {correct_en}")),
            ]
        };

        self.ask(dialogue, user_id, next, replies).await
    }

    async fn toggle(
        &self,
        dialogue: &UserDialogue,
        user_id: i64,
        session: &QuizSession,
        word_id: i32,
        add: bool,
    ) -> Result<Vec<Reply>, QuizError> {
        let next = match session.mark_added(word_id, add) {
            Ok(next) => next,
            Err(stale) => {
                tracing::warn!(?stale, word_id, add, "Ignoring stale word toggle");
                return Ok(vec![Reply::Toast(STALE_QUESTION.into())]);
            }
        };

        if add {
            self.repository.activate(user_id, word_id).await?;
            tracing::info!(word_id, "Word added to personal list");
        } else {
            self.repository.deactivate(user_id, word_id).await?;
            tracing::info!(word_id, "Word removed from personal list");
        }

        let card = QuestionCard::for_session(&next);
        dialogue.update(QuizState::Asking(next)).await?;

        let toast = if add { "Добавлено ➕" } else { "Удалено ➖" };
        let mut replies: Vec<Reply> = card.map(Reply::Controls).into_iter().collect();
        replies.push(Reply::Toast(toast.into()));
        Ok(replies)
    }

    async fn stop(
        &self,
        dialogue: &UserDialogue,
        session: &QuizSession,
    ) -> Result<Vec<Reply>, QuizError> {
        let percent = session.percent();
        tracing::info!(
            score = session.score(),
            total = session.total(),
            percent,
            "Quiz stopped by user"
        );
        dialogue.update(QuizState::Idle).await?;

        Ok(vec![
            Reply::Toast("Остановлено".into()),
            Reply::Stopped(format!(
                "Квиз остановлен\nРезультат: {}/{} ({percent}%)",
                session.score(),
                session.total()
            )),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryRepository;
    use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
    use teloxide::types::ChatId;

    const USER: i64 = 42;

    fn drinks() -> MemoryRepository {
        MemoryRepository::from_pairs([("вода", "water"), ("чай", "tea"), ("кофе", "coffee")])
    }

    fn setup(repository: MemoryRepository, limit: usize) -> (QuizRunner<MemoryRepository>, UserDialogue) {
        let runner = QuizRunner::new(Arc::new(repository), limit);
        let dialogue = Dialogue::new(InMemStorage::<QuizState>::new(), ChatId(1));
        (runner, dialogue)
    }

    async fn session(dialogue: &UserDialogue) -> Option<QuizSession> {
        match dialogue.get().await.unwrap() {
            Some(QuizState::Asking(session)) => Some(session),
            _ => None,
        }
    }

    fn pick(session: &QuizSession, picked: usize) -> QuizEvent {
        QuizEvent::Answer {
            word_id: session.current().unwrap().word().id(),
            picked,
        }
    }

    async fn correct_answer(dialogue: &UserDialogue) -> QuizEvent {
        let session = session(dialogue).await.unwrap();
        pick(&session, session.current().unwrap().correct_index())
    }

    #[tokio::test]
    async fn answering_everything_right_reports_full_score() {
        let (runner, dialogue) = setup(drinks(), 10);

        let replies = runner
            .handle(&dialogue, USER, QuizEvent::Start(QuizMode::Global))
            .await
            .unwrap();
        assert!(matches!(replies.as_slice(), [Reply::Question(_)]));
        assert_eq!(session(&dialogue).await.unwrap().total(), 3);

        let mut last = Vec::new();
        for _ in 0..3 {
            let event = correct_answer(&dialogue).await;
            last = runner
                .handle(&dialogue, USER, event)
                .await
                .unwrap();
        }

        assert_eq!(
            last.last(),
            Some(&Reply::Completed("Квиз завершен\nРезультат: 100%".into()))
        );
        assert!(session(&dialogue).await.is_none());
    }

    #[tokio::test]
    async fn question_offers_every_other_word() {
        let (runner, dialogue) = setup(drinks(), 10);

        let replies = runner
            .handle(&dialogue, USER, QuizEvent::Start(QuizMode::Global))
            .await
            .unwrap();
        let Reply::Question(card) = &replies[0] else {
            panic!("expected a question, got {replies:?}");
        };

        assert_eq!(card.options.len(), 3);
        assert!(card.text.starts_with("Вопрос 1/3\nКак переводится: "));
        assert!(!card.is_added);
        let current = session(&dialogue).await.unwrap();
        assert_eq!(current.current().unwrap().word().id(), card.word_id);
    }

    #[tokio::test]
    async fn wrong_answer_names_the_correct_word() {
        let (runner, dialogue) = setup(drinks(), 10);
        runner
            .handle(&dialogue, USER, QuizEvent::Start(QuizMode::Global))
            .await
            .unwrap();
        let before = session(&dialogue).await.unwrap();
        let current = before.current().unwrap();
        let wrong = (current.correct_index() + 1) % current.options().len();

        let replies = runner
            .handle(&dialogue, USER, pick(&before, wrong))
            .await
            .unwrap();

        let expected = format!("❌ Неверно. Правильный ответ: {}", current.word().en());
        assert!(replies.contains(&Reply::Feedback(expected)));
        let after = session(&dialogue).await.unwrap();
        assert_eq!(after.index(), 1);
        assert_eq!(after.score(), 0);
    }

    #[tokio::test]
    async fn empty_personal_list_does_not_start() {
        let (runner, dialogue) = setup(drinks(), 10);

        let replies = runner
            .handle(&dialogue, USER, QuizEvent::Start(QuizMode::Personal))
            .await
            .unwrap();

        assert_eq!(replies, vec![Reply::Notice(EMPTY_PERSONAL.into())]);
        assert!(dialogue.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_catalog_does_not_start() {
        let (runner, dialogue) = setup(MemoryRepository::default(), 10);

        let replies = runner
            .handle(&dialogue, USER, QuizEvent::Start(QuizMode::Global))
            .await
            .unwrap();

        assert_eq!(replies, vec![Reply::Notice(EMPTY_CATALOG.into())]);
        assert!(dialogue.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn personal_quiz_uses_only_active_words() {
        let repository = drinks();
        repository.activate(USER, 2).await.unwrap();
        let (runner, dialogue) = setup(repository, 10);

        runner
            .handle(&dialogue, USER, QuizEvent::Start(QuizMode::Personal))
            .await
            .unwrap();

        let session = session(&dialogue).await.unwrap();
        assert_eq!(session.mode(), QuizMode::Personal);
        assert_eq!(session.total(), 1);
        let current = session.current().unwrap();
        assert_eq!(current.word().en(), "tea");
        assert!(current.is_added());
    }

    #[tokio::test]
    async fn answer_after_stop_is_rejected() {
        let (runner, dialogue) = setup(drinks(), 10);
        runner
            .handle(&dialogue, USER, QuizEvent::Start(QuizMode::Global))
            .await
            .unwrap();
        let event = correct_answer(&dialogue).await;
        runner
            .handle(&dialogue, USER, event)
            .await
            .unwrap();

        let stopped = runner.handle(&dialogue, USER, QuizEvent::Stop).await.unwrap();
        assert!(stopped.contains(&Reply::Stopped("Квиз остановлен\nРезультат: 1/3 (33%)".into())));

        let replies = runner
            .handle(&dialogue, USER, QuizEvent::Answer { word_id: 1, picked: 0 })
            .await
            .unwrap();
        assert_eq!(replies, vec![Reply::Toast(NOT_ACTIVE.into())]);
        assert_eq!(dialogue.get().await.unwrap(), Some(QuizState::Idle));
    }

    #[tokio::test]
    async fn out_of_range_answer_changes_nothing() {
        let (runner, dialogue) = setup(drinks(), 10);
        runner
            .handle(&dialogue, USER, QuizEvent::Start(QuizMode::Global))
            .await
            .unwrap();
        let before = session(&dialogue).await.unwrap();

        let replies = runner
            .handle(&dialogue, USER, pick(&before, 17))
            .await
            .unwrap();

        assert_eq!(replies, vec![Reply::Toast(STALE_QUESTION.into())]);
        assert_eq!(session(&dialogue).await.unwrap(), before);
    }

    #[tokio::test]
    async fn failed_step_keeps_session() {
        let (runner, dialogue) = setup(drinks(), 10);
        runner
            .handle(&dialogue, USER, QuizEvent::Start(QuizMode::Global))
            .await
            .unwrap();
        let before = session(&dialogue).await.unwrap();

        runner.repository().set_offline(true);
        let event = pick(&before, before.current().unwrap().correct_index());
        let result = runner
            .handle(&dialogue, USER, event)
            .await;

        assert!(matches!(result, Err(QuizError::Repository(_))));
        assert_eq!(session(&dialogue).await.unwrap(), before);
    }

    #[tokio::test]
    async fn add_and_remove_toggle_the_current_word() {
        let (runner, dialogue) = setup(drinks(), 10);
        runner
            .handle(&dialogue, USER, QuizEvent::Start(QuizMode::Global))
            .await
            .unwrap();
        let before = session(&dialogue).await.unwrap();
        let word_id = before.current().unwrap().word().id();

        let replies = runner
            .handle(&dialogue, USER, QuizEvent::AddWord(word_id))
            .await
            .unwrap();
        let Reply::Controls(card) = &replies[0] else {
            panic!("expected controls, got {replies:?}");
        };
        assert!(card.is_added);
        assert!(runner.repository().link(USER, word_id).unwrap().is_active());

        let after = session(&dialogue).await.unwrap();
        assert_eq!(after.index(), before.index());
        assert_eq!(after.score(), before.score());

        runner
            .handle(&dialogue, USER, QuizEvent::RemoveWord(word_id))
            .await
            .unwrap();
        assert!(!runner.repository().link(USER, word_id).unwrap().is_active());
        assert!(!session(&dialogue).await.unwrap().current().unwrap().is_added());
    }

    #[tokio::test]
    async fn toggling_another_word_is_stale() {
        let (runner, dialogue) = setup(drinks(), 10);
        runner
            .handle(&dialogue, USER, QuizEvent::Start(QuizMode::Global))
            .await
            .unwrap();
        let word_id = session(&dialogue).await.unwrap().current().unwrap().word().id();

        let replies = runner
            .handle(&dialogue, USER, QuizEvent::AddWord(word_id + 100))
            .await
            .unwrap();

        assert_eq!(replies, vec![Reply::Toast(STALE_QUESTION.into())]);
        assert_eq!(runner.repository().link_count(), 0);
    }

    #[tokio::test]
    async fn restarting_discards_the_old_session() {
        let (runner, dialogue) = setup(drinks(), 2);
        runner
            .handle(&dialogue, USER, QuizEvent::Start(QuizMode::Global))
            .await
            .unwrap();
        let event = correct_answer(&dialogue).await;
        runner
            .handle(&dialogue, USER, event)
            .await
            .unwrap();

        runner
            .handle(&dialogue, USER, QuizEvent::Start(QuizMode::Global))
            .await
            .unwrap();

        let session = session(&dialogue).await.unwrap();
        assert_eq!(session.index(), 0);
        assert_eq!(session.score(), 0);
        assert_eq!(session.total(), 2);
    }

    #[tokio::test]
    async fn already_added_only_acknowledges() {
        let (runner, dialogue) = setup(drinks(), 10);
        let replies = runner
            .handle(&dialogue, USER, QuizEvent::AlreadyAdded)
            .await
            .unwrap();
        assert_eq!(replies, vec![Reply::Toast(ALREADY_ADDED.into())]);
    }

    #[tokio::test]
    async fn stop_without_quiz_is_not_active() {
        let (runner, dialogue) = setup(drinks(), 10);

        let replies = runner.handle(&dialogue, USER, QuizEvent::Stop).await.unwrap();

        assert_eq!(replies, vec![Reply::Toast(NOT_ACTIVE.into())]);
        assert!(dialogue.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_restart_keeps_running_session() {
        let (runner, dialogue) = setup(drinks(), 10);
        runner
            .handle(&dialogue, USER, QuizEvent::Start(QuizMode::Global))
            .await
            .unwrap();
        let before = dialogue.get().await.unwrap();

        runner.repository().set_offline(true);
        let result = runner
            .handle(&dialogue, USER, QuizEvent::Start(QuizMode::Personal))
            .await;

        assert!(matches!(result, Err(QuizError::Repository(_))));
        assert_eq!(dialogue.get().await.unwrap(), before);
    }

    #[tokio::test]
    async fn failed_toggle_keeps_session_and_list() {
        let (runner, dialogue) = setup(drinks(), 10);
        runner
            .handle(&dialogue, USER, QuizEvent::Start(QuizMode::Global))
            .await
            .unwrap();
        let before = dialogue.get().await.unwrap();
        let word_id = session(&dialogue).await.unwrap().current().unwrap().word().id();

        runner.repository().set_offline(true);
        for event in [QuizEvent::AddWord(word_id), QuizEvent::RemoveWord(word_id)] {
            let result = runner.handle(&dialogue, USER, event).await;
            assert!(matches!(result, Err(QuizError::Repository(_))), "{event:?}");
            assert_eq!(dialogue.get().await.unwrap(), before, "{event:?}");
        }
        assert_eq!(runner.repository().link_count(), 0);
    }

    #[tokio::test]
    async fn buttons_of_a_discarded_question_are_stale() {
        let (runner, dialogue) = setup(drinks(), 10);
        runner
            .handle(&dialogue, USER, QuizEvent::Start(QuizMode::Global))
            .await
            .unwrap();
        let old = correct_answer(&dialogue).await;
        runner
            .handle(&dialogue, USER, old)
            .await
            .unwrap();
        let before = session(&dialogue).await.unwrap();

        let replies = runner.handle(&dialogue, USER, old).await.unwrap();

        assert_eq!(replies, vec![Reply::Toast(STALE_QUESTION.into())]);
        assert_eq!(session(&dialogue).await.unwrap(), before);
    }
}
