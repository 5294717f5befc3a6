use std::sync::Arc;

use teloxide::{
    dispatching::dialogue::GetChatId,
    payloads::{AnswerCallbackQuerySetters, EditMessageReplyMarkupSetters, SendMessageSetters},
    prelude::Requester,
    types::{CallbackQuery, ChatId, Message, UserId},
    Bot,
};
use tracing::instrument;

use crate::{
    database::connection::WordRepository,
    keyboard::{question_keyboard, QuizCallback},
    runner::{QuizEvent, QuizRunner, Reply},
    HandlerResult, UserDialogue,
};

const GENERIC_FAILURE: &str = "Что-то пошло не так, попробуй ещё раз";

fn user_key(id: UserId) -> i64 {
    i64::try_from(id.0).unwrap_or(i64::MAX)
}

impl From<QuizCallback> for QuizEvent {
    fn from(callback: QuizCallback) -> Self {
        match callback {
            QuizCallback::Answer { word_id, index } => QuizEvent::Answer {
                word_id,
                picked: index,
            },
            QuizCallback::Add(word_id) => QuizEvent::AddWord(word_id),
            QuizCallback::Remove(word_id) => QuizEvent::RemoveWord(word_id),
            QuizCallback::AlreadyAdded => QuizEvent::AlreadyAdded,
            QuizCallback::Stop => QuizEvent::Stop,
        }
    }
}

/// Runs `event` for a text message and answers with plain messages.
pub(crate) async fn from_message<Repository: WordRepository>(
    bot: Bot,
    msg: Message,
    dialogue: UserDialogue,
    runner: Arc<QuizRunner<Repository>>,
    event: QuizEvent,
) -> HandlerResult {
    let user_id = msg.from.as_ref().map_or(msg.chat.id.0, |user| user_key(user.id));
    tracing::Span::current().record("user_id", user_id);

    let outcome = match runner.handle(&dialogue, user_id, event).await {
        Ok(replies) => send_replies(&bot, msg.chat.id, replies).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = outcome {
        tracing::error!(error = %e, ?event, "Failed to handle quiz command");
        bot.send_message(msg.chat.id, GENERIC_FAILURE).await?;
    }

    Ok(())
}

async fn send_replies(bot: &Bot, chat_id: ChatId, replies: Vec<Reply>) -> HandlerResult {
    for reply in replies {
        send_reply(bot, chat_id, reply).await?;
    }
    Ok(())
}

async fn send_reply(bot: &Bot, chat_id: ChatId, reply: Reply) -> HandlerResult {
    match reply {
        Reply::Question(card) | Reply::Controls(card) => {
            bot.send_message(chat_id, card.text.clone())
                .reply_markup(question_keyboard(&card))
                .await?;
        }
        Reply::Feedback(text)
        | Reply::Completed(text)
        | Reply::Stopped(text)
        | Reply::Notice(text)
        | Reply::Toast(text) => {
            bot.send_message(chat_id, text).await?;
        }
    }
    Ok(())
}

/// Handles presses on the inline buttons under a question.
#[instrument(
    level = "info",
    skip_all,
    fields(chat_id = q.chat_id().map(|id| id.0), user_id = q.from.id.0, data = ?q.data)
)]
pub(crate) async fn on_callback<Repository: WordRepository>(
    bot: Bot,
    q: CallbackQuery,
    dialogue: UserDialogue,
    runner: Arc<QuizRunner<Repository>>,
) -> HandlerResult {
    let callback = match q.data.as_deref().map(str::parse::<QuizCallback>) {
        Some(Ok(callback)) => callback,
        other => {
            tracing::warn!(?other, "Unknown callback data");
            bot.answer_callback_query(&q.id).await?;
            return Ok(());
        }
    };
    let event = QuizEvent::from(callback);

    let outcome = match runner.handle(&dialogue, user_key(q.from.id), event).await {
        Ok(replies) => deliver_to_callback(&bot, &q, replies).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = outcome {
        tracing::error!(error = %e, ?event, "Failed to handle quiz button");
        bot.answer_callback_query(&q.id).text(GENERIC_FAILURE).await?;
    }

    Ok(())
}

/// Edits the pressed message where the reply belongs to it and sends the rest.
async fn deliver_to_callback(bot: &Bot, q: &CallbackQuery, replies: Vec<Reply>) -> HandlerResult {
    let Some(chat_id) = q.chat_id() else {
        bot.answer_callback_query(&q.id).await?;
        return Ok(());
    };
    let message_id = q.message.as_ref().map(|message| message.id());

    let mut toast = None;
    for reply in replies {
        match (reply, message_id) {
            (Reply::Toast(text), _) => toast = Some(text),
            (Reply::Feedback(text) | Reply::Stopped(text), Some(message_id)) => {
                bot.edit_message_text(chat_id, message_id, text).await?;
            }
            (Reply::Controls(card), Some(message_id)) => {
                bot.edit_message_reply_markup(chat_id, message_id)
                    .reply_markup(question_keyboard(&card))
                    .await?;
            }
            (reply, _) => send_reply(bot, chat_id, reply).await?,
        }
    }

    let answer = bot.answer_callback_query(&q.id);
    match toast {
        Some(text) => answer.text(text).await?,
        None => answer.await?,
    };
    Ok(())
}

#[instrument(level = "info", skip_all, fields(chat_id = msg.chat.id.0))]
pub(crate) async fn invalid_input(bot: Bot, msg: Message) -> HandlerResult {
    tracing::info!(text = ?msg.text(), "Unrecognised input");
    bot.send_message(
        msg.chat.id,
        "Не понимаю. Нажми /help, чтобы увидеть команды.",
    )
    .await?;
    Ok(())
}
