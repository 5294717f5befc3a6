use std::sync::Arc;

use teloxide::{
    payloads::SendMessageSetters, prelude::Requester, types::Message, utils::command::BotCommands,
    Bot,
};
use tracing::instrument;

use crate::{
    database::connection::WordRepository, handlers, keyboard::main_menu_keyboard,
    runner::{QuizEvent, QuizRunner}, state::QuizMode, HandlerResult, UserDialogue,
};

#[derive(Debug, Clone, BotCommands)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "show the main menu.")]
    Start,
    #[command(description = "quiz on random words from the dictionary.")]
    Quiz,
    #[command(description = "quiz on your personal word list.")]
    MyQuiz,
    #[command(description = "stop the current quiz.")]
    Stop,
    #[command(description = "display help.")]
    Help,
}

pub(crate) async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

#[instrument(level = "info", skip_all, fields(chat_id = msg.chat.id.0))]
pub(crate) async fn start(bot: Bot, msg: Message) -> HandlerResult {
    tracing::info!(text = ?msg.text(), "Start requested");
    bot.send_message(
        msg.chat.id,
        "Привет! Я помогу тебе с изучением английских слов\n\
         Нажми /quiz чтобы начать квиз\n\
         Нажми /myquiz чтобы начать квиз по личным словам",
    )
    .reply_markup(main_menu_keyboard())
    .await?;
    Ok(())
}

#[instrument(
    level = "info",
    skip_all,
    fields(chat_id = msg.chat.id.0, user_id = tracing::field::Empty)
)]
pub(crate) async fn global_quiz<Repository: WordRepository>(
    bot: Bot,
    msg: Message,
    dialogue: UserDialogue,
    runner: Arc<QuizRunner<Repository>>,
) -> HandlerResult {
    handlers::from_message(bot, msg, dialogue, runner, QuizEvent::Start(QuizMode::Global)).await
}

#[instrument(
    level = "info",
    skip_all,
    fields(chat_id = msg.chat.id.0, user_id = tracing::field::Empty)
)]
pub(crate) async fn personal_quiz<Repository: WordRepository>(
    bot: Bot,
    msg: Message,
    dialogue: UserDialogue,
    runner: Arc<QuizRunner<Repository>>,
) -> HandlerResult {
    handlers::from_message(bot, msg, dialogue, runner, QuizEvent::Start(QuizMode::Personal)).await
}

#[instrument(
    level = "info",
    skip_all,
    fields(chat_id = msg.chat.id.0, user_id = tracing::field::Empty)
)]
pub(crate) async fn stop<Repository: WordRepository>(
    bot: Bot,
    msg: Message,
    dialogue: UserDialogue,
    runner: Arc<QuizRunner<Repository>>,
) -> HandlerResult {
    handlers::from_message(bot, msg, dialogue, runner, QuizEvent::Stop).await
}
