use teloxide::{
    dispatching::{
        dialogue::{self, InMemStorage},
        UpdateFilterExt, UpdateHandler,
    },
    dptree,
    types::{Message, Update},
};

use crate::{
    commands::{self, Command},
    database::connection::WordRepository,
    handlers,
    keyboard::{BTN_MY_QUIZ, BTN_QUIZ, BTN_START},
    state::QuizState,
};

fn menu_button(label: &'static str) -> impl Fn(Message) -> bool + Send + Sync + 'static {
    move |msg: Message| msg.text() == Some(label)
}

/// Dispatch tree: commands and menu buttons as messages, quiz buttons as callback queries.
pub fn schema<Repository: WordRepository>(
) -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Help].endpoint(commands::help))
        .branch(case![Command::Start].endpoint(commands::start))
        .branch(case![Command::Quiz].endpoint(commands::global_quiz::<Repository>))
        .branch(case![Command::MyQuiz].endpoint(commands::personal_quiz::<Repository>))
        .branch(case![Command::Stop].endpoint(commands::stop::<Repository>));

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(dptree::filter(menu_button(BTN_START)).endpoint(commands::start))
        .branch(dptree::filter(menu_button(BTN_QUIZ)).endpoint(commands::global_quiz::<Repository>))
        .branch(
            dptree::filter(menu_button(BTN_MY_QUIZ))
                .endpoint(commands::personal_quiz::<Repository>),
        )
        .endpoint(handlers::invalid_input);

    let callback_handler =
        Update::filter_callback_query().endpoint(handlers::on_callback::<Repository>);

    dialogue::enter::<Update, InMemStorage<QuizState>, QuizState, _>()
        .branch(message_handler)
        .branch(callback_handler)
}
