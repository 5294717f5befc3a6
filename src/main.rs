use std::process::ExitCode;
use std::sync::Arc;

use ruentrainerbot::{
    commands::Command,
    config::Config,
    database::connection::Connection,
    logging,
    runner::QuizRunner,
    schema::schema,
    state::QuizState,
};
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use teloxide::utils::command::BotCommands;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.log_level, config.log_format) {
        eprintln!("Failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => {
            tracing::info!("Bot stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Bot failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), BoxError> {
    let connection = Connection::connect(&config.database_url).await?;
    if config.run_migrations {
        connection.run_migrations().await?;
    }
    let runner = Arc::new(QuizRunner::new(Arc::new(connection), config.quiz_length));

    let bot = Bot::new(&config.token);
    bot.set_my_commands(Command::bot_commands()).await?;
    tracing::info!(quiz_length = config.quiz_length, "Starting bot...");

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema::<Connection>())
        .dependencies(dptree::deps![InMemStorage::<QuizState>::new(), runner])
        .enable_ctrlc_handler()
        .build();

    match config.webhook {
        Some(webhook) => {
            tracing::info!(url = %webhook.url, addr = %webhook.addr, "Receiving updates through webhook");
            let listener = webhooks::axum(bot, Options::new(webhook.addr, webhook.url)).await?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
        None => {
            tracing::info!("Receiving updates through long polling");
            dispatcher.dispatch().await;
        }
    }

    Ok(())
}
