use state::QuizState;
use teloxide::{dispatching::dialogue::InMemStorage, prelude::Dialogue};

pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod keyboard;
pub mod logging;
pub mod options;
pub mod runner;
pub mod schema;
pub mod state;

pub type UserDialogue = Dialogue<QuizState, InMemStorage<QuizState>>;
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;
