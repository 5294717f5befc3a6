use std::{fmt, str::FromStr};

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

use crate::runner::QuestionCard;

pub const BTN_START: &str = "Старт";
pub const BTN_QUIZ: &str = "Квиз";
pub const BTN_MY_QUIZ: &str = "Мой квиз";

/// Payload of the inline buttons under a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizCallback {
    Answer { word_id: i32, index: usize },
    Add(i32),
    Remove(i32),
    AlreadyAdded,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCallback(pub String);

impl fmt::Display for QuizCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Answer { word_id, index } => write!(f, "quiz:ans:{word_id}:{index}"),
            Self::Add(word_id) => write!(f, "quiz:add:{word_id}"),
            Self::Remove(word_id) => write!(f, "quiz:rm:{word_id}"),
            Self::AlreadyAdded => f.write_str("quiz:noop"),
            Self::Stop => f.write_str("quiz:stop"),
        }
    }
}

impl FromStr for QuizCallback {
    type Err = UnknownCallback;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownCallback(data.to_owned());
        let mut parts = data.splitn(3, ':');
        if parts.next() != Some("quiz") {
            return Err(unknown());
        }

        match (parts.next(), parts.next()) {
            (Some("ans"), Some(rest)) => {
                let (word_id, index) = rest.split_once(':').ok_or_else(unknown)?;
                match (word_id.parse(), index.parse()) {
                    (Ok(word_id), Ok(index)) => Ok(Self::Answer { word_id, index }),
                    _ => Err(unknown()),
                }
            }
            (Some("add"), Some(word_id)) => word_id.parse().map(Self::Add).map_err(|_| unknown()),
            (Some("rm"), Some(word_id)) => word_id.parse().map(Self::Remove).map_err(|_| unknown()),
            (Some("noop"), None) => Ok(Self::AlreadyAdded),
            (Some("stop"), None) => Ok(Self::Stop),
            _ => Err(unknown()),
        }
    }
}

pub(crate) fn main_menu_keyboard() -> KeyboardMarkup {
    let keyboard = vec![
        vec![KeyboardButton::new(BTN_START)],
        vec![KeyboardButton::new(BTN_QUIZ), KeyboardButton::new(BTN_MY_QUIZ)],
    ];

    KeyboardMarkup::new(keyboard).resize_keyboard().selective::<()>()
}

fn button(text: impl Into<String>, data: QuizCallback) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, data.to_string())
}

/// Answer options two per row, then the personal-list controls and the stop button.
pub(crate) fn question_keyboard(card: &QuestionCard) -> InlineKeyboardMarkup {
    let mut buttons: Vec<InlineKeyboardButton> = card
        .options
        .iter()
        .enumerate()
        .map(|(index, option)| {
            let data = QuizCallback::Answer {
                word_id: card.word_id,
                index,
            };
            button(option.as_str(), data)
        })
        .collect();

    if card.is_added {
        buttons.push(button("✅ Добавлен", QuizCallback::AlreadyAdded));
        buttons.push(button("➖ Удалить", QuizCallback::Remove(card.word_id)));
    } else {
        buttons.push(button("➕ Добавить", QuizCallback::Add(card.word_id)));
    }
    buttons.push(button("Завершить квиз", QuizCallback::Stop));

    let keyboard: Vec<Vec<InlineKeyboardButton>> =
        buttons.chunks(2).map(<[InlineKeyboardButton]>::to_vec).collect();

    InlineKeyboardMarkup::new(keyboard)
}
