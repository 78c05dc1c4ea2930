//! User-facing texts.

use super::session::Category;
use crate::notion::CommitStep;

pub const GREETING: &str = "Привет! Я твой бот для записи идей и задач в Notion. \
     Выбери, что хочешь записать, или отправь /cancel для отмены.";
pub const CHOOSE_CATEGORY: &str = "Пожалуйста, выбери один из вариантов на клавиатуре.";
pub const ASK_LINK: &str = "Пожалуйста, отправь мне ссылку, которую нужно сохранить.";
pub const INVALID_LINK: &str =
    "Пожалуйста, отправьте корректную ссылку (должна начинаться с http или https).";
pub const LINK_RECEIVED: &str =
    "Получил ссылку. Начинаю анализ, это может занять до минуты... 🧠";
pub const VOICE_RECEIVED: &str = "Получил голосовое, начинаю расшифровку... 🎙️";
pub const EMPTY_TEXT: &str = "Сообщение пустое. Отправь текст или голосовое сообщение.";
pub const CANCELLED: &str = "Действие отменено.";
pub const NO_SESSION: &str = "Чтобы начать, отправь /start.";
pub const UNKNOWN_COMMAND: &str = "Неизвестная команда. Доступные команды: /start, /cancel, /help.";
pub const STORE_FAILED: &str = "Не удалось сохранить запись в Notion. Проверьте логи для деталей.";
pub const LINK_STORE_FAILED: &str =
    "Не удалось сохранить запись о ссылке в Notion. Проверьте логи для деталей.";
pub const TASK_SAVED: &str = "Задача успешно сохранена в Notion!";
pub const HELP: &str = "Я сохраняю идеи, задачи и ссылки в Notion.\n\n\
     /start - начать новую запись\n\
     /cancel - отменить текущее действие\n\
     /help - эта справка\n\n\
     Идею или задачу можно отправить текстом или голосовым сообщением. \
     Для задачи я предложу выбрать свойства, любое можно пропустить. \
     Ссылку я проанализирую и сохраню вместе с кратким содержанием.";

pub fn ask_content(category: Category) -> String {
    format!(
        "Отлично! Теперь отправь мне свою '{}'. Это может быть текст или голосовое сообщение.",
        category.label().to_lowercase()
    )
}

pub fn ask_property(label: &str) -> String {
    format!("Выберите {}:", label)
}

pub fn choose_listed_value(label: &str) -> String {
    format!("Пожалуйста, выберите одно из значений для {}.", label)
}

pub fn saved(category: Category) -> String {
    format!(
        "Ваша '{}' успешно сохранена в Notion!",
        category.label().to_lowercase()
    )
}

pub fn saved_transcribed(category: Category, text: &str) -> String {
    format!(
        "Ваша '{}' успешно расшифрована и сохранена в Notion!\n\nТекст: \"{}\"",
        category.label().to_lowercase(),
        text
    )
}

pub fn link_saved(title: &str) -> String {
    format!(
        "Ссылка успешно проанализирована и сохранена в Notion!\n\nЗаголовок: {}",
        title
    )
}

/// The record exists but one of the follow-up writes failed.
pub fn partially_saved(step: CommitStep) -> String {
    let what = match step {
        CommitStep::Properties => "свойства",
        CommitStep::Content => "краткое содержание",
    };
    format!(
        "Запись создана в Notion, но не удалось сохранить {}. Проверьте логи для деталей.",
        what
    )
}
