//! Reply and inline keyboards.

use strum::IntoEnumIterator;

use super::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, ReplyKeyboardMarkup, ReplyMarkup,
};
use crate::locale::Language;

pub const LANGUAGE_BUTTON: &str = "🌐 Язык / Language";
pub const HELP_BUTTON: &str = "📖 Справка / Help";

/// Callback data prefix of the language selection buttons.
pub const LANGUAGE_CALLBACK_PREFIX: &str = "lang_";

/// Persistent keyboard with the language and help buttons.
pub fn main_keyboard() -> ReplyMarkup {
    ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
        keyboard: vec![vec![
            KeyboardButton {
                text: LANGUAGE_BUTTON.to_string(),
            },
            KeyboardButton {
                text: HELP_BUTTON.to_string(),
            },
        ]],
        resize_keyboard: true,
    })
}

/// Inline keyboard with one button per supported language.
pub fn language_keyboard() -> ReplyMarkup {
    let row = Language::iter()
        .map(|language| InlineKeyboardButton {
            text: language_label(language).to_string(),
            callback_data: format!("{}{}", LANGUAGE_CALLBACK_PREFIX, language),
        })
        .collect();

    ReplyMarkup::Inline(InlineKeyboardMarkup {
        inline_keyboard: vec![row],
    })
}

fn language_label(language: Language) -> &'static str {
    match language {
        Language::Ru => "🇷🇺 Русский",
        Language::En => "🇬🇧 English",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_keyboard() {
        let ReplyMarkup::Keyboard(markup) = main_keyboard() else {
            panic!("expected reply keyboard");
        };
        assert!(markup.resize_keyboard);
        let texts: Vec<_> = markup.keyboard[0].iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec![LANGUAGE_BUTTON, HELP_BUTTON]);
    }

    #[test]
    fn test_language_keyboard() {
        let ReplyMarkup::Inline(markup) = language_keyboard() else {
            panic!("expected inline keyboard");
        };
        let data: Vec<_> = markup.inline_keyboard[0]
            .iter()
            .map(|b| b.callback_data.as_str())
            .collect();
        assert_eq!(data, vec!["lang_ru", "lang_en"]);
    }
}
