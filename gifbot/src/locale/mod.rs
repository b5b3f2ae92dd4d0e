//! Per-chat localization.
//!
//! Russian is the default language; a chat switches with the inline language
//! keyboard and keeps its choice for the lifetime of the process.

mod strings;

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::pipeline::ConversionError;
use crate::scheduler::ChatId;

pub use strings::Locale;

/// Supported interface languages.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Language {
    #[default]
    Ru,
    En,
}

impl Language {
    /// Parse a language code, falling back to the default for unknown codes.
    pub fn from_code(code: &str) -> Self {
        code.parse().unwrap_or_default()
    }

    pub fn locale(self) -> &'static Locale {
        match self {
            Self::Ru => &strings::RU,
            Self::En => &strings::EN,
        }
    }
}

impl Locale {
    /// Status text for a task at `position`: `0` means processing, otherwise
    /// the number of files ahead.
    pub fn queue_position(&self, position: usize) -> String {
        match position {
            0 => self.processing.to_string(),
            1 => self.in_queue.replace("{}", "1"),
            n => self.in_queue_plural.replace("{}", &n.to_string()),
        }
    }

    pub fn video_too_long(&self, max_secs: u64) -> String {
        self.video_too_long.replace("{}", &max_secs.to_string())
    }

    /// The full help message, sections separated by blank lines.
    pub fn help_text(&self) -> String {
        [
            self.help_title,
            self.help_description,
            self.help_usage,
            self.help_limits,
            self.help_language,
        ]
        .join("\n\n")
    }

    /// User-facing reason for a failed pipeline stage.
    pub fn conversion_error(&self, error: &ConversionError) -> String {
        match error {
            ConversionError::GetFile(_) => self.error_get_file.to_string(),
            ConversionError::Download(_) => self.error_download.to_string(),
            ConversionError::Duration(_) => self.error_duration.to_string(),
            ConversionError::TooLong { max_secs, .. } => self.video_too_long(*max_secs),
            ConversionError::Convert(_) => self.error_conversion.to_string(),
            ConversionError::CreateGif(_) => self.error_create_gif.to_string(),
            ConversionError::TooLarge { .. } => self.error_file_too_big.to_string(),
            ConversionError::SendGif(_) => self.error_send_gif.to_string(),
        }
    }
}

/// In-memory language preference per chat.
#[derive(Debug, Default)]
pub struct LanguageStore {
    languages: RwLock<HashMap<ChatId, Language>>,
}

impl LanguageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, chat_id: ChatId) -> Language {
        self.languages
            .read()
            .get(&chat_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn set(&self, chat_id: ChatId, language: Language) {
        self.languages.write().insert(chat_id, language);
    }
}

/// Resolves the locale to use for a chat.
#[derive(Debug, Default)]
pub struct LocaleService {
    store: LanguageStore,
}

impl LocaleService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn language_for(&self, chat_id: ChatId) -> Language {
        self.store.get(chat_id)
    }

    pub fn locale_for(&self, chat_id: ChatId) -> &'static Locale {
        self.language_for(chat_id).locale()
    }

    pub fn set_language(&self, chat_id: ChatId, language: Language) {
        debug!(chat_id = %chat_id, language = %language, "Language changed");
        self.store.set(chat_id, language);
    }

    /// Set the language from a raw code; unknown codes select the default.
    pub fn set_language_code(&self, chat_id: ChatId, code: &str) -> Language {
        let language = Language::from_code(code);
        self.set_language(chat_id, language);
        language
    }
}
