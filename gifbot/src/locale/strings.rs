//! User-facing text for every supported language.

/// All user-facing strings for one language.
///
/// Templates containing `{}` are filled by the helpers on [`Locale`].
#[derive(Debug)]
pub struct Locale {
    pub start: &'static str,
    pub help_button: &'static str,
    pub send_video: &'static str,
    pub(super) video_too_long: &'static str,
    pub processing: &'static str,
    pub sending_gif: &'static str,
    pub gif_ready: &'static str,
    pub(super) in_queue: &'static str,
    pub(super) in_queue_plural: &'static str,
    pub error_get_file: &'static str,
    pub error_download: &'static str,
    pub error_duration: &'static str,
    pub error_conversion: &'static str,
    pub error_create_gif: &'static str,
    pub error_file_too_big: &'static str,
    pub error_send_gif: &'static str,
    pub error_send_video: &'static str,
    pub language_changed: &'static str,
    pub select_language: &'static str,
    pub help_title: &'static str,
    pub help_description: &'static str,
    pub help_usage: &'static str,
    pub help_limits: &'static str,
    pub help_language: &'static str,
}

pub(super) static RU: Locale = Locale {
    start: "👋 Привет! Отправьте мне видео файл (до 20 секунд), и я конвертирую его в GIF.",
    help_button: "📖 Справка",
    send_video: "Пожалуйста, отправьте видео файл",
    video_too_long: "Видео слишком длинное. Максимальная длительность: {} секунд",
    processing: "Обрабатываю видео...",
    sending_gif: "Отправляю GIF...",
    gif_ready: "Ваш GIF готов!",
    in_queue: "⏳ Вы ожидаете в очереди, перед вами {} файл",
    in_queue_plural: "⏳ Вы ожидаете в очереди, перед вами {} файлов",
    error_get_file: "Не удалось получить файл видео",
    error_download: "Не удалось скачать видео",
    error_duration: "Не удалось определить длительность видео",
    error_conversion: "Ошибка при конвертации видео в GIF",
    error_create_gif: "Ошибка при создании GIF файла",
    error_file_too_big: "Полученный GIF файл слишком большой. Попробуйте видео с меньшей длительностью или разрешением.",
    error_send_gif: "Ошибка при отправке GIF",
    error_send_video: "Пожалуйста, отправьте видео файл, а не GIF",
    language_changed: "✅ Язык изменен на русский",
    select_language: "Выберите язык / Select language:",
    help_title: "📖 Справка по использованию бота",
    help_description: "Этот бот конвертирует видео файлы в GIF анимации.",
    help_usage: "📹 Отправьте видео файл длительностью до 20 секунд, и бот автоматически создаст из него GIF.",
    help_limits: "⚙️ Ограничения:\n• Максимальная длительность: 20 секунд\n• Если пользователей много, то вы попадете в очередь ожидания\n• Размер GIF не должен превышать 20 МБ",
    help_language: "🌐 Для смены языка используйте кнопку \"Язык / Language\"",
};

pub(super) static EN: Locale = Locale {
    start: "👋 Hello! Send me a video file (up to 20 seconds), and I'll convert it to a GIF.",
    help_button: "📖 Help",
    send_video: "Please send a video file",
    video_too_long: "Video is too long. Maximum duration: {} seconds",
    processing: "Processing video...",
    sending_gif: "Sending GIF...",
    gif_ready: "Your GIF is ready!",
    in_queue: "⏳ You are waiting in queue, {} file ahead",
    in_queue_plural: "⏳ You are waiting in queue, {} files ahead",
    error_get_file: "Failed to get video file",
    error_download: "Failed to download video",
    error_duration: "Failed to determine video duration",
    error_conversion: "Error converting video to GIF",
    error_create_gif: "Error creating GIF file",
    error_file_too_big: "The resulting GIF file is too large. Try a video with shorter duration or lower resolution.",
    error_send_gif: "Error sending GIF",
    error_send_video: "Please send a video file, not a GIF",
    language_changed: "✅ Language changed to English",
    select_language: "Select language / Выберите язык:",
    help_title: "📖 Bot Usage Guide",
    help_description: "This bot converts video files to GIF animations.",
    help_usage: "📹 Send a video file up to 20 seconds long, and the bot will automatically create a GIF from it.",
    help_limits: "⚙️ Limits:\n• Maximum duration: 20 seconds\n• If users are many, you will be in the waiting queue\n• GIF size must not exceed 20 MB",
    help_language: "🌐 To change language, use the \"Language / Язык\" button",
};
