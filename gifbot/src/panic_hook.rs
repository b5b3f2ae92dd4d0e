use std::{
    backtrace::Backtrace,
    panic::{PanicHookInfo, take_hook},
    thread,
};

/// Installs a global panic hook that also logs panics via `tracing`, so a
/// panicking conversion shows up in the log file and not only on stderr.
///
/// The dispatcher recovers from pipeline panics; this only records them.
pub fn install() {
    let previous_hook = take_hook();

    std::panic::set_hook(Box::new(move |panic_info: &PanicHookInfo<'_>| {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let thread_name = thread::current()
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| "<unnamed>".to_string());
            let location = panic_info
                .location()
                .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
                .unwrap_or_else(|| "<unknown>".to_string());

            tracing::error!(
                target: "gifbot::panic",
                thread = %thread_name,
                location = %location,
                payload = %panic_payload_to_string(panic_info),
                backtrace = %Backtrace::capture(),
                "Panic"
            );
        }));

        previous_hook(panic_info);
    }));
}

fn panic_payload_to_string(panic_info: &PanicHookInfo<'_>) -> String {
    if let Some(s) = panic_info.payload().downcast_ref::<&'static str>() {
        return (*s).to_string();
    }
    if let Some(s) = panic_info.payload().downcast_ref::<String>() {
        return s.clone();
    }
    panic_info.to_string()
}
