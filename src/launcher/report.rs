//! User-facing error reports from the launcher
//!
//! A GUI-subsystem launcher has no console, so on Windows errors are shown
//! in a message box. Elsewhere they go to stderr.

use log::error;

pub const REPORT_TITLE: &str = "jarpack launcher";

/// Log `message` and show it to the user
pub fn report(message: &str) {
    error!("❌ {message}");
    show(REPORT_TITLE, message);
}

#[cfg(windows)]
#[allow(unsafe_code)] // Required for Windows API FFI calls
fn show(title: &str, message: &str) {
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{MB_ICONERROR, MB_OK, MessageBoxW};
    use windows::core::PCWSTR;

    let wide = |text: &str| -> Vec<u16> { text.encode_utf16().chain(std::iter::once(0)).collect() };
    let text = wide(message);
    let caption = wide(title);
    unsafe {
        MessageBoxW(
            HWND::default(),
            PCWSTR(text.as_ptr()),
            PCWSTR(caption.as_ptr()),
            MB_OK | MB_ICONERROR,
        );
    }
}

#[cfg(not(windows))]
fn show(title: &str, message: &str) {
    eprintln!("{title}: {message}");
}
