// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(all(not(debug_assertions), feature = "desktop"), windows_subsystem = "windows")]

#[cfg(feature = "desktop")]
fn main() {
    tabscribe_lib::run()
}

#[cfg(not(feature = "desktop"))]
fn main() -> std::process::ExitCode {
    tabscribe_lib::headless::run()
}
