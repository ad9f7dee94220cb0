//! jarpack launcher binary
//!
//! The builder switches the subsystem of each packaged copy to GUI unless
//! the package asks for a console.

use jarpack::exit_codes::*;
use std::{env, panic, process};

fn main() {
    // Set up panic handler to return specific exit code
    panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {}", panic_info);
        process::exit(EXIT_ERROR);
    }));

    let result = panic::catch_unwind(run);

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(_) => {
            eprintln!("Fatal: Unhandled panic in launcher");
            process::exit(EXIT_ERROR);
        }
    }
}

fn run() -> i32 {
    jarpack::logger::JsonLogger::init();

    log::debug!("🚀 Launcher process started");
    let args: Vec<String> = env::args().skip(1).collect();
    log::trace!("📋 Arguments: {:?}", args);

    jarpack::launcher::main_with_args(&args)
}
