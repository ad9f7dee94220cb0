//! jarpack attach tool: append a binary to an executable and take it back out

use clap::{Parser, Subcommand};
use jarpack::exit_codes::*;
use jarpack::{Fingerprint, Verification, api};
use std::{env, panic, path::PathBuf, process};

const VERSION: &str = jarpack::version::VERSION;

#[derive(Parser, Debug)]
#[command(version = VERSION, about = "Attach a binary to an executable")]
struct Cli {
    /// Log level (trace, debug, info, warn, error; prefix with json: for JSON lines)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append ATTACHMENT to BASE
    Attach {
        base: PathBuf,
        attachment: PathBuf,
        /// Output file; BASE is rewritten in place when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Copy the attached binary out of FILE
    Detach { file: PathBuf, dest: PathBuf },

    /// Remove the attachment from FILE
    Strip {
        file: PathBuf,
        /// Write the stripped binary here instead of in place
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the footer of a package or attachment
    Info { file: PathBuf },

    /// Check a file against a fingerprint; exits 0 when it matches
    Verify {
        file: PathBuf,
        /// Expected SHA-256 (hex); an empty value accepts any file
        #[arg(long, conflicts_with = "timestamp")]
        sha256: Option<String>,
        /// Expected timestamp recorded in the ZIP comment
        #[arg(long)]
        timestamp: Option<u64>,
    },
}

fn main() {
    // Set up panic handler to return specific exit code
    panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {}", panic_info);
        process::exit(EXIT_PANIC);
    }));

    let result = panic::catch_unwind(run);

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(_) => {
            eprintln!("Fatal: Unhandled panic in attach tool");
            process::exit(EXIT_PANIC);
        }
    }
}

fn verify(file: PathBuf, sha256: Option<String>, timestamp: Option<u64>) -> i32 {
    let fingerprint = match (sha256, timestamp) {
        (Some(hash), _) => Fingerprint::Sha256(hash),
        (None, Some(timestamp)) => Fingerprint::Timestamp(timestamp),
        (None, None) => {
            eprintln!("❌ verify needs --sha256 or --timestamp");
            return EXIT_INVALID_ARGS;
        }
    };
    match api::verify_file(&file, &fingerprint) {
        Verification::Valid => {
            println!("✅ {} matches", file.display());
            EXIT_SUCCESS
        }
        Verification::Invalid => {
            println!("❌ {} does not match", file.display());
            EXIT_ERROR
        }
        Verification::Error(e) => {
            eprintln!("❌ Could not verify {}: {e}", file.display());
            EXIT_IO_ERROR
        }
    }
}

fn run() -> i32 {
    // Handle --version before clap
    if env::args().nth(1).as_deref() == Some("--version") {
        println!("jarpack-attach {}", jarpack::version::full_version());
        return EXIT_SUCCESS;
    }

    let cli = Cli::parse();

    if let Some(ref level) = cli.log_level {
        jarpack::logger::JsonLogger::init_with_level(level, "CLI --log-level");
    } else {
        jarpack::logger::JsonLogger::init();
    }

    let result = match cli.command {
        Commands::Attach {
            base,
            attachment,
            output,
        } => api::attach(&base, &attachment, output.as_deref())
            .map(|written| println!("✅ Wrote {}", written.display())),
        Commands::Detach { file, dest } => api::detach(&file, &dest)
            .map(|bytes| println!("✅ Wrote {bytes} bytes to {}", dest.display())),
        Commands::Strip { file, output } => api::strip(&file, output.as_deref())
            .map(|bytes| println!("✅ Removed {bytes} bytes")),
        Commands::Info { file } => api::describe(&file).map(|report| println!("{report}")),
        Commands::Verify {
            file,
            sha256,
            timestamp,
        } => return verify(file, sha256, timestamp),
    };

    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("❌ {e}");
            e.exit_code()
        }
    }
}
