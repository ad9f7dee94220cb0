//! jarpack builder binary

use clap::{Args, Parser, Subcommand};
use jarpack::builder::{self, BuildOptions, PackageConfig};
use jarpack::exit_codes::*;
use std::{env, panic, path::PathBuf, process};

const VERSION: &str = jarpack::version::VERSION;

#[derive(Parser, Debug)]
#[command(version = VERSION, about = "Build Windows launchers for Java applications")]
struct Cli {
    /// Log level (trace, debug, info, warn, error; prefix with json: for JSON lines)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a launcher executable around a JAR
    Package(PackageArgs),

    /// Patch subsystem, execution level and icon of an existing executable
    Modify(ModifyArgs),
}

#[derive(Args, Debug)]
struct PackageArgs {
    /// JSON package config; the flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JAR to embed
    #[arg(long)]
    jar: Option<PathBuf>,

    /// Output executable
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fully qualified main class (required for --launch-mode 1)
    #[arg(long)]
    main_class: Option<String>,

    /// JVM argument, repeatable
    #[arg(long = "jvm-arg", allow_hyphen_values = true)]
    jvm_args: Vec<String>,

    /// Program argument, repeatable
    #[arg(long = "program-arg", allow_hyphen_values = true)]
    program_args: Vec<String>,

    /// Directory holding the bundled runtime's java executable
    #[arg(long)]
    java_path: Option<String>,

    /// Where the JAR is extracted; supports $ENV{NAME}
    #[arg(long)]
    extract_path: Option<String>,

    /// 0 = java process, 1 = in-process JVM
    #[arg(long)]
    launch_mode: Option<u32>,

    /// Java version such as 1.8 or 21
    #[arg(long)]
    java_version: Option<String>,

    /// Splash image (PNG); enables the splash screen
    #[arg(long)]
    splash_image: Option<PathBuf>,

    #[arg(long)]
    splash_name: Option<String>,

    #[arg(long)]
    splash_version: Option<String>,

    #[arg(long)]
    show_progress: bool,

    #[arg(long)]
    show_progress_text: bool,

    /// Estimated startup time in milliseconds
    #[arg(long)]
    launch_time: Option<i32>,

    /// Application icon (.ico)
    #[arg(long)]
    icon: Option<PathBuf>,

    /// Keep the console window
    #[arg(long)]
    console: bool,

    /// Request administrator rights
    #[arg(long)]
    require_admin: bool,

    /// Launcher binary to build on
    #[arg(long)]
    launcher_bin: Option<PathBuf>,

    /// Fixed timestamp fingerprint, for reproducible builds
    #[arg(long)]
    timestamp: Option<u64>,

    /// Write the effective config here before building
    #[arg(long)]
    save_config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ModifyArgs {
    /// JSON package config naming externalExePath
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Executable to patch
    #[arg(long)]
    exe: Option<PathBuf>,

    /// Keep the console window
    #[arg(long)]
    console: bool,

    /// Request administrator rights
    #[arg(long)]
    require_admin: bool,

    /// Application icon (.ico)
    #[arg(long)]
    icon: Option<PathBuf>,
}

fn path_string(path: PathBuf) -> String {
    path.to_string_lossy().to_string()
}

impl PackageArgs {
    fn apply(self, config: &mut PackageConfig) {
        if let Some(jar) = self.jar {
            config.jar_path = path_string(jar);
        }
        if let Some(output) = self.output {
            config.output_path = path_string(output);
        }
        if let Some(main_class) = self.main_class {
            config.main_class = main_class;
        }
        if !self.jvm_args.is_empty() {
            config.jvm_args = self.jvm_args;
        }
        if !self.program_args.is_empty() {
            config.program_args = self.program_args;
        }
        if let Some(java_path) = self.java_path {
            config.java_path = java_path;
        }
        if let Some(extract_path) = self.extract_path {
            config.jar_extract_path = extract_path;
        }
        if let Some(mode) = self.launch_mode {
            config.launch_mode = mode;
        }
        if let Some(version) = self.java_version {
            config.java_version = version;
        }
        if let Some(image) = self.splash_image {
            config.enable_splash = true;
            config.splash_image_path = path_string(image);
        }
        if let Some(name) = self.splash_name {
            config.splash_program_name = name;
        }
        if let Some(version) = self.splash_version {
            config.splash_program_version = version;
        }
        config.splash_show_progress |= self.show_progress;
        config.splash_show_progress_text |= self.show_progress_text;
        if let Some(launch_time) = self.launch_time {
            config.launch_time = launch_time;
        }
        if let Some(icon) = self.icon {
            config.icon_path = path_string(icon);
        }
        config.show_console |= self.console;
        config.require_admin |= self.require_admin;
    }
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
            eprintln!("Fatal: Unhandled panic in builder");
            process::exit(EXIT_PANIC);
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> jarpack::Result<PackageConfig> {
    match path {
        Some(path) => PackageConfig::load(path),
        None => Ok(PackageConfig::default()),
    }
}

fn package(args: PackageArgs) -> jarpack::Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    let options = BuildOptions {
        launcher_bin: args.launcher_bin.clone(),
        timestamp: args.timestamp,
    };
    let save_config = args.save_config.clone();
    args.apply(&mut config);

    if let Some(path) = save_config {
        config.save(&path)?;
        log::info!("💾 Saved config to {}", path.display());
    }

    let report = builder::build(&config, &options)?;
    println!(
        "✅ {} ({} bytes, launcher {})",
        report.output.display(),
        report.layout.total_size(),
        report.launcher
    );
    Ok(())
}

fn modify(args: ModifyArgs) -> jarpack::Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(exe) = args.exe {
        config.external_exe_path = path_string(exe);
    }
    if let Some(icon) = args.icon {
        config.icon_path = path_string(icon);
    }
    config.show_console |= args.console;
    config.require_admin |= args.require_admin;

    let path = builder::modify_external(&config)?;
    println!("✅ Modified {}", path.display());
    Ok(())
}

fn run() -> i32 {
    // Handle --version before clap
    if env::args().nth(1).as_deref() == Some("--version") {
        println!("jarpack-builder {}", jarpack::version::full_version());
        return EXIT_SUCCESS;
    }

    let cli = Cli::parse();

    if let Some(ref level) = cli.log_level {
        jarpack::logger::JsonLogger::init_with_level(level, "CLI --log-level");
    } else {
        jarpack::logger::JsonLogger::init();
    }

    let result = match cli.command {
        Commands::Package(args) => package(args),
        Commands::Modify(args) => modify(args),
    };

    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("❌ {e}");
            e.exit_code()
        }
    }
}
