//! JAR launcher
//!
//! Reads the package footer from the running executable, keeps the extracted
//! JAR next to it current, and starts the application either as a `java`
//! process or inside an in-process JVM. A worker thread does the filesystem
//! and runtime work while the calling thread runs the splash screen.

pub mod command;
pub mod discovery;
pub mod jvm;
pub mod library;
pub mod report;
pub mod splash;

pub use discovery::RuntimeLocator;
pub use splash::{LoggingRenderer, SplashGeometry, SplashRenderer, SplashScreen};

use log::{debug, info, trace, warn};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use crate::cli::format_jar_info;
use crate::exceptions::{JarpackError, Result};
use crate::exit_codes::{EXIT_ERROR, EXIT_SUCCESS};
use crate::format::extraction::extract_jar;
use crate::format::reader::read_image;
use crate::format::verification::verify;
use crate::format::{Fingerprint, JarDescriptor, LaunchMode, Segment, Verification, open_jar};
use crate::utils::{expand_env_vars, is_env_true};

/// Re-extract the JAR even when the existing copy is current
pub const FORCE_EXTRACT_ENV: &str = "JARPACK_FORCE_EXTRACT";

/// Skip the splash screen
pub const NO_SPLASH_ENV: &str = "JARPACK_NO_SPLASH";

/// Launcher argument that prints the package footer instead of launching
pub const INFO_COMMAND: &str = "info";

/// Launch stages, logged as they are entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    LocateSelf,
    ParseFooter,
    ShowInfoOnly,
    Proceed,
    DecideExtraction,
    Extract,
    LaunchRuntime,
    ShowSplash,
    Join,
    Exit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::LocateSelf => "locate-self",
            Stage::ParseFooter => "parse-footer",
            Stage::ShowInfoOnly => "show-info",
            Stage::Proceed => "proceed",
            Stage::DecideExtraction => "decide-extraction",
            Stage::Extract => "extract",
            Stage::LaunchRuntime => "launch-runtime",
            Stage::ShowSplash => "show-splash",
            Stage::Join => "join",
            Stage::Exit => "exit",
        };
        f.write_str(name)
    }
}

fn enter(stage: Stage) {
    debug!("🧭 Stage: {stage}");
}

/// Everything the worker thread needs, moved into it by value
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub executable: PathBuf,
    pub jar_path: PathBuf,
    pub payload: Segment,
    pub timestamp: u64,
    pub launch_mode: LaunchMode,
    pub java_version: u32,
    pub main_class: String,
    pub java_path: String,
    pub jvm_args: Vec<String>,
    pub program_args: Vec<String>,
    pub force_extract: bool,
}

impl LaunchPlan {
    /// Plan a launch of `descriptor` with the launcher's own arguments
    /// appended to the packaged program arguments
    pub fn new(descriptor: &JarDescriptor, extra_args: &[String]) -> Self {
        let strings = &descriptor.strings;
        let mut program_args = strings.program_args.clone();
        program_args.extend(extra_args.iter().cloned());

        LaunchPlan {
            executable: descriptor.path.clone(),
            jar_path: extraction_target(&descriptor.path, &strings.extract_path),
            payload: descriptor.layout.payload,
            timestamp: descriptor.footer.timestamp,
            launch_mode: descriptor.footer.launch_mode,
            java_version: descriptor.footer.java_version,
            main_class: strings.main_class.clone(),
            java_path: strings.java_path.clone(),
            jvm_args: strings.jvm_args.clone(),
            program_args,
            force_extract: false,
        }
    }
}

/// `<expanded extract path>/<exe stem>.jar`; an empty extract path means
/// the executable's directory
pub fn extraction_target(executable: &Path, extract_path: &str) -> PathBuf {
    let stem = executable
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "app".to_string());
    let expanded = expand_env_vars(extract_path.trim());
    let dir = if expanded.trim().is_empty() {
        executable
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    } else {
        PathBuf::from(expanded)
    };
    dir.join(format!("{stem}.jar"))
}

/// Make sure the extracted JAR matches the package. Returns whether it
/// had to be written.
pub fn prepare_jar(plan: &LaunchPlan) -> Result<bool> {
    enter(Stage::DecideExtraction);
    if plan.force_extract {
        info!("🔄 {FORCE_EXTRACT_ENV} set, re-extracting");
    } else {
        match verify(&plan.jar_path, &Fingerprint::Timestamp(plan.timestamp)) {
            Verification::Valid => {
                debug!("✅ {} is current", plan.jar_path.display());
                return Ok(false);
            }
            Verification::Invalid => debug!("📦 {} needs extraction", plan.jar_path.display()),
            Verification::Error(e) => warn!("⚠️ Could not verify {}: {e}", plan.jar_path.display()),
        }
    }

    enter(Stage::Extract);
    let written = extract_jar(
        &plan.executable,
        plan.payload,
        &plan.jar_path,
        plan.timestamp,
    )?;
    info!("📦 Extracted {} ({written} bytes)", plan.jar_path.display());
    Ok(true)
}

fn launch_java_process(plan: &LaunchPlan, locator: &RuntimeLocator) -> Result<()> {
    let java = locator.java_executable()?;
    command::spawn_java(&java, &plan.jar_path, &plan.jvm_args, &plan.program_args)?;
    Ok(())
}

/// Start the application with the plan's launch mode
pub fn launch_runtime(plan: &LaunchPlan, locator: &RuntimeLocator) -> Result<()> {
    enter(Stage::LaunchRuntime);
    match plan.launch_mode {
        LaunchMode::JavaExeProcess => launch_java_process(plan, locator),
        LaunchMode::DirectRuntimeLoad => match locator.jvm_library() {
            Some(library) => jvm::invoke_main(&jvm::JvmLaunch {
                library,
                jar: plan.jar_path.clone(),
                version: plan.java_version,
                main_class: plan.main_class.clone(),
                jvm_args: plan.jvm_args.clone(),
                program_args: plan.program_args.clone(),
            }),
            None => {
                warn!(
                    "⚠️ No {} found, falling back to a java process",
                    discovery::JVM_LIBRARY
                );
                launch_java_process(plan, locator)
            }
        },
    }
}

/// Worker body: extract if needed, then launch
pub fn execute(plan: LaunchPlan, locator: RuntimeLocator) -> Result<()> {
    prepare_jar(&plan)?;
    launch_runtime(&plan, &locator)
}

/// Run the splash until it closes itself or `interrupted` returns true
fn show_splash<I>(descriptor: &JarDescriptor, interrupted: I) -> Result<()>
where
    I: FnMut() -> bool,
{
    let image = read_image(descriptor)?;
    if image.is_empty() {
        return Ok(());
    }
    let footer = &descriptor.footer;
    let mut screen = SplashScreen::new(
        &descriptor.strings.splash_name,
        &descriptor.strings.splash_version,
        footer.show_progress,
        footer.show_progress_text,
    );
    let layout = footer.splash_layout.unwrap_or_default();
    let mut renderer = LoggingRenderer::new();
    splash::present(
        &mut renderer,
        &mut screen,
        &image,
        &layout,
        footer.launch_time_ms,
        thread::sleep,
        interrupted,
    )
}

/// Launch the package carried by `executable`.
///
/// With `info` as the first argument the footer is printed and nothing is
/// launched.
pub fn run(executable: &Path, args: &[String]) -> Result<()> {
    enter(Stage::ParseFooter);
    let descriptor = open_jar(executable)?;
    trace!("🔍 Footer: {:?}", descriptor.footer);

    if args.first().map(String::as_str) == Some(INFO_COMMAND) {
        enter(Stage::ShowInfoOnly);
        println!("{}", format_jar_info(&descriptor));
        enter(Stage::Exit);
        return Ok(());
    }

    enter(Stage::Proceed);
    let mut plan = LaunchPlan::new(&descriptor, args);
    plan.force_extract = is_env_true(FORCE_EXTRACT_ENV);
    let locator = RuntimeLocator::from_environment(&plan.java_path);

    let (sender, outcome) = mpsc::channel();
    let worker = thread::Builder::new()
        .name("jarpack-worker".to_string())
        .spawn(move || {
            let _ = sender.send(execute(plan, locator));
        })?;

    let mut finished = None;
    if descriptor.footer.image_size > 0 && !is_env_true(NO_SPLASH_ENV) {
        enter(Stage::ShowSplash);
        // A failed launch closes the splash at once; a successful one lets it run out
        let interrupted = || match outcome.try_recv() {
            Ok(result) => {
                let failed = result.is_err();
                finished = Some(result);
                failed
            }
            Err(_) => false,
        };
        if let Err(e) = show_splash(&descriptor, interrupted) {
            warn!("⚠️ Splash screen failed: {e}");
        }
    }

    enter(Stage::Join);
    worker
        .join()
        .map_err(|_| JarpackError::Generic("launcher worker panicked".to_string()))?;
    let result = match finished {
        Some(result) => result,
        None => outcome.recv().map_err(|_| {
            JarpackError::Generic("launcher worker exited without a result".to_string())
        })?,
    };
    enter(Stage::Exit);
    result
}

/// Launcher entry point. Errors are reported to the user and map to exit
/// code 1.
pub fn main_with_args(args: &[String]) -> i32 {
    enter(Stage::Start);
    enter(Stage::LocateSelf);
    let located = env::current_exe().map_err(JarpackError::from).and_then(|exe| {
        if let Some(dir) = exe.parent().filter(|d| !d.as_os_str().is_empty()) {
            env::set_current_dir(dir).map_err(|e| {
                JarpackError::Generic(format!(
                    "cannot change the working directory to {}: {e}",
                    dir.display()
                ))
            })?;
        }
        Ok(exe)
    });

    let result = located.and_then(|exe| {
        debug!("📍 Executable: {}", exe.display());
        run(&exe, args)
    });
    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            report::report(&e.to_string());
            EXIT_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::writer::{JarOptions, package_jar};
    use crate::format::zip_comment::{read_fingerprint, tests::fake_zip};
    use crate::format::LaunchStrings;
    use std::fs;
    use tempfile::TempDir;

    fn build_package(dir: &Path, timestamp: u64, mode: LaunchMode) -> PathBuf {
        let stub = dir.join("stub.bin");
        fs::write(&stub, vec![0x90; 100]).unwrap();
        let output = dir.join("demo.exe");
        let strings = LaunchStrings {
            main_class: "com.example.Main".into(),
            program_args: vec!["--packaged".into()],
            extract_path: dir.join("cache").to_string_lossy().to_string(),
            ..LaunchStrings::default()
        };
        let options = JarOptions {
            timestamp,
            launch_mode: mode,
            ..JarOptions::default()
        };
        package_jar(&stub, &fake_zip(300, b"old"), &[], &strings, &options, &output).unwrap();
        output
    }

    fn isolated_locator() -> RuntimeLocator {
        RuntimeLocator::default()
    }

    #[test]
    fn test_extraction_target() {
        let exe = Path::new("/opt/apps/demo.exe");
        assert_eq!(
            extraction_target(exe, ""),
            PathBuf::from("/opt/apps/demo.jar")
        );
        assert_eq!(
            extraction_target(exe, "/var/cache/demo"),
            PathBuf::from("/var/cache/demo/demo.jar")
        );
        assert_eq!(
            extraction_target(exe, "$ENV{JARPACK_TEST_SURELY_UNSET_VAR}"),
            PathBuf::from("/opt/apps/demo.jar")
        );
    }

    #[test]
    fn test_plan_appends_launcher_args() {
        let temp_dir = TempDir::new().unwrap();
        let package = build_package(temp_dir.path(), 5, LaunchMode::JavaExeProcess);
        let descriptor = open_jar(&package).unwrap();
        let plan = LaunchPlan::new(&descriptor, &["file.txt".to_string()]);
        assert_eq!(plan.program_args, vec!["--packaged", "file.txt"]);
        assert_eq!(plan.jar_path, temp_dir.path().join("cache").join("demo.jar"));
        assert_eq!(plan.payload.offset, 100);
        assert!(!plan.force_extract);
    }

    #[test]
    fn test_prepare_jar_extracts_once() {
        let temp_dir = TempDir::new().unwrap();
        let package = build_package(temp_dir.path(), 1234, LaunchMode::JavaExeProcess);
        let mut plan = LaunchPlan::new(&open_jar(&package).unwrap(), &[]);

        assert!(prepare_jar(&plan).unwrap());
        assert_eq!(read_fingerprint(&plan.jar_path).unwrap(), 1234);
        assert!(!prepare_jar(&plan).unwrap());

        plan.force_extract = true;
        assert!(prepare_jar(&plan).unwrap());
    }

    #[test]
    fn test_new_package_replaces_stale_jar() {
        let temp_dir = TempDir::new().unwrap();
        let package = build_package(temp_dir.path(), 1, LaunchMode::JavaExeProcess);
        let plan = LaunchPlan::new(&open_jar(&package).unwrap(), &[]);
        assert!(prepare_jar(&plan).unwrap());

        let package = build_package(temp_dir.path(), 2, LaunchMode::JavaExeProcess);
        let plan = LaunchPlan::new(&open_jar(&package).unwrap(), &[]);
        assert!(prepare_jar(&plan).unwrap());
        assert_eq!(read_fingerprint(&plan.jar_path).unwrap(), 2);
    }

    #[test]
    fn test_execute_without_runtime() {
        let temp_dir = TempDir::new().unwrap();
        let package = build_package(temp_dir.path(), 9, LaunchMode::JavaExeProcess);
        let plan = LaunchPlan::new(&open_jar(&package).unwrap(), &[]);
        let jar_path = plan.jar_path.clone();

        let result = execute(plan, isolated_locator());
        assert!(matches!(result, Err(JarpackError::RuntimeNotFound(_))));
        // extraction happened before the launch failed
        assert!(jar_path.exists());
    }

    #[test]
    fn test_direct_mode_falls_back_to_java_process() {
        let temp_dir = TempDir::new().unwrap();
        let package = build_package(temp_dir.path(), 9, LaunchMode::DirectRuntimeLoad);
        let plan = LaunchPlan::new(&open_jar(&package).unwrap(), &[]);
        assert!(matches!(
            launch_runtime(&plan, &isolated_locator()),
            Err(JarpackError::RuntimeNotFound(_))
        ));
    }

    #[test]
    fn test_info_does_not_extract() {
        let temp_dir = TempDir::new().unwrap();
        let package = build_package(temp_dir.path(), 3, LaunchMode::JavaExeProcess);
        run(&package, &["info".to_string(), "ignored".to_string()]).unwrap();
        assert!(!temp_dir.path().join("cache").exists());
    }

    #[test]
    fn test_run_rejects_plain_binary() {
        let temp_dir = TempDir::new().unwrap();
        let exe = temp_dir.path().join("plain.exe");
        fs::write(&exe, vec![0u8; 256]).unwrap();
        assert!(matches!(
            run(&exe, &[]),
            Err(JarpackError::NotAComposite(_))
        ));
    }

    #[test]
    fn test_splash_closes_when_interrupted() {
        let temp_dir = TempDir::new().unwrap();
        let stub = temp_dir.path().join("stub.bin");
        fs::write(&stub, vec![0x90; 100]).unwrap();
        let output = temp_dir.path().join("splash.exe");
        let options = JarOptions {
            launch_time_ms: 60_000,
            ..JarOptions::default()
        };
        package_jar(
            &stub,
            &fake_zip(300, b""),
            b"\x89PNG\r\n\x1a\nnot really",
            &LaunchStrings::default(),
            &options,
            &output,
        )
        .unwrap();
        let descriptor = open_jar(&output).unwrap();

        let (sender, outcome) = mpsc::channel::<Result<()>>();
        sender
            .send(Err(JarpackError::RuntimeNotFound("no java".into())))
            .unwrap();
        let started = std::time::Instant::now();
        show_splash(&descriptor, || outcome.try_recv().is_ok_and(|r| r.is_err())).unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::DecideExtraction.to_string(), "decide-extraction");
        assert_eq!(Stage::ShowInfoOnly.to_string(), "show-info");
    }
}
