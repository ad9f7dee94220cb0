//! Launching the application as a separate `java` process

use log::{debug, info};
use std::path::Path;
use std::process::{Command, Stdio};

use crate::exceptions::{JarpackError, Result};

/// Arguments after the executable: `<jvmArgs...> -jar "<jar>" <programArgs...>`.
///
/// Packaged arguments are passed through verbatim so they may carry their
/// own quoting; only the JAR path is quoted here.
pub fn argument_tail(jar: &Path, jvm_args: &[String], program_args: &[String]) -> String {
    let mut parts: Vec<String> = jvm_args.to_vec();
    parts.push("-jar".to_string());
    parts.push(format!("\"{}\"", jar.display()));
    parts.extend(program_args.iter().cloned());
    parts.join(" ")
}

/// Full command line as logged and as handed to the OS on Windows
pub fn command_line(java: &Path, jar: &Path, jvm_args: &[String], program_args: &[String]) -> String {
    format!(
        "\"{}\" {}",
        java.display(),
        argument_tail(jar, jvm_args, program_args)
    )
}

/// Start `java` and return without waiting. Success means the process was
/// created.
pub fn spawn_java(
    java: &Path,
    jar: &Path,
    jvm_args: &[String],
    program_args: &[String],
) -> Result<u32> {
    debug!(
        "🎯 Command line: {}",
        command_line(java, jar, jvm_args, program_args)
    );

    let mut command = Command::new(java);
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        command.raw_arg(argument_tail(jar, jvm_args, program_args));
    }
    #[cfg(not(windows))]
    {
        command.args(jvm_args).arg("-jar").arg(jar).args(program_args);
    }

    let child = command
        .stdin(Stdio::null())
        .spawn()
        .map_err(|e| JarpackError::LaunchFailed(format!("{}: {e}", java.display())))?;
    let pid = child.id();
    info!("🚀 Started {} (pid {pid})", java.display());
    Ok(pid)
}
