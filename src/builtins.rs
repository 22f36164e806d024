use std::io::Write;

use crate::errors::ShellError;
use crate::jobs::JobTable;

/// The list of all builtin command names.
const BUILTINS: &[&str] = &["cd", "pwd", "exit"];

/// Returns true if the command name is a shell builtin.
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// What the shell should do after a builtin runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinAction {
    /// Keep going; the builtin finished with this exit status.
    Continue(i32),
    /// Terminate the shell with success (`exit` with an empty job table).
    Exit,
}

/// Execute a builtin command, writing output to the provided streams.
///
/// Runs in the shell itself for a sole-stage builtin and in the forked child
/// when the builtin sits inside a pipeline; in the latter case `jobs` is the
/// table as inherited at fork time and `Exit` only ends the child.
pub fn run(
    argv: &[String],
    jobs: &JobTable,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> BuiltinAction {
    match argv[0].as_str() {
        "exit" => builtin_exit(jobs, stderr),
        "cd" => builtin_cd(argv, stderr),
        "pwd" => builtin_pwd(stdout),
        _ => {
            let _ = writeln!(stderr, "sshell: unknown builtin: {}", argv[0]);
            BuiltinAction::Continue(1)
        }
    }
}

fn builtin_exit(jobs: &JobTable, stderr: &mut dyn Write) -> BuiltinAction {
    if !jobs.is_empty() {
        let _ = writeln!(stderr, "Error: {}", ShellError::ActiveJobs);
        return BuiltinAction::Continue(1);
    }

    let _ = writeln!(stderr, "Bye...");
    BuiltinAction::Exit
}

fn builtin_cd(argv: &[String], stderr: &mut dyn Write) -> BuiltinAction {
    // A missing operand behaves as a failed change of directory.
    let target = argv.get(1).map(String::as_str).unwrap_or("");
    if std::env::set_current_dir(target).is_err() {
        let _ = writeln!(stderr, "Error: {}", ShellError::DirNotFound);
        return BuiltinAction::Continue(1);
    }
    BuiltinAction::Continue(0)
}

fn builtin_pwd(stdout: &mut dyn Write) -> BuiltinAction {
    match std::env::current_dir() {
        Ok(path) => {
            let _ = writeln!(stdout, "{}", path.display());
            BuiltinAction::Continue(0)
        }
        Err(_) => BuiltinAction::Continue(1),
    }
}
