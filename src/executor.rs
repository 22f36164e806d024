use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;

use os_pipe::{PipeReader, PipeWriter};

use crate::ast::{Command, Pipeline};
use crate::builtins::{self, BuiltinAction};
use crate::errors::{self, ShellError};
use crate::jobs::JobTable;
use crate::sys::{self, ForkResult};

/// How a validated pipeline was set in motion.
pub enum Launch {
    /// Every stage was forked; pids are recorded in the pipeline and the
    /// caller is responsible for waiting (or registering the job).
    Spawned,
    /// The sole stage was a builtin, evaluated in the shell itself; the
    /// pipeline is already finished.
    Builtin(BuiltinAction),
}

/// Validate a pipeline's redirections and launch it.
///
/// On a validation error nothing has been forked and no file beyond the
/// already-validated redirections has been touched. A `fork` or `pipe`
/// failure is fatal to the shell.
pub fn run(pipeline: &mut Pipeline, jobs: &JobTable) -> Result<Launch, ShellError> {
    let files = open_redirections(pipeline)?;

    // A builtin standing alone runs in the shell process itself; this is what
    // lets `cd` and `exit` act on the shell. Its redirection files were still
    // validated (and outputs created) above, but its streams are the shell's
    // own, and a `&` marker is ignored.
    if pipeline.commands.len() == 1 && builtins::is_builtin(&pipeline.commands[0].argv[0]) {
        let action = builtins::run(
            &pipeline.commands[0].argv,
            jobs,
            &mut io::stdout(),
            &mut io::stderr(),
        );
        pipeline.commands[0].status = Some(match action {
            BuiltinAction::Continue(code) => code,
            BuiltinAction::Exit => 0,
        });
        return Ok(Launch::Builtin(action));
    }

    spawn_stages(pipeline, &files, jobs);
    Ok(Launch::Spawned)
}

/// The pre-opened redirection files for a pipeline: inputs belong to the
/// first stage, outputs to the last. Held only until the stages are forked.
struct RedirFiles {
    inputs: Vec<File>,
    outputs: Vec<File>,
}

/// Open every redirection file before any fork.
///
/// Every listed file must be usable even though only the last of each kind
/// takes effect. Output files are created or truncated here, with user
/// read/write permissions.
fn open_redirections(pipeline: &Pipeline) -> Result<RedirFiles, ShellError> {
    let mut inputs = Vec::new();
    for target in &pipeline.commands[0].inputs {
        let file = File::open(target).map_err(|_| ShellError::OpenInputFile)?;
        inputs.push(file);
    }

    let mut outputs = Vec::new();
    let last = &pipeline.commands[pipeline.commands.len() - 1];
    for target in &last.outputs {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(target)
            .map_err(|_| ShellError::OpenOutputFile)?;
        outputs.push(file);
    }

    Ok(RedirFiles { inputs, outputs })
}

/// Fork one child per stage, left to right, chaining pipes between them.
///
/// The parent keeps a pipe's read end only until the consuming stage has
/// been forked and drops the write end immediately, so downstream readers
/// see EOF as soon as the writers exit. After the last fork the parent holds
/// no pipe descriptors at all.
fn spawn_stages(pipeline: &mut Pipeline, files: &RedirFiles, jobs: &JobTable) {
    let count = pipeline.commands.len();
    let mut prev_reader: Option<PipeReader> = None;

    for index in 0..count {
        let is_first = index == 0;
        let is_last = index + 1 == count;

        let next_pipe = if is_last {
            None
        } else {
            match os_pipe::pipe() {
                Ok(pair) => Some(pair),
                Err(error) => fatal("pipe", error),
            }
        };

        match sys::fork() {
            Err(error) => fatal("fork", error),
            Ok(ForkResult::Child) => run_stage(
                &pipeline.commands[index],
                is_first,
                is_last,
                prev_reader,
                next_pipe,
                &files.inputs,
                &files.outputs,
                jobs,
            ),
            Ok(ForkResult::Parent(pid)) => {
                pipeline.commands[index].pid = Some(pid);
                prev_reader = next_pipe.map(|(reader, _writer)| reader);
            }
        }
    }
}

/// Child side of one pipeline stage: wire the standard streams, then exec
/// the program or run the builtin. Never returns.
#[allow(clippy::too_many_arguments)]
fn run_stage(
    command: &Command,
    is_first: bool,
    is_last: bool,
    prev_reader: Option<PipeReader>,
    next_pipe: Option<(PipeReader, PipeWriter)>,
    inputs: &[File],
    outputs: &[File],
    jobs: &JobTable,
) -> ! {
    // Chain stdin to the previous stage's pipe; the original descriptor
    // closes when the handle drops.
    if let Some(reader) = prev_reader {
        wire(reader.as_raw_fd(), libc::STDIN_FILENO);
    }

    // Chain stdout to the next stage's pipe. The read end belongs to that
    // stage, not this one.
    if let Some((reader, writer)) = next_pipe {
        drop(reader);
        wire(writer.as_raw_fd(), libc::STDOUT_FILENO);
    }

    // File redirections, applied in listed order so the last file wins.
    if is_first {
        for file in inputs {
            wire(file.as_raw_fd(), libc::STDIN_FILENO);
        }
    }
    if is_last {
        for file in outputs {
            wire(file.as_raw_fd(), libc::STDOUT_FILENO);
        }
    }

    // A builtin inside a pipeline runs in the child so its output can flow
    // through the pipe; `exit` here checks the job table as inherited at
    // fork time and only ever ends this child.
    if builtins::is_builtin(&command.argv[0]) {
        let mut stdout = io::stdout();
        let mut stderr = io::stderr();
        let action = builtins::run(&command.argv, jobs, &mut stdout, &mut stderr);
        let _ = stdout.flush();
        let _ = stderr.flush();
        match action {
            BuiltinAction::Continue(code) => sys::exit_child(code),
            BuiltinAction::Exit => sys::exit_child(0),
        }
    }

    // Everything std and os_pipe opened is close-on-exec, so the program
    // image starts with only the standard streams.
    let _ = sys::exec(&command.argv);
    errors::report(&ShellError::CmdNotFound);
    sys::exit_child(1);
}

/// dup2 onto a standard stream from inside a forked child.
fn wire(fd: i32, target: i32) {
    if sys::replace_fd(fd, target).is_err() {
        sys::exit_child(1);
    }
}

/// A pipe or fork failure leaves the pipeline half-built; give up.
fn fatal(operation: &str, error: io::Error) -> ! {
    eprintln!("sshell: {operation}: {error}");
    std::process::exit(1);
}
