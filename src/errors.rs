use thiserror::Error;

/// Every failure the shell reports on its diagnostic stream.
///
/// The display string of each variant is the exact user-visible message;
/// [`report`] adds the `Error: ` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ShellError {
    /// Empty stage, stray operator, or an over-limit line.
    #[error("invalid command line")]
    InvalidCmdline,
    /// `execvp` failed in a forked child.
    #[error("command not found")]
    CmdNotFound,
    /// `cd` could not change directory.
    #[error("no such directory")]
    DirNotFound,
    /// An input redirection file could not be opened for reading.
    #[error("cannot open input file")]
    OpenInputFile,
    /// An output redirection file could not be created or written.
    #[error("cannot open output file")]
    OpenOutputFile,
    /// `<` with no filename token after it.
    #[error("no input file")]
    NoInputFile,
    /// `>` with no filename token after it.
    #[error("no output file")]
    NoOutputFile,
    /// Input redirection on a stage other than the first.
    #[error("mislocated input redirection")]
    InputMislocated,
    /// Output redirection on a stage other than the last.
    #[error("mislocated output redirection")]
    OutputMislocated,
    /// `&` anywhere but the tail of the line, or repeated.
    #[error("mislocated background sign")]
    BackgroundMislocated,
    /// `exit` while the job table still holds running jobs.
    #[error("active jobs still running")]
    ActiveJobs,
}

/// Print the single diagnostic line for an error.
pub fn report(error: &ShellError) {
    eprintln!("Error: {error}");
}
