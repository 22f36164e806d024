use std::fmt::Write;

/// One stage of a pipeline: a program invocation plus its redirections.
///
/// Redirection kinds are encoded positionally: `inputs` holds `<` targets,
/// `outputs` holds `>` targets, each in the order they appeared. When several
/// are listed, every file must be usable but only the last takes effect.
#[derive(Debug, PartialEq, Eq)]
pub struct Command {
    pub argv: Vec<String>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    /// Set once the stage has been forked.
    pub pid: Option<libc::pid_t>,
    /// Decoded exit status, set once the stage has been reaped.
    pub status: Option<i32>,
}

impl Command {
    pub fn new(argv: Vec<String>, inputs: Vec<String>, outputs: Vec<String>) -> Self {
        Self {
            argv,
            inputs,
            outputs,
            pid: None,
            status: None,
        }
    }
}

/// A parsed command line: one or more stages connected by pipes, treated as a
/// single job for waiting and reporting.
#[derive(Debug, PartialEq, Eq)]
pub struct Pipeline {
    /// The input line exactly as typed, for the completion message.
    pub raw: String,
    pub commands: Vec<Command>,
    /// True iff the line ended in `&`.
    pub background: bool,
}

impl Pipeline {
    /// A pipeline is finished once every stage has a recorded status.
    pub fn is_finished(&self) -> bool {
        self.commands.iter().all(|cmd| cmd.status.is_some())
    }

    /// Credit a reaped child to the stage it belongs to.
    /// Returns false if the pid is not one of this pipeline's.
    pub fn record_status(&mut self, pid: libc::pid_t, code: i32) -> bool {
        for cmd in &mut self.commands {
            if cmd.pid == Some(pid) && cmd.status.is_none() {
                cmd.status = Some(code);
                return true;
            }
        }
        false
    }

    /// The per-job report: `+ completed '<raw>' [s0][s1]...`.
    pub fn completion_line(&self) -> String {
        let mut line = format!("+ completed '{}' ", self.raw);
        for cmd in &self.commands {
            let _ = write!(line, "[{}]", cmd.status.unwrap_or(1));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(argv: &[&str]) -> Command {
        Command::new(argv.iter().map(|s| s.to_string()).collect(), vec![], vec![])
    }

    #[test]
    fn finished_only_when_every_status_recorded() {
        let mut pipeline = Pipeline {
            raw: "a | b".to_string(),
            commands: vec![stage(&["a"]), stage(&["b"])],
            background: false,
        };
        assert!(!pipeline.is_finished());

        pipeline.commands[0].status = Some(0);
        assert!(!pipeline.is_finished());

        pipeline.commands[1].status = Some(3);
        assert!(pipeline.is_finished());
    }

    #[test]
    fn record_status_matches_pids() {
        let mut pipeline = Pipeline {
            raw: "a | b".to_string(),
            commands: vec![stage(&["a"]), stage(&["b"])],
            background: false,
        };
        pipeline.commands[0].pid = Some(100);
        pipeline.commands[1].pid = Some(101);

        assert!(pipeline.record_status(101, 7));
        assert_eq!(pipeline.commands[1].status, Some(7));
        assert!(!pipeline.record_status(999, 0));
    }

    #[test]
    fn completion_line_lists_one_status_per_stage() {
        let mut pipeline = Pipeline {
            raw: "echo hi | tr h H".to_string(),
            commands: vec![stage(&["echo", "hi"]), stage(&["tr", "h", "H"])],
            background: false,
        };
        pipeline.commands[0].status = Some(0);
        pipeline.commands[1].status = Some(0);

        assert_eq!(
            pipeline.completion_line(),
            "+ completed 'echo hi | tr h H' [0][0]"
        );
    }

    #[test]
    fn completion_line_preserves_the_raw_line() {
        let mut pipeline = Pipeline {
            raw: "sleep 1 &".to_string(),
            commands: vec![stage(&["sleep", "1"])],
            background: true,
        };
        pipeline.commands[0].status = Some(0);

        assert_eq!(pipeline.completion_line(), "+ completed 'sleep 1 &' [0]");
    }
}
