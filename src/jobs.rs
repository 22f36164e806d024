use std::collections::VecDeque;
use std::io::{self, Write};

use crate::ast::Pipeline;
use crate::status;
use crate::sys;

/// The shell's record of currently-running background pipelines, in FIFO
/// insertion order. Foreground pipelines never enter the table; a job leaves
/// it as soon as its completion line has been printed.
pub struct JobTable {
    jobs: VecDeque<Pipeline>,
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTable {
    pub fn new() -> Self {
        Self {
            jobs: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Track a freshly launched background pipeline.
    pub fn push(&mut self, pipeline: Pipeline) {
        self.jobs.push_back(pipeline);
    }

    /// Credit a reaped pid to whichever job owns it.
    /// Returns false if no job does.
    pub fn record_status(&mut self, pid: libc::pid_t, code: i32) -> bool {
        self.jobs.iter_mut().any(|job| job.record_status(pid, code))
    }

    /// Block until the foreground pipeline finishes.
    ///
    /// Waits for any child at a time: pids belonging to the foreground
    /// pipeline are recorded there, anything else is a background child
    /// reaped opportunistically and credited to its job. Its completion line
    /// still waits for the next poll, after the foreground line has printed.
    pub fn wait_foreground(&mut self, foreground: &mut Pipeline) {
        while !foreground.is_finished() {
            let (pid, raw_status) = match sys::wait_any() {
                Ok(reaped) => reaped,
                Err(error) => {
                    eprintln!("sshell: waitpid: {error}");
                    return;
                }
            };

            let code = status::exit_code_from_wait_status(raw_status);
            if !foreground.record_status(pid, code) {
                self.record_status(pid, code);
            }
        }
    }

    /// Non-blocking reap of every still-running job, then one completion line
    /// per newly finished job, oldest first.
    pub fn reap(&mut self, stderr: &mut dyn Write) {
        for job in &mut self.jobs {
            for cmd in &mut job.commands {
                if cmd.status.is_some() {
                    continue;
                }
                let Some(pid) = cmd.pid else { continue };

                match sys::try_wait(pid) {
                    Ok(Some(raw_status)) => {
                        cmd.status = Some(status::exit_code_from_wait_status(raw_status));
                    }
                    Ok(None) => {}
                    Err(error) => {
                        // A child we cannot wait for is gone; record a failure
                        // so the job can retire instead of wedging the table.
                        let _ = writeln!(stderr, "sshell: waitpid: {error}");
                        cmd.status = Some(1);
                    }
                }
            }
        }

        self.report_finished(stderr);
    }

    /// Blocking wait for every remaining job, reporting each in FIFO order.
    /// Used once stdin is exhausted and the shell is on its way out.
    pub fn drain(&mut self, stderr: &mut dyn Write) {
        while let Some(mut job) = self.jobs.pop_front() {
            for cmd in &mut job.commands {
                if cmd.status.is_some() {
                    continue;
                }
                let Some(pid) = cmd.pid else { continue };

                cmd.status = Some(match sys::wait_pid(pid) {
                    Ok(raw_status) => status::exit_code_from_wait_status(raw_status),
                    Err(error) => {
                        let _ = writeln!(stderr, "sshell: waitpid: {error}");
                        1
                    }
                });
            }
            let _ = writeln!(stderr, "{}", job.completion_line());
        }
    }

    fn report_finished(&mut self, stderr: &mut dyn Write) {
        // Finished jobs are dropped the moment their line prints, so no line
        // can ever be emitted twice. `retain` keeps the FIFO order intact.
        self.jobs.retain(|job| {
            if job.is_finished() {
                let _ = writeln!(stderr, "{}", job.completion_line());
                false
            } else {
                true
            }
        });
    }
}

/// Print a foreground pipeline's completion line.
pub fn report_completion(pipeline: &Pipeline) {
    let _ = writeln!(io::stderr(), "{}", pipeline.completion_line());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn finished_job(line: &str, code: i32) -> Pipeline {
        let mut pipeline = parser::parse(line).unwrap().unwrap();
        for cmd in &mut pipeline.commands {
            cmd.status = Some(code);
        }
        pipeline
    }

    #[test]
    fn finished_jobs_are_reported_fifo_and_removed() {
        let mut table = JobTable::new();
        table.push(finished_job("sleep 1 &", 0));
        table.push(finished_job("sleep 2 &", 0));

        let mut err = Vec::new();
        table.reap(&mut err);

        let report = String::from_utf8_lossy(&err);
        let first = report.find("+ completed 'sleep 1 &' [0]").expect("first job");
        let second = report.find("+ completed 'sleep 2 &' [0]").expect("second job");
        assert!(first < second, "report was: {report}");
        assert!(table.is_empty());
    }

    #[test]
    fn unfinished_jobs_stay_in_the_table() {
        let mut table = JobTable::new();
        // Never launched, so no pid and no status: reap must leave it alone.
        table.push(parser::parse("sleep 9 &").unwrap().unwrap());

        let mut err = Vec::new();
        table.reap(&mut err);

        assert!(!table.is_empty());
        assert!(err.is_empty(), "unexpected report: {}", String::from_utf8_lossy(&err));
    }

    #[test]
    fn record_status_finds_the_owning_job() {
        let mut table = JobTable::new();
        let mut job = parser::parse("sleep 9 &").unwrap().unwrap();
        job.commands[0].pid = Some(4242);
        table.push(job);

        assert!(table.record_status(4242, 0));
        assert!(!table.record_status(1, 0));

        let mut err = Vec::new();
        table.reap(&mut err);
        assert!(table.is_empty());
    }
}
