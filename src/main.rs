mod ast;
mod builtins;
mod errors;
mod executor;
mod jobs;
mod parser;
mod status;
mod sys;

use std::io::{self, Write};

use crate::builtins::BuiltinAction;
use crate::executor::Launch;
use crate::jobs::JobTable;

#[derive(PartialEq)]
enum LineOutcome {
    Continue,
    Exit,
}

fn main() {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let interactive = atty::is(atty::Stream::Stdin);
    let mut jobs = JobTable::new();

    loop {
        // Completed background jobs are reported before each prompt.
        jobs.reap(&mut io::stderr());

        print!("sshell$ ");
        if stdout.flush().is_err() {
            break;
        }

        let mut input = String::new();
        match stdin.read_line(&mut input) {
            Ok(0) => {
                // End of input behaves like a typed `exit`.
                if process_line("exit", &mut jobs) == LineOutcome::Exit {
                    break;
                }
                // `exit` refused because background jobs are still running.
                // There is nothing left to read, so wait them out and leave.
                jobs.drain(&mut io::stderr());
                let _ = writeln!(io::stderr(), "Bye...");
                break;
            }
            Ok(_) => {
                let line = input.trim_end_matches('\n');
                // Echo piped input so transcripts interleave each command
                // with its output.
                if !interactive {
                    println!("{line}");
                    let _ = stdout.flush();
                }
                if process_line(line, &mut jobs) == LineOutcome::Exit {
                    break;
                }
            }
            Err(error) => {
                eprintln!("sshell: error reading input: {error}");
                break;
            }
        }
    }
}

/// Parse and run one input line, reporting errors and completions.
fn process_line(line: &str, jobs: &mut JobTable) -> LineOutcome {
    let mut pipeline = match parser::parse(line) {
        Ok(Some(pipeline)) => pipeline,
        Ok(None) => return LineOutcome::Continue,
        Err(error) => {
            errors::report(&error);
            return LineOutcome::Continue;
        }
    };

    match executor::run(&mut pipeline, jobs) {
        // Pre-exec validation failed: the line is discarded, nothing was
        // forked, and no completion line is printed.
        Err(error) => {
            errors::report(&error);
            LineOutcome::Continue
        }
        Ok(Launch::Builtin(BuiltinAction::Exit)) => LineOutcome::Exit,
        Ok(Launch::Builtin(BuiltinAction::Continue(_))) => {
            jobs::report_completion(&pipeline);
            LineOutcome::Continue
        }
        Ok(Launch::Spawned) => {
            if pipeline.background {
                jobs.push(pipeline);
            } else {
                jobs.wait_foreground(&mut pipeline);
                jobs::report_completion(&pipeline);
                // Background jobs that finished while the foreground ran are
                // reported after the foreground's own line.
                jobs.reap(&mut io::stderr());
            }
            LineOutcome::Continue
        }
    }
}
