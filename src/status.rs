/// Decode a raw `waitpid` status into shell-style exit code semantics.
///
/// Processes terminated by a signal map to `128 + signal`.
pub fn exit_code_from_wait_status(raw_status: libc::c_int) -> i32 {
    if unsafe { libc::WIFEXITED(raw_status) } {
        return unsafe { libc::WEXITSTATUS(raw_status) };
    }

    if unsafe { libc::WIFSIGNALED(raw_status) } {
        let signal = unsafe { libc::WTERMSIG(raw_status) };
        return 128 + signal;
    }

    1
}
