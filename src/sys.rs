//! Thin wrappers over the libc process primitives the executor and job table
//! are built on. Every wrapper retries EINTR.

use std::ffi::CString;
use std::io;
use std::os::unix::io::RawFd;

pub(crate) enum ForkResult {
    Parent(libc::pid_t),
    Child,
}

/// Fork the current process.
pub(crate) fn fork() -> io::Result<ForkResult> {
    // SAFETY: the shell is single threaded, so the child may keep running
    // arbitrary Rust code up to its exec or _exit.
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(io::Error::last_os_error());
    }
    if pid == 0 {
        Ok(ForkResult::Child)
    } else {
        Ok(ForkResult::Parent(pid))
    }
}

/// Duplicate `fd` onto `target`, replacing whatever `target` referred to.
pub(crate) fn replace_fd(fd: RawFd, target: RawFd) -> io::Result<()> {
    loop {
        let rc = unsafe { libc::dup2(fd, target) };
        if rc >= 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(err);
    }
}

/// Replace the process image with `argv[0]`, resolved through PATH.
/// Returns only on failure.
pub(crate) fn exec(argv: &[String]) -> io::Error {
    let mut args = Vec::with_capacity(argv.len());
    for arg in argv {
        match CString::new(arg.as_bytes()) {
            Ok(arg) => args.push(arg),
            Err(_) => return io::Error::from(io::ErrorKind::InvalidInput),
        }
    }
    if args.is_empty() {
        return io::Error::from(io::ErrorKind::InvalidInput);
    }

    let mut ptrs: Vec<*const libc::c_char> = args.iter().map(|arg| arg.as_ptr()).collect();
    ptrs.push(std::ptr::null());

    // SAFETY: `ptrs` is a null-terminated array of valid C strings that
    // outlives the call; execvp does not return on success.
    unsafe { libc::execvp(ptrs[0], ptrs.as_ptr()) };
    io::Error::last_os_error()
}

/// Blocking wait for any child. Returns the reaped pid and its raw status.
pub(crate) fn wait_any() -> io::Result<(libc::pid_t, libc::c_int)> {
    let mut raw_status: libc::c_int = 0;
    loop {
        let pid = unsafe { libc::waitpid(-1, &mut raw_status, 0) };
        if pid >= 0 {
            return Ok((pid, raw_status));
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(err);
    }
}

/// Blocking wait for one specific child.
pub(crate) fn wait_pid(pid: libc::pid_t) -> io::Result<libc::c_int> {
    let mut raw_status: libc::c_int = 0;
    loop {
        let rc = unsafe { libc::waitpid(pid, &mut raw_status, 0) };
        if rc >= 0 {
            return Ok(raw_status);
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(err);
    }
}

/// Non-blocking poll of one child. `None` means it is still running.
pub(crate) fn try_wait(pid: libc::pid_t) -> io::Result<Option<libc::c_int>> {
    let mut raw_status: libc::c_int = 0;
    loop {
        let rc = unsafe { libc::waitpid(pid, &mut raw_status, libc::WNOHANG) };
        if rc == 0 {
            return Ok(None);
        }
        if rc > 0 {
            return Ok(Some(raw_status));
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(err);
    }
}

/// Terminate a forked child without the shell's atexit and stdio teardown.
pub(crate) fn exit_child(code: i32) -> ! {
    unsafe { libc::_exit(code) }
}
