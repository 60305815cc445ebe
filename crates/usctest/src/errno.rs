//! Access to the calling thread's C `errno`.
//!
//! The call wrappers need to clear `errno` before the operation under test and
//! read it back immediately afterwards. Reading goes through
//! `std::io::Error::last_os_error`; writing needs the platform's errno
//! location accessor.

use std::ffi::c_int;

#[cfg(any(target_os = "linux", target_os = "emscripten", target_os = "redox"))]
#[allow(unsafe_code)]
fn errno_location() -> *mut c_int {
    // SAFETY: always returns a valid pointer to the calling thread's errno.
    unsafe { libc::__errno_location() }
}

#[cfg(any(target_os = "android", target_os = "netbsd", target_os = "openbsd"))]
#[allow(unsafe_code)]
fn errno_location() -> *mut c_int {
    // SAFETY: always returns a valid pointer to the calling thread's errno.
    unsafe { libc::__errno() }
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
#[allow(unsafe_code)]
fn errno_location() -> *mut c_int {
    // SAFETY: always returns a valid pointer to the calling thread's errno.
    unsafe { libc::__error() }
}

/// Current value of `errno` for the calling thread.
#[inline]
#[must_use]
pub fn get() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// Overwrite `errno` for the calling thread.
#[inline]
#[allow(unsafe_code)]
pub fn set(value: i32) {
    // SAFETY: the pointer refers to thread-local storage owned by libc and is
    // valid for the lifetime of the thread.
    unsafe { *errno_location() = value };
}

/// Reset `errno` to zero.
#[inline]
pub fn clear() {
    set(0);
}

/// Symbolic name for common errno values, used by reports and log records.
#[must_use]
pub fn name(value: i32) -> &'static str {
    match value {
        0 => "OK",
        libc::EPERM => "EPERM",
        libc::ENOENT => "ENOENT",
        libc::ESRCH => "ESRCH",
        libc::EINTR => "EINTR",
        libc::EIO => "EIO",
        libc::ENXIO => "ENXIO",
        libc::E2BIG => "E2BIG",
        libc::ENOEXEC => "ENOEXEC",
        libc::EBADF => "EBADF",
        libc::ECHILD => "ECHILD",
        libc::EAGAIN => "EAGAIN",
        libc::ENOMEM => "ENOMEM",
        libc::EACCES => "EACCES",
        libc::EFAULT => "EFAULT",
        libc::EBUSY => "EBUSY",
        libc::EEXIST => "EEXIST",
        libc::EXDEV => "EXDEV",
        libc::ENODEV => "ENODEV",
        libc::ENOTDIR => "ENOTDIR",
        libc::EISDIR => "EISDIR",
        libc::EINVAL => "EINVAL",
        libc::ENFILE => "ENFILE",
        libc::EMFILE => "EMFILE",
        libc::ENOTTY => "ENOTTY",
        libc::EFBIG => "EFBIG",
        libc::ENOSPC => "ENOSPC",
        libc::ESPIPE => "ESPIPE",
        libc::EROFS => "EROFS",
        libc::EMLINK => "EMLINK",
        libc::EPIPE => "EPIPE",
        libc::EDOM => "EDOM",
        libc::ERANGE => "ERANGE",
        libc::EDEADLK => "EDEADLK",
        libc::ENAMETOOLONG => "ENAMETOOLONG",
        libc::ENOSYS => "ENOSYS",
        libc::ENOTEMPTY => "ENOTEMPTY",
        libc::ELOOP => "ELOOP",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips_on_same_thread() {
        set(libc::EINVAL);
        assert_eq!(get(), libc::EINVAL);
        clear();
        assert_eq!(get(), 0);
    }

    #[test]
    fn errno_is_thread_local() {
        set(libc::ENOENT);
        let other = std::thread::spawn(|| {
            set(libc::EPERM);
            get()
        })
        .join()
        .unwrap();
        assert_eq!(other, libc::EPERM);
        assert_eq!(get(), libc::ENOENT);
        clear();
    }

    #[test]
    fn names_cover_common_values() {
        assert_eq!(name(0), "OK");
        assert_eq!(name(libc::EBADF), "EBADF");
        assert_eq!(name(-12345), "UNKNOWN");
    }
}
