//! Advisory file hints for the local backend.
//!
//! Both calls are hints only: failures are logged and otherwise ignored, and
//! on platforms without them they do nothing.

#[cfg(any(target_os = "linux", target_os = "android"))]
#[allow(unsafe_code)]
mod imp {
    use std::fs::File;
    use std::os::fd::AsRawFd;

    pub fn preallocate(file: &File, size: u64) {
        let Ok(len) = libc::off_t::try_from(size) else {
            return;
        };
        if len == 0 {
            return;
        }
        // SAFETY: the descriptor is owned by `file` and stays open for the call.
        let rc = unsafe { libc::posix_fallocate(file.as_raw_fd(), 0, len) };
        if rc != 0 {
            tracing::debug!(errno = rc, size, "posix_fallocate unavailable");
        }
    }

    pub fn advise_sequential(file: &File) {
        // SAFETY: the descriptor is owned by `file` and stays open for the call.
        let rc = unsafe {
            libc::posix_fadvise(file.as_raw_fd(), 0, 0, libc::POSIX_FADV_SEQUENTIAL)
        };
        if rc != 0 {
            tracing::debug!(errno = rc, "posix_fadvise unavailable");
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
mod imp {
    use std::fs::File;

    pub fn preallocate(_file: &File, _size: u64) {}

    pub fn advise_sequential(_file: &File) {}
}

pub(crate) use imp::{advise_sequential, preallocate};
