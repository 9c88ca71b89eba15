#[cfg(unix)]
pub fn is_elevated() -> bool {
    // On Unix, check if running as root
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn is_elevated() -> bool {
    // No portable probe here; callers treat "false" as "possibly
    // unprivileged" and only use it to phrase guidance.
    false
}
