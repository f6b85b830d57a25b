// OS-specific system queries

#[cfg(windows)]
pub mod windows;
