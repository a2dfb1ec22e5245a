//! Platform quirks

use std::fs;

/// Kernel version strings that identify WSL
fn mentions_wsl(version: &str) -> bool {
    let lower = version.to_lowercase();
    lower.contains("microsoft") || lower.contains("wsl")
}

/// True under the Windows Subsystem for Linux, where epoll never reports
/// a terminal as readable and the multiplexer has to use select()
pub fn is_wsl() -> bool {
    if std::env::var_os("WSL_DISTRO_NAME").is_some() {
        return true;
    }
    fs::read_to_string("/proc/version").is_ok_and(|v| mentions_wsl(&v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mentions_wsl() {
        assert!(mentions_wsl("Linux version 5.15.90.1-microsoft-standard-WSL2"));
        assert!(!mentions_wsl("Linux version 6.1.0-13-amd64 (debian-kernel@lists.debian.org)"));
    }
}
