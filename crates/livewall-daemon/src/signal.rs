//! POSIX signal delivery

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use livewall_core::prelude::*;

/// Send SIGTERM to `pid`.
///
/// A process that is already gone (`ESRCH`) counts as success.
pub fn send_terminate(pid: u32) -> Result<()> {
    let raw = i32::try_from(pid)
        .ok()
        .filter(|&p| p > 0)
        .ok_or_else(|| Error::signal(pid, "invalid pid"))?;

    match signal::kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => {
            debug!("Process {} already gone", pid);
            Ok(())
        }
        Err(e) => Err(Error::signal(pid, e.desc())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_pid_is_rejected() {
        // kill(0, ..) would signal our own process group
        assert!(matches!(send_terminate(0), Err(Error::Signal { pid: 0, .. })));
    }

    #[test]
    fn test_pid_out_of_range_is_rejected() {
        assert!(send_terminate(u32::MAX).is_err());
    }

    #[tokio::test]
    async fn test_terminate_running_child() {
        let mut child = tokio::process::Command::new("sh")
            .args(["-c", "sleep 60"])
            .kill_on_drop(true)
            .spawn()
            .expect("sh must be available in test environment");
        let pid = child.id().expect("child has a pid");

        send_terminate(pid).expect("SIGTERM should be delivered");

        let status = tokio::time::timeout(std::time::Duration::from_secs(5), child.wait())
            .await
            .expect("child should exit after SIGTERM")
            .expect("wait should succeed");
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(status.signal(), Some(15));
    }
}
