//! services/shell/src/adapters/links.rs
//!
//! Hands external locators to the operating system's default handler.
//!
//! The locator is always passed as a single argument to a launcher that
//! does not go through a shell, so `&`, `|` and `^` in a query string reach
//! the handler unchanged.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;
use webshell_core::ports::{LinkOpener, PortError, PortResult};

#[derive(Clone, Default)]
pub struct OsLinkOpener;

/// Program and arguments that open `url` on the named OS
/// (`std::env::consts::OS` values).
fn launcher(os: &str, url: &str) -> (&'static str, Vec<String>) {
    match os {
        "macos" => ("open", vec![url.to_string()]),
        "windows" => (
            "rundll32",
            vec!["url.dll,FileProtocolHandler".to_string(), url.to_string()],
        ),
        _ => ("xdg-open", vec![url.to_string()]),
    }
}

impl OsLinkOpener {
    fn command(url: &str) -> Command {
        let (program, args) = launcher(std::env::consts::OS, url);
        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd
    }
}

#[async_trait]
impl LinkOpener for OsLinkOpener {
    async fn open_url(&self, url: &str) -> PortResult<()> {
        let status = Self::command(url)
            .status()
            .await
            .map_err(|e| PortError::Unexpected(format!("failed to launch link handler: {e}")))?;
        if !status.success() {
            return Err(PortError::Unexpected(format!(
                "link handler exited with {status}"
            )));
        }
        info!(url, "Opened with the OS handler");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;

    const MAP_URL: &str = "https://map.naver.com/?lat=1&lng=2|x^y&calc";

    #[test]
    fn windows_launch_bypasses_the_shell() {
        let (program, args) = launcher("windows", MAP_URL);
        assert_eq!(program, "rundll32");
        assert_eq!(
            args,
            vec!["url.dll,FileProtocolHandler".to_string(), MAP_URL.to_string()]
        );
    }

    #[test]
    fn url_is_one_untouched_argument_everywhere() {
        for os in ["macos", "linux", "freebsd"] {
            let (program, args) = launcher(os, MAP_URL);
            assert_ne!(program, "cmd");
            assert_eq!(args, vec![MAP_URL.to_string()], "{os}");
        }
    }

    #[test]
    fn command_targets_the_host_launcher() {
        let cmd = OsLinkOpener::command(MAP_URL);
        let std_cmd = cmd.as_std();
        let (program, args) = launcher(std::env::consts::OS, MAP_URL);
        assert_eq!(std_cmd.get_program(), program);
        let built: Vec<&OsStr> = std_cmd.get_args().collect();
        let expected: Vec<&OsStr> = args.iter().map(OsStr::new).collect();
        assert_eq!(built, expected);
    }
}
