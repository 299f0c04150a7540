//! Service configuration, from flags or `WORKSPACE_*` environment variables

use crate::models::TerminalSize;
use crate::services::PtyLauncher;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Shared project workspace backend.
///
/// Serves the file tree of one project directory and a shell mirrored to every
/// connected client over WebSocket.
#[derive(Parser, Debug, Clone)]
#[command(name = "workspace-hub")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "WORKSPACE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "WORKSPACE_PORT", default_value_t = 3001)]
    pub port: u16,

    /// Only browser connections from this origin are accepted; `*` allows all
    #[arg(long, env = "WORKSPACE_ALLOWED_ORIGIN", default_value = "http://localhost:3000")]
    pub allowed_origin: String,

    /// Initial workspace root (defaults to the current directory)
    #[arg(long, env = "WORKSPACE_ROOT")]
    pub root: Option<PathBuf>,

    /// Shell to run in the shared terminal (defaults to $SHELL)
    #[arg(long, env = "WORKSPACE_SHELL")]
    pub shell: Option<String>,

    /// Initial terminal width
    #[arg(long, default_value_t = 80)]
    pub cols: u16,

    /// Initial terminal height
    #[arg(long, default_value_t = 24)]
    pub rows: u16,

    /// Upper bound on threads running filesystem work
    #[arg(long, env = "WORKSPACE_BLOCKING_THREADS", default_value_t = 8)]
    pub blocking_threads: usize,

    /// Enable verbose logging (debug level)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address {addr}: {e}"))
    }

    pub fn root(&self) -> anyhow::Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }

    pub fn shell(&self) -> String {
        self.shell.clone().unwrap_or_else(PtyLauncher::default_shell)
    }

    pub fn allowed_origin(&self) -> Option<String> {
        match self.allowed_origin.trim() {
            "*" => None,
            origin => Some(origin.to_string()),
        }
    }

    pub fn terminal_size(&self) -> TerminalSize {
        TerminalSize {
            cols: self.cols,
            rows: self.rows,
        }
    }

    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_fixed_port_and_origin() {
        let config = Config::try_parse_from(["workspace-hub"]).unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.allowed_origin().as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:3001");
        assert_eq!(config.terminal_size(), TerminalSize { cols: 80, rows: 24 });
    }

    #[test]
    fn wildcard_origin_disables_the_check() {
        let config =
            Config::try_parse_from(["workspace-hub", "--allowed-origin", "*"]).unwrap();
        assert_eq!(config.allowed_origin(), None);
    }

    #[test]
    fn explicit_root_and_shell_win() {
        let config = Config::try_parse_from([
            "workspace-hub",
            "--root",
            "/srv/project",
            "--shell",
            "/bin/zsh",
            "-v",
        ])
        .unwrap();
        assert_eq!(config.root().unwrap(), PathBuf::from("/srv/project"));
        assert_eq!(config.shell(), "/bin/zsh");
        assert_eq!(config.log_filter(), "debug");
    }
}
