//! Command-line overrides on top of the environment config.

use clap::Parser;

use parabens_core::config::ChannelMode;
use parabens_core::Config;

/// Birthday notification server: HTTP admin API plus the daily scheduler.
#[derive(Parser, Debug)]
#[command(name = "parabens-server", version, about)]
pub struct Cli {
    /// Bind address (overrides HOST).
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port (overrides PORT).
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Ignore DATABASE_URL and keep records in memory.
    #[arg(long)]
    pub memory: bool,

    /// WhatsApp channel mode: `simulated` or `live` (overrides WHATSAPP_MODE).
    #[arg(long, value_parser = parse_mode)]
    pub whatsapp_mode: Option<ChannelMode>,
}

fn parse_mode(s: &str) -> Result<ChannelMode, String> {
    s.parse().map_err(|e: parabens_core::ParabensError| e.to_string())
}

impl Cli {
    /// Apply the flags that were given to `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref host) = self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.memory {
            config.database.url = None;
        }
        if let Some(mode) = self.whatsapp_mode {
            config.whatsapp.mode = mode;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "parabens-server",
            "--port",
            "8080",
            "--memory",
            "--whatsapp-mode",
            "live",
        ]);
        let mut config = Config::for_profile("CLI_TEST_UNUSED");
        config.database.url = Some("postgres://x@y/z".to_string());
        cli.apply(&mut config);
        assert_eq!(config.server.port, 8080);
        assert!(config.database.url.is_none());
        assert_eq!(config.whatsapp.mode, ChannelMode::Live);
    }

    #[test]
    fn bad_mode_is_rejected() {
        assert!(Cli::try_parse_from(["parabens-server", "--whatsapp-mode", "fax"]).is_err());
    }
}
