use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use karte_core::GeneratorSettings;

/// Server options. Each flag falls back to an environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "karte-server", version, about = "Flowchart generation endpoint for clinical hypotheses")]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(long, env = "KARTE_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Settings file to read instead of ~/.karte/settings.json
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Upper bound for the completion call in seconds. Unset or 0 waits indefinitely.
    #[arg(long, env = "KARTE_UPSTREAM_TIMEOUT_SECS")]
    pub upstream_timeout_secs: Option<u64>,
}

impl ServerArgs {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn upstream_timeout(&self) -> Option<Duration> {
        self.upstream_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Settings file overlaid with `GEMINI_*` environment variables.
    pub fn generator_settings(&self) -> GeneratorSettings {
        GeneratorSettings::load(self.settings.as_deref())
    }
}
