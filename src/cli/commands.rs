//! CLI command definitions

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chatgate")]
#[command(about = "Access-control gateway for pub/sub chat namespaces", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Subscribe key of the keyset the gateway acts for
    #[arg(long, env = "CHATGATE_SUBSCRIBE_KEY", global = true, default_value = "")]
    pub subscribe_key: String,

    /// Publish key of the keyset the gateway acts for
    #[arg(long, env = "CHATGATE_PUBLISH_KEY", global = true, default_value = "", hide_env_values = true)]
    pub publish_key: String,

    /// Signing secret, base64 encoded
    #[arg(long, env = "CHATGATE_SECRET_KEY", global = true, hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Upstream pub/sub host
    #[arg(long, env = "CHATGATE_UPSTREAM_ORIGIN", global = true, default_value = chatgate::config::DEFAULT_UPSTREAM_ORIGIN)]
    pub upstream_origin: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the gateway HTTP server
    Serve {
        /// Address to bind to
        #[arg(short, long, default_value = "0.0.0.0:8080", env = "CHATGATE_BIND")]
        bind: String,

        /// Seconds allowed for each store, vault, grant or fetch call
        #[arg(long, default_value_t = 10, env = "CHATGATE_CALL_TIMEOUT")]
        call_timeout: u64,

        /// Postgres URL for chat metadata and user state (in-memory if unset)
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },

    /// Check global channel names against the reserved topology
    ///
    /// Examples:
    ///   chatgate validate acme 'acme#chat#public'
    Validate {
        /// Global channel(s) to check
        #[arg(required = true)]
        globals: Vec<String>,
    },

    /// Print the grant a route would request, as JSON
    ///
    /// Examples:
    ///   chatgate grants bootstrap --global acme --uuid u1 --auth-key k
    ///   chatgate grants grant --channel 'acme#chat#public.lobby' --auth-key k
    Grants {
        /// Route: user_read, user_write, bootstrap, group or grant
        route: String,

        #[arg(long)]
        global: Option<String>,

        #[arg(long)]
        uuid: Option<String>,

        #[arg(long)]
        auth_key: Option<String>,

        /// Chat channel (grant route)
        #[arg(long)]
        channel: Option<String>,
    },

    /// Sign an upstream request and print its URL
    ///
    /// Examples:
    ///   chatgate sign /v1/channel-registration/sub-key/sub-c/channel-group/g -p add=c -p uuid=u1
    Sign {
        /// Request path
        path: String,

        /// Query option as key=value (can be repeated)
        #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,

        /// Fixed unix timestamp instead of now
        #[arg(long)]
        timestamp: Option<u64>,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}
