//! Server configuration
//!
//! Parsed from the command line with clap. `Default` matches the CLI
//! defaults so tests and embedders can build a config without parsing.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "room_chat")]
#[command(about = "Multi-room line-based TCP chat server", long_about = None)]
pub struct Config {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value_t = 8888)]
    pub port: u16,

    /// Disable ANSI colours in client output
    #[arg(long)]
    pub no_color: bool,

    /// Keep rooms around after their last member leaves
    #[arg(long)]
    pub keep_empty_rooms: bool,

    /// Longest accepted input line in bytes
    #[arg(long, default_value_t = 1024)]
    pub max_line_length: usize,

    /// Messages buffered per client before deliveries are dropped
    #[arg(long, default_value_t = 64)]
    pub outbox_capacity: usize,
}

impl Config {
    /// Address to bind, as `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8888,
            no_color: false,
            keep_empty_rooms: false,
            max_line_length: 1024,
            outbox_capacity: 64,
        }
    }
}
