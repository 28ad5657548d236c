//! Accept loop
//!
//! Starts the ChatServer actor and hands every accepted connection to its
//! own session task.

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::config::Config;
use crate::handler::{handle_connection, SessionSettings};
use crate::server::ChatServer;

/// Run the chat server on an already bound listener
///
/// Only returns if the listener can no longer be polled, which for a TCP
/// listener means never; accept errors are logged and skipped.
pub async fn serve(listener: TcpListener, config: Config) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let server = ChatServer::new(cmd_rx).keep_empty_rooms(config.keep_empty_rooms);
    tokio::spawn(server.run());

    info!("ChatServer actor started");

    let settings = SessionSettings::from(&config);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let cmd_tx = cmd_tx.clone();
                let settings = settings.clone();

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, cmd_tx, settings).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
