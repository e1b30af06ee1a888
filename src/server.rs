//! Wires the configuration record into a running server: one listener, one
//! game loop, one chunk manager.

use crate::chunk::manager::ChunkManager;
use crate::config::ServerConfig;
use crate::game::Game;
use crate::net;
use anyhow::Result;
use log::info;
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub struct Server {
    game: Game,
    listener: TcpListener,
    config: ServerConfig,
}

impl Server {
    /// Binds the listener and starts the game loop and chunk manager.
    pub async fn bind(config: ServerConfig) -> Result<Server> {
        let listener = TcpListener::bind(config.addr).await?;
        let chunks = ChunkManager::new(config.store.clone());
        let game = Game::spawn(config.clone(), chunks);
        info!("listening on {}", listener.local_addr()?);
        Ok(Server {
            game,
            listener,
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn game(&self) -> Game {
        self.game.clone()
    }

    /// Accepts connections forever, one worker pair per socket.
    pub async fn run(self) -> Result<()> {
        loop {
            let (socket, _) = self.listener.accept().await?;
            tokio::spawn(net::handle_connection(
                socket,
                self.game.clone(),
                self.config.clone(),
            ));
        }
    }
}
