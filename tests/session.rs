//! End-to-end session tests against a live listener, speaking the wire
//! protocol through a real socket.

use basalt::block::{self, BlockTypeTable};
use basalt::chunk::store::FlatWorldStore;
use basalt::config::ServerConfig;
use basalt::game::Game;
use basalt::server::Server;
use protocol::packets::*;
use protocol::{encode, CodecError, Deserializable};
use std::io::{Cursor, ErrorKind};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

const RADIUS: i32 = 2;

async fn start_server(tick_period: Duration) -> (SocketAddr, Game) {
    let mut config = ServerConfig::new(
        "127.0.0.1:0".parse().unwrap(),
        Arc::new(FlatWorldStore::new()),
        Arc::new(BlockTypeTable::standard()),
    );
    config.tick_period = tick_period;
    config.chunk_radius = RADIUS;

    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let game = server.game();
    tokio::spawn(server.run());
    (addr, game)
}

/// A quiet server: the ticker will not fire during the test.
async fn start_quiet_server() -> (SocketAddr, Game) {
    start_server(Duration::from_secs(3600)).await
}

struct Client {
    socket: TcpStream,
    buf: Vec<u8>,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Client {
        Client {
            socket: TcpStream::connect(addr).await.unwrap(),
            buf: Vec::new(),
        }
    }

    async fn send(&mut self, packet: &ServerBound) {
        self.socket
            .write_all(&encode(packet).unwrap())
            .await
            .unwrap();
    }

    async fn recv(&mut self) -> ClientBound {
        loop {
            if !self.buf.is_empty() {
                let mut cursor = Cursor::new(&self.buf[..]);
                match ClientBound::from_reader(&mut cursor) {
                    Ok(packet) => {
                        let consumed = cursor.position() as usize;
                        self.buf.drain(..consumed);
                        return packet;
                    }
                    Err(CodecError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {}
                    Err(e) => panic!("bad packet from server: {}", e),
                }
            }
            let mut chunk = [0u8; 4096];
            let n = self.socket.read(&mut chunk).await.unwrap();
            assert_ne!(n, 0, "server closed the connection mid-read");
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    async fn login(&mut self, username: &str) -> i32 {
        self.send(&ServerBound::Handshake(Handshake {
            username: username.to_string(),
        }))
        .await;
        match self.recv().await {
            ClientBound::Handshake(reply) => assert_eq!(reply.connection_hash, "-"),
            other => panic!("expected a handshake reply, got {:?}", other),
        }

        self.send(&ServerBound::Login(LoginRequest {
            protocol_version: PROTOCOL_VERSION,
            username: username.to_string(),
            map_seed: 0,
            dimension: 0,
        }))
        .await;
        match self.recv().await {
            ClientBound::Login(response) => response.entity_id,
            other => panic!("expected a login response, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn login_window_arrives_in_protocol_order() {
    let (addr, _game) = start_quiet_server().await;
    let mut client = Client::connect(addr).await;
    let entity_id = client.login("alice").await;
    assert_eq!(entity_id, 1);

    match client.recv().await {
        ClientBound::SpawnPosition(spawn) => {
            assert_eq!((spawn.x, spawn.y, spawn.z), (8, 65, 8));
        }
        other => panic!("expected the spawn position first, got {:?}", other),
    }

    let window = (2 * RADIUS + 1) * (2 * RADIUS + 1);
    for i in 0..window {
        match client.recv().await {
            ClientBound::PreChunk(pre) => {
                assert!(pre.mode);
                if i == 0 {
                    assert_eq!((pre.cx, pre.cz), (-RADIUS, -RADIUS));
                }
            }
            other => panic!("expected pre-chunk {}, got {:?}", i, other),
        }
    }

    for i in 0..window {
        match client.recv().await {
            ClientBound::MapChunk(map) => {
                assert_eq!(map.payload.0.len(), payload_len(15, 127, 15));
                if i == 0 {
                    assert_eq!((map.x, map.z), (-RADIUS * 16, -RADIUS * 16));
                    // the surface of the flat world is grass
                    let index = 64 + 8 * 128 + 8 * 128 * 16;
                    assert_eq!(map.payload.0[index], block::GRASS);
                }
            }
            other => panic!("expected map chunk {}, got {:?}", i, other),
        }
    }

    for expected in [(WINDOW_MAIN, 36), (WINDOW_ARMOUR, 4), (WINDOW_CRAFTING, 4)] {
        match client.recv().await {
            ClientBound::WindowItems(items) => {
                assert_eq!(items.window, expected.0);
                assert_eq!(items.slots.len(), expected.1);
                assert!(items.slots.iter().all(Slot::is_empty));
            }
            other => panic!("expected an inventory window, got {:?}", other),
        }
    }

    match client.recv().await {
        ClientBound::PlayerPositionLook(look) => {
            assert_eq!((look.x, look.y, look.z), (8.5, 65.0, 8.5));
            assert_eq!(look.stance, 65.0 + 1.62);
            assert_eq!((look.yaw, look.pitch), (0.0, 0.0));
        }
        other => panic!("expected the position/look release, got {:?}", other),
    }
}

#[tokio::test]
async fn entity_ids_grow_across_sessions() {
    let (addr, _game) = start_quiet_server().await;
    let first = Client::connect(addr).await.login("alice").await;
    let second = Client::connect(addr).await.login("bob").await;
    assert!(second > first);
}

#[tokio::test]
async fn movement_and_chat_are_consumed_silently() {
    let (addr, game) = start_quiet_server().await;
    let mut client = Client::connect(addr).await;
    let id = client.login("alice").await;

    // swallow the whole login window
    loop {
        if let ClientBound::PlayerPositionLook(_) = client.recv().await {
            break;
        }
    }

    for i in 0..20u32 {
        client
            .send(&ServerBound::PlayerPosition(PlayerPosition {
                x: 8.5 + f64::from(i),
                y: 65.0,
                stance: 66.62,
                z: 8.5,
                on_ground: true,
            }))
            .await;
    }
    client
        .send(&ServerBound::ChatMessage(ChatMessage {
            message: "hello".to_string(),
        }))
        .await;

    // the server applies the updates in arrival order...
    let position = timeout(Duration::from_secs(5), async {
        loop {
            let position = game.query(move |g| g.player_position(id)).await.unwrap();
            if let Some(position) = position.filter(|p| p.x == 27.5) {
                return position;
            }
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!((position.y, position.z), (65.0, 8.5));

    // ...and echoes none of it back
    assert!(timeout(Duration::from_millis(300), client.recv())
        .await
        .is_err());
}

#[tokio::test]
async fn ticks_deliver_time_updates() {
    let (addr, _game) = start_server(Duration::from_millis(20)).await;
    let mut client = Client::connect(addr).await;
    client.login("alice").await;

    let mut times = Vec::new();
    while times.len() < 2 {
        if let ClientBound::TimeUpdate(update) = client.recv().await {
            times.push(update.time);
        }
    }
    assert!(times[1] > times[0]);
}

#[tokio::test]
async fn unsupported_protocol_version_is_turned_away() {
    let (addr, game) = start_quiet_server().await;
    let mut client = Client::connect(addr).await;

    client
        .send(&ServerBound::Handshake(Handshake {
            username: "alice".to_string(),
        }))
        .await;
    client.recv().await;

    client
        .send(&ServerBound::Login(LoginRequest {
            protocol_version: 99,
            username: "alice".to_string(),
            map_seed: 0,
            dimension: 0,
        }))
        .await;
    match client.recv().await {
        ClientBound::Disconnect(disconnect) => {
            assert!(disconnect.reason.contains("99"));
        }
        other => panic!("expected a disconnect, got {:?}", other),
    }
    assert_eq!(game.player_count().await, 0);
}

#[tokio::test]
async fn abrupt_close_removes_the_player() {
    let (addr, game) = start_quiet_server().await;
    let mut client = Client::connect(addr).await;
    client.login("alice").await;
    assert_eq!(game.player_count().await, 1);

    drop(client);

    timeout(Duration::from_secs(5), async {
        while game.player_count().await != 0 {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn quit_packet_removes_the_player() {
    let (addr, game) = start_quiet_server().await;
    let mut client = Client::connect(addr).await;
    client.login("alice").await;

    client
        .send(&ServerBound::Disconnect(Disconnect {
            reason: "quitting".to_string(),
        }))
        .await;

    timeout(Duration::from_secs(5), async {
        while game.player_count().await != 0 {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
}
