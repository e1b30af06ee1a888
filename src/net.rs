//! Connection workers. Each accepted socket gets a strict send/receive
//! split: the accepting task becomes the reader, decoding packets and
//! submitting work to the game loop; a writer task drains the bounded
//! transmit queue. Neither task ever touches world state directly.

use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::game::{EntityId, Game};
use crate::player::TxQueue;
use log::debug;
use protocol::packets::{
    ClientBound, Disconnect, HandshakeReply, LoginResponse, ServerBound, PROTOCOL_VERSION,
};
use protocol::{CodecError, Deserializable};
use std::io::{self, Cursor, ErrorKind};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// A decode may not outgrow this; the largest legal client packet is a few
/// hundred bytes.
const MAX_PACKET_SIZE: usize = 64 * 1024;

pub async fn handle_connection(socket: TcpStream, game: Game, config: ServerConfig) {
    let peer = socket
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());
    debug!("{} connected", peer);
    match serve(socket, &game, &config).await {
        Ok(()) => debug!("{} disconnected", peer),
        Err(e) => debug!("{}: connection closed: {}", peer, e),
    }
}

async fn serve(socket: TcpStream, game: &Game, config: &ServerConfig) -> Result<(), SessionError> {
    let (mut reader, mut writer) = socket.into_split();
    let mut rx_buf = Vec::new();

    // offline-mode login negotiation, before the split is armed
    let username = match read_packet(&mut reader, &mut rx_buf).await? {
        ServerBound::Handshake(handshake) => handshake.username,
        other => {
            return Err(SessionError::Protocol(format!(
                "expected a handshake, got {:?}",
                other
            )))
        }
    };
    write_packet(
        &mut writer,
        &ClientBound::Handshake(HandshakeReply {
            connection_hash: "-".to_string(),
        }),
    )
    .await?;

    let login = match read_packet(&mut reader, &mut rx_buf).await? {
        ServerBound::Login(login) => login,
        other => {
            return Err(SessionError::Protocol(format!(
                "expected a login, got {:?}",
                other
            )))
        }
    };
    if login.username != username {
        return Err(SessionError::Protocol(
            "login username differs from handshake".to_string(),
        ));
    }
    if login.protocol_version != PROTOCOL_VERSION {
        let reason = format!(
            "protocol version {} is not supported",
            login.protocol_version
        );
        let _ = write_packet(
            &mut writer,
            &ClientBound::Disconnect(Disconnect {
                reason: reason.clone(),
            }),
        )
        .await;
        return Err(SessionError::Protocol(reason));
    }

    let (tx, tx_queue) = TxQueue::new(config.tx_queue_depth);
    let entity_id = game
        .add_player(username, tx)
        .await
        .map_err(|_| SessionError::GameStopped)?;

    // the admission reply must beat everything the login streamer queued,
    // so it goes out before the writer task takes over the socket
    write_packet(
        &mut writer,
        &ClientBound::Login(LoginResponse {
            entity_id,
            server_name: String::new(),
            map_seed: 0,
            dimension: 0,
        }),
    )
    .await?;

    let writer_task = tokio::spawn(write_loop(writer, tx_queue));
    let result = read_loop(&mut reader, &mut rx_buf, game, entity_id).await;

    // whatever ended the read loop, the game loop owns the removal; the
    // queue closes when the player is dropped, and the writer drains out
    let _ = game.submit(move |g| g.remove_player(entity_id, "connection closed"));
    let _ = writer_task.await;
    result
}

async fn read_loop(
    reader: &mut OwnedReadHalf,
    rx_buf: &mut Vec<u8>,
    game: &Game,
    id: EntityId,
) -> Result<(), SessionError> {
    loop {
        match read_packet(reader, rx_buf).await? {
            ServerBound::KeepAlive(_) => {}
            ServerBound::ChatMessage(chat) => {
                submit(game, move |g| g.handle_chat(id, chat.message))?;
            }
            ServerBound::Flying(flying) => {
                submit(game, move |g| g.handle_flying(id, flying.on_ground))?;
            }
            ServerBound::PlayerPosition(p) => {
                submit(game, move |g| {
                    g.handle_position(id, p.x, p.y, p.stance, p.z, p.on_ground)
                })?;
            }
            ServerBound::PlayerLook(p) => {
                submit(game, move |g| {
                    g.handle_look(id, p.yaw, p.pitch, p.on_ground)
                })?;
            }
            ServerBound::PlayerPositionLook(p) => {
                submit(game, move |g| {
                    g.handle_position_look(id, p.x, p.y, p.stance, p.z, p.yaw, p.pitch, p.on_ground)
                })?;
            }
            ServerBound::PlayerDigging(p) => {
                submit(game, move |g| {
                    g.handle_digging(id, p.status, p.x, p.y, p.z, p.face)
                })?;
            }
            ServerBound::PlayerBlockPlacement(p) => {
                submit(game, move |g| {
                    g.handle_placement(id, p.block_id, p.x, p.y, p.z, p.direction)
                })?;
            }
            ServerBound::Disconnect(disconnect) => {
                debug!("entity {} quit: {}", id, disconnect.reason);
                return Ok(());
            }
            ServerBound::Handshake(_) | ServerBound::Login(_) => {
                return Err(SessionError::Protocol(
                    "login packet after login".to_string(),
                ));
            }
        }
    }
}

fn submit(
    game: &Game,
    work: impl FnOnce(&mut crate::game::GameState) + Send + 'static,
) -> Result<(), SessionError> {
    game.submit(work).map_err(|_| SessionError::GameStopped)
}

/// Reads one packet, buffering until a whole one has arrived. The decode is
/// restartable, so a short read only means more bytes are needed.
async fn read_packet(
    reader: &mut OwnedReadHalf,
    buf: &mut Vec<u8>,
) -> Result<ServerBound, SessionError> {
    loop {
        if !buf.is_empty() {
            let mut cursor = Cursor::new(&buf[..]);
            match ServerBound::from_reader(&mut cursor) {
                Ok(packet) => {
                    let consumed = cursor.position() as usize;
                    buf.drain(..consumed);
                    return Ok(packet);
                }
                Err(CodecError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {}
                Err(e) => return Err(e.into()),
            }
        }
        if buf.len() > MAX_PACKET_SIZE {
            return Err(SessionError::Protocol("oversized packet".to_string()));
        }

        let mut chunk = [0u8; 1024];
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(SessionError::Transport(io::Error::new(
                ErrorKind::UnexpectedEof,
                "connection closed",
            )));
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Writes a packet straight to the socket. Only used before the writer task
/// owns the write half.
async fn write_packet(
    writer: &mut OwnedWriteHalf,
    packet: &ClientBound,
) -> Result<(), SessionError> {
    let bytes = protocol::encode(packet)?;
    writer.write_all(&bytes).await?;
    Ok(())
}

/// The writer task: drain the queue, one whole slice per write, in queue
/// order. Exits when the queue closes or the socket dies.
async fn write_loop(mut writer: OwnedWriteHalf, mut queue: mpsc::Receiver<Vec<u8>>) {
    while let Some(bytes) = queue.recv().await {
        if let Err(e) = writer.write_all(&bytes).await {
            debug!("writer exiting: {}", e);
            return;
        }
    }
}
