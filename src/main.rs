use anyhow::Result;
use basalt::block::BlockTypeTable;
use basalt::chunk::store::FlatWorldStore;
use basalt::config::ServerConfig;
use basalt::server::Server;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "basalt", about = "A legacy-protocol block-world server")]
struct Opt {
    /// The address to listen on
    #[structopt(short, long, default_value = "0.0.0.0:25565", env = "BASALT_ADDR")]
    addr: SocketAddr,

    /// Milliseconds between world ticks
    #[structopt(long, default_value = "50", env = "BASALT_TICK_MS")]
    tick_ms: u64,

    /// Chunk radius streamed around every player
    #[structopt(short = "r", long, default_value = "10", env = "BASALT_RADIUS")]
    chunk_radius: i32,

    /// Transmit queue depth per connection
    #[structopt(long, default_value = "128", env = "BASALT_QUEUE_DEPTH")]
    queue_depth: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let mut config = ServerConfig::new(
        opt.addr,
        Arc::new(FlatWorldStore::new()),
        Arc::new(BlockTypeTable::standard()),
    );
    config.tick_period = Duration::from_millis(opt.tick_ms);
    config.chunk_radius = opt.chunk_radius;
    config.tx_queue_depth = opt.queue_depth;

    let server = Server::bind(config).await?;
    let game = server.game();

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            game.stop();
            Ok(())
        }
    }
}
