//! Maze Duel
//!
//! Command line entry point: generate mazes, host a session, join one, or
//! race autopilots locally.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use maze_duel::{
    TICK_RATE, VERSION,
    config::{ClientConfig, MazeConfig, ServerConfig},
    core::{hash::short_hex, rng::MazeRng},
    game::{
        input::{Autopilot, IntentSource},
        state::{PlayerId, SessionState},
        tick::run_local,
    },
    maze::{
        generator::{generate, Algorithm},
        solver::{astar, mark_solution},
        text,
    },
    network::{GameClient, GameServer},
};

#[derive(Parser, Debug)]
#[command(name = "maze-duel", version, about = "Perfect mazes and two-player maze races")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a maze and print it
    Generate {
        #[command(flatten)]
        maze: MazeArgs,
        /// Load this maze instead of generating one
        #[arg(long)]
        file: Option<PathBuf>,
        /// Also write it to a timestamped file
        #[arg(long)]
        save: bool,
    },
    /// Host two-player sessions
    Serve {
        #[command(flatten)]
        maze: MazeArgs,
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: SocketAddr,
        /// Serve this maze file instead of generating one per session
        #[arg(long)]
        maze_file: Option<PathBuf>,
        /// Seconds to wait for a client record before ending its session
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
    /// Join a server with an autopilot player
    Join {
        /// Server as `ip`, `ip:port` or `ws://` URL
        #[arg(default_value = "127.0.0.1")]
        host: String,
    },
    /// Race autopilots in this process
    Local {
        #[command(flatten)]
        maze: MazeArgs,
        /// Number of players (1 or 2)
        #[arg(long, default_value_t = 2)]
        players: usize,
        /// Give up after this many ticks
        #[arg(long, default_value_t = 60 * 60 * 5)]
        max_ticks: u64,
    },
}

#[derive(Args, Debug)]
struct MazeArgs {
    /// Width in cells (6-19)
    #[arg(long, default_value_t = 10)]
    width: u32,
    /// Height in cells (6-19)
    #[arg(long, default_value_t = 10)]
    height: u32,
    /// Carving algorithm: DFS or Prim
    #[arg(long, default_value_t = Algorithm::Dfs)]
    algorithm: Algorithm,
    /// Draw the solution
    #[arg(long)]
    solution: bool,
    /// Spawn bonuses and allow wall breaching
    #[arg(long)]
    bonuses: bool,
    /// Player speed (2-5)
    #[arg(long, default_value_t = 2)]
    speed: u32,
}

impl MazeArgs {
    fn into_config(self) -> Result<MazeConfig> {
        let config = MazeConfig {
            width: self.width,
            height: self.height,
            algorithm: self.algorithm,
            solution: self.solution,
            bonuses: self.bonuses,
            speed: self.speed,
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    info!("Maze Duel v{}", VERSION);

    match cli.command {
        Command::Generate { maze, file, save } => generate_maze(maze, file, save),
        Command::Serve { maze, bind, maze_file, timeout } => {
            let config = ServerConfig {
                bind_addr: bind,
                maze: maze.into_config()?,
                maze_file,
                io_timeout: Duration::from_secs(timeout),
            };
            serve(config).await
        }
        Command::Join { host } => join(ClientConfig::for_host(&host)).await,
        Command::Local { maze, players, max_ticks } => local(maze.into_config()?, players, max_ticks),
    }
}

fn init_tracing() {
    let default_level = if cfg!(feature = "debug-tracing") { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn generate_maze(maze: MazeArgs, file: Option<PathBuf>, save: bool) -> Result<()> {
    let config = maze.into_config()?;
    let mut grid = match file {
        Some(path) => text::load(&path).with_context(|| format!("loading {}", path.display()))?,
        None => generate(config.width, config.height, config.algorithm, &mut MazeRng::from_entropy()),
    };
    info!(
        width = grid.width(),
        height = grid.height(),
        algorithm = %config.algorithm,
        digest = %short_hex(&grid.digest()),
        "Maze ready"
    );

    if config.solution {
        match mark_solution(&mut grid) {
            Some(len) => info!("Solution: {} cells", len),
            None => warn!("Maze has no solution"),
        }
    }
    print!("{}", text::to_text(&grid));

    if save {
        let name = text::timestamped_file_name(chrono::Local::now());
        text::save(&grid, &name)?;
        info!("Saved to {}", name);
    }
    Ok(())
}

async fn serve(config: ServerConfig) -> Result<()> {
    let server = Arc::new(GameServer::bind(config).await?);

    let signal = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.shutdown();
        }
    });

    server.run().await?;
    Ok(())
}

async fn join(config: ClientConfig) -> Result<()> {
    let client = Arc::new(GameClient::new(config));

    let signal = client.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.shutdown();
        }
    });

    let mut pilot = Autopilot::new();
    let outcome = client.play(&mut pilot).await?;
    match (outcome.my_time, outcome.end) {
        (_, None) => info!("Left the session"),
        (my_time, Some(end)) => info!(
            player = outcome.player.name(),
            time = ?my_time,
            opponent_time = ?end.opponent_time,
            reason = ?end.reason,
            "{}",
            if end.you_won { "You won" } else { "You lost" }
        ),
    }
    Ok(())
}

fn local(config: MazeConfig, players: usize, max_ticks: u64) -> Result<()> {
    if !(1..=2).contains(&players) {
        bail!("Number of players must be 1 or 2, got {}", players);
    }

    let mut rng = MazeRng::from_entropy();
    let grid = generate(config.width, config.height, config.algorithm, &mut rng);
    if config.solution {
        match astar(&grid, grid.start(), grid.exit()) {
            Some(path) => info!("Solution: {} cells", path.len()),
            None => warn!("Maze has no solution"),
        }
    }
    info!(digest = %short_hex(&grid.digest()), "Local match on a {}x{} maze", config.width, config.height);

    let mut state = SessionState::new(grid, players, config.speed as f32, config.bonuses, rng)?;
    let mut sources: Vec<Box<dyn IntentSource>> = (0..players)
        .map(|_| Box::new(Autopilot::new()) as Box<dyn IntentSource>)
        .collect();

    let outcome = run_local(&mut state, &mut sources, max_ticks);
    for (slot, time) in outcome.times.iter().enumerate() {
        let name = PlayerId(slot as u8).name();
        match time {
            Some(t) => info!("{} finished in {:.2}s", name, t),
            None => info!("{} did not finish within {} ticks at {} Hz", name, max_ticks, TICK_RATE),
        }
    }
    match outcome.winner {
        Some(winner) => info!("Winner: {}", winner.name()),
        None => info!("No winner"),
    }
    Ok(())
}
