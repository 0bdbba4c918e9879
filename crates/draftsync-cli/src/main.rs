// draftsync entry point.
//
// Startup sequence:
// 1. Parse arguments, initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Run the requested command; `watch` spawns the transport and session
//    tasks, prints updates, and feeds stdin commands to the session

mod api;
mod cli;
mod input;
mod render;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{error, info, warn};

use draftsync_core::bootstrap::{self, CreateRoomRequest, RoomApi};
use draftsync_core::config::{self, Config};
use draftsync_core::draft::{DraftState, RoomStatus};
use draftsync_core::error::SyncError;
use draftsync_core::session::{self, DraftSession, Projection, SessionCommand};
use draftsync_core::transport;

use api::HttpRoomApi;
use cli::{Cli, Command, RoomRef};
use input::Input;
use render::WatchView;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing()?;
    info!("draftsync starting");

    let config =
        config::load_config(cli.config.as_deref()).context("failed to load configuration")?;
    info!(
        "Config loaded: api={}, ws={}",
        config.server.api_url, config.server.ws_url
    );

    let api = HttpRoomApi::new(&config.server.api_url);

    match cli.command {
        Command::Create {
            name,
            host,
            turn_time,
            rounds,
        } => {
            let req = CreateRoomRequest {
                name,
                host_name: host,
                turn_time_sec: turn_time,
                total_rounds: rounds,
            };
            let created = api.create_room(&req).await.context("failed to create room")?;
            println!("created room {} (join code {})", created.room_id, created.code);
        }

        Command::Join { room, user } => {
            let room_id = resolve_room(&api, &room).await?;
            let (joined, state) = bootstrap::join_and_load(&api, &room_id, &user)
                .await
                .context("failed to join room")?;
            println!(
                "joined {} as {} at draft position {}",
                room_id, user, joined.draft_position
            );
            if let Some(room) = state.room() {
                print!("{}", render::room_summary(room, state.picks()));
            }
        }

        Command::Start { room } => {
            let room_id = resolve_room(&api, &room).await?;
            let resp = api.start_draft(&room_id).await.context("failed to start draft")?;
            if !resp.success {
                anyhow::bail!("server refused to start the draft: {}", resp.message);
            }
            println!("{}", resp.message);
        }

        Command::Room { room } => {
            let room_id = resolve_room(&api, &room).await?;
            let details = api.get_room(&room_id).await.context("failed to load room")?;
            let picks = api.picks(&room_id).await.context("failed to load picks")?;
            print!("{}", render::room_summary(&details, &picks));
            match details.status {
                RoomStatus::Drafting => {
                    let pool = api
                        .available_players(&room_id)
                        .await
                        .context("failed to load available players")?;
                    println!("best available ({} left):", pool.len());
                    for line in render::best_available(&pool, 10) {
                        println!("{line}");
                    }
                }
                RoomStatus::Completed => {
                    let teams = api.teams(&room_id).await.context("failed to load teams")?;
                    print!("final rosters:\n{}", render::rosters(&teams));
                }
                _ => {}
            }
        }

        Command::Watch { room, user, join } => {
            let room_id = resolve_room(&api, &room).await?;
            watch_room(&config, &api, &room_id, &user, join).await?;
        }
    }

    info!("draftsync shut down cleanly");
    Ok(())
}

async fn resolve_room(api: &HttpRoomApi, room: &RoomRef) -> anyhow::Result<String> {
    match (&room.room, &room.code) {
        (Some(id), _) => Ok(id.clone()),
        (None, Some(code)) => {
            let lookup = api
                .find_room_by_code(code)
                .await
                .with_context(|| format!("no room found for code {code}"))?;
            Ok(lookup.room_id)
        }
        (None, None) => anyhow::bail!("either --room or --code is required"),
    }
}

/// Follow a room live until the user quits or the transport gives up.
async fn watch_room(
    config: &Config,
    api: &HttpRoomApi,
    room_id: &str,
    user: &str,
    join: bool,
) -> anyhow::Result<()> {
    let initial = if join {
        let (joined, state) = bootstrap::join_and_load(api, room_id, user)
            .await
            .context("failed to join room")?;
        println!("joined at draft position {}", joined.draft_position);
        state
    } else {
        match api.get_room(room_id).await {
            Ok(room) => DraftState::from_room(user, room),
            Err(e) => {
                warn!("Could not prefetch room {room_id}: {e}");
                DraftState::new(user)
            }
        }
    };

    // Channels: transport -> session signals, session -> transport intents,
    // stdin -> session commands.
    let capacity = config.session.channel_capacity;
    let (signal_tx, signal_rx) = mpsc::channel(capacity);
    let (intent_tx, intent_rx) = mpsc::channel(capacity);
    let (cmd_tx, cmd_rx) = mpsc::channel(16);

    let session = DraftSession::new(initial, intent_tx, config.session_options());
    let board = session.subscribe();
    let printer = tokio::spawn(print_updates(session.subscribe(), session.diagnostics()));

    let url = transport::session_url(&config.server.ws_url, room_id, user);
    let policy = config.reconnect_policy();
    let transport_handle = tokio::spawn(async move {
        if let Err(e) = transport::run(url, policy, signal_tx, intent_rx).await {
            error!("Transport error: {:#}", e);
        }
    });
    let mut session_handle = tokio::spawn(session::run(session, signal_rx, cmd_rx));

    println!("{}", input::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let finished = loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
            res = &mut session_handle => break Some(res),
        };
        let Some(line) = line else { break None };

        match input::parse(&line) {
            Input::Pick(player_id) => {
                let (reply, rx) = oneshot::channel();
                let cmd = SessionCommand::Pick {
                    player_id: player_id.clone(),
                    reply,
                };
                if cmd_tx.send(cmd).await.is_err() {
                    break None;
                }
                match rx.await {
                    Ok(Ok(())) => println!("pick requested: {player_id}"),
                    Ok(Err(e)) => println!("! {e}"),
                    Err(_) => break None,
                }
            }
            Input::Board => {
                let projection = board.borrow().clone();
                for line in render::best_available(projection.state.available_players(), 10) {
                    println!("{line}");
                }
            }
            Input::Help => println!("{}", input::HELP),
            Input::Quit => break None,
            Input::Empty => {}
            Input::Unknown(text) => println!("unknown command: {text} ({})", input::HELP),
        }
    };

    let final_state = match finished {
        Some(res) => res.context("session task failed")??,
        None => {
            let _ = cmd_tx.send(SessionCommand::Shutdown).await;
            session_handle.await.context("session task failed")??
        }
    };

    transport_handle.abort();
    printer.abort();

    println!(
        "left {} after {} pick(s); you drafted {} player(s)",
        room_id,
        final_state.picks().len(),
        final_state.my_team().len()
    );
    Ok(())
}

async fn print_updates(
    mut projections: watch::Receiver<Projection>,
    mut diagnostics: broadcast::Receiver<SyncError>,
) {
    let mut view = WatchView::default();
    let current = projections.borrow_and_update().clone();
    for line in view.update(&current) {
        println!("{}", line.trim_end());
    }

    loop {
        tokio::select! {
            changed = projections.changed() => {
                if changed.is_err() {
                    break;
                }
                let projection = projections.borrow_and_update().clone();
                for line in view.update(&projection) {
                    println!("{}", line.trim_end());
                }
            }
            diag = diagnostics.recv() => match diag {
                Ok(err) => println!("! {err}"),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    println!("! {n} diagnostic(s) skipped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

/// Initialize tracing to log to a file (stdout carries the draft view).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("draftsync.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("draftsync=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
