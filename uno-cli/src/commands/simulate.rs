//! Simulate command - a table of bots over the in-memory transport.
//!
//! The first seat is the host, running the authority in-process. Every
//! other seat is a [`Follower`] on its own in-memory link. Bots only move on
//! their own turn, so at most one intent is ever in flight during play.
//! When the game ends or the turn budget runs out, the last snapshot is
//! published and every participant must reach exactly that snapshot.

use anyhow::{bail, Context, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use uno_host::{Config, Host};
use uno_peer::{Follower, FollowerEvent, MemoryNetwork, MemoryTransport};
use uno_types::{ChatMessage, GameState, GameStatus, PlayerId};

use crate::bot::{choose_move, Move};

const TABLE: &str = "simulated-table";
const HOST_NAME: &str = "Host";

/// How long joins and convergence may take.
const SETTLE: Duration = Duration::from_secs(10);

/// How long a whole game may take before it counts as stalled.
const GAME_LIMIT: Duration = Duration::from_secs(120);

/// Parameters for one simulated game.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Seats at the table, host included.
    pub players: usize,
    /// Seed for the host's shuffles.
    pub seed: Option<u64>,
    /// Moves allowed before play stops.
    pub max_turns: usize,
}

/// How a simulated game finished.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Winner's name, if the game ended before the turn budget ran out.
    pub winner: Option<String>,
    /// Moves made.
    pub turns: usize,
    /// The snapshot every participant converged to.
    pub final_state: GameState,
    /// Followers verified against the host.
    pub followers: usize,
    /// The chat log every participant converged to.
    pub chat: Vec<ChatMessage>,
}

/// Shared count of moves made by every bot at the table.
#[derive(Debug)]
struct TurnBudget {
    used: AtomicUsize,
    max: usize,
}

impl TurnBudget {
    fn new(max: usize) -> Self {
        Self {
            used: AtomicUsize::new(0),
            max,
        }
    }

    /// Claim one move. False once the budget is spent.
    fn take(&self) -> bool {
        self.used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max).then_some(n + 1)
            })
            .is_ok()
    }

    fn used(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }
}

/// Holds the final snapshot once some bot decides play is over.
type Finish = Arc<watch::Sender<Option<GameState>>>;

/// Publish `state` as final unless something already was.
fn settle(finish: &Finish, state: &GameState) {
    finish.send_if_modified(|slot| {
        if slot.is_some() {
            return false;
        }
        *slot = Some(state.clone());
        true
    });
}

/// Run one game and check that every follower ends on the host's snapshot.
pub async fn run(config: Config, options: Options) -> Result<Outcome> {
    let seats = config.game.min_players..=config.game.max_players;
    if !seats.contains(&options.players) {
        bail!(
            "--players must be between {} and {}",
            seats.start(),
            seats.end()
        );
    }

    let host_id = PlayerId::new();
    let host = match options.seed {
        Some(seed) => Host::start_seeded(config.clone(), host_id, HOST_NAME, seed),
        None => Host::start(config.clone(), host_id, HOST_NAME),
    }
    .context("Failed to start host")?;

    let network = MemoryNetwork::new(config.server.link_buffer);
    let listener = network.listen(TABLE).context("Failed to open table")?;
    let server = host.clone();
    tokio::spawn(async move {
        if let Err(e) = server.serve(listener).await {
            tracing::warn!(error = %e, "Serve loop failed");
        }
    });

    let followers = seat_bots(&host, &network, options.players).await?;

    let budget = Arc::new(TurnBudget::new(options.max_turns));
    let finish: Finish = Arc::new(watch::channel(None).0);
    let mut settled = finish.subscribe();

    let bots: Vec<_> = followers
        .into_iter()
        .map(|follower| {
            tokio::spawn(follower_bot(
                follower,
                Arc::clone(&budget),
                Arc::clone(&finish),
            ))
        })
        .collect();
    let host_bot = tokio::spawn(host_bot(
        host.clone(),
        Arc::clone(&budget),
        Arc::clone(&finish),
    ));

    host.start_game().await.context("Failed to start game")?;
    tracing::info!(players = options.players, "Game underway");

    let final_state = timeout(GAME_LIMIT, settled.wait_for(Option::is_some))
        .await
        .context("Table stalled")??
        .clone()
        .context("No final snapshot")?;

    let host_view = timeout(SETTLE, host_bot)
        .await
        .context("Host view did not settle")?
        .context("Host bot panicked")??;
    if host_view != final_state {
        bail!("Host view diverged from the final snapshot");
    }

    let chat = host.chat();
    let mut verified = 0;
    for bot in bots {
        let follower = timeout(SETTLE, bot)
            .await
            .context("Follower did not settle")?
            .context("Follower bot panicked")??;
        if follower.state() != Some(&final_state) {
            bail!("Follower {} diverged from the host", follower.id());
        }
        if follower.chat() != chat.as_slice() {
            bail!("Follower {} has a different chat log", follower.id());
        }
        verified += 1;
    }

    host.shutdown().await.context("Failed to shut down host")?;

    Ok(Outcome {
        winner: final_state.winner.clone(),
        turns: budget.used(),
        final_state,
        followers: verified,
        chat,
    })
}

/// Connect `players - 1` followers, let everyone greet, and wait until the
/// host has seen all of it.
async fn seat_bots(
    host: &Host,
    network: &MemoryNetwork,
    players: usize,
) -> Result<Vec<Follower<MemoryTransport>>> {
    let mut followers = Vec::with_capacity(players.saturating_sub(1));
    for seat in 1..players {
        let id = PlayerId::new();
        let name = format!("Bot {seat}");
        let mut follower = Follower::new(id, TABLE, network.transport(id));
        follower
            .connect(&name)
            .await
            .with_context(|| format!("{name} failed to connect"))?;
        follower.send_chat(&format!("{name} ready")).await?;
        followers.push(follower);
    }
    host.send_chat("Welcome to the table").await?;

    let mut state_view = host.watch_state();
    timeout(SETTLE, state_view.wait_for(|s| s.players.len() == players))
        .await
        .context("Players did not all join")??;
    let mut chat_view = host.watch_chat();
    timeout(SETTLE, chat_view.wait_for(|log| log.len() == players))
        .await
        .context("Greetings did not all arrive")??;

    Ok(followers)
}

async fn follower_bot(
    mut follower: Follower<MemoryTransport>,
    budget: Arc<TurnBudget>,
    finish: Finish,
) -> Result<Follower<MemoryTransport>> {
    let mut settled = finish.subscribe();
    // Only a new snapshot can put a move in front of this bot
    let mut fresh = true;
    loop {
        let done = settled
            .borrow_and_update()
            .as_ref()
            .map(|last| follower.state() == Some(last));
        match done {
            Some(true) => return Ok(follower),
            Some(false) => {}
            None if !fresh => {}
            None => {
                if let Some(state) = follower.state().cloned() {
                    play_turn(&state, follower.id(), &budget, &finish, |mv| {
                        submit_follower(&follower, mv)
                    })
                    .await?;
                }
            }
        }

        // Re-check once the turn above may have settled the table
        if settled.has_changed()? {
            continue;
        }

        let event = tokio::select! {
            event = follower.poll() => Some(event?),
            changed = settled.changed() => {
                changed?;
                None
            }
        };
        match event {
            Some(FollowerEvent::Disconnected) => {
                bail!("Follower {} lost its link", follower.id())
            }
            Some(FollowerEvent::Error(ref e)) => {
                tracing::warn!(peer = %follower.id(), error = %e, "Follower error");
            }
            Some(FollowerEvent::StateUpdated | FollowerEvent::ChatUpdated) | None => {}
        }
        fresh = matches!(event, Some(FollowerEvent::StateUpdated));
    }
}

async fn host_bot(host: Host, budget: Arc<TurnBudget>, finish: Finish) -> Result<GameState> {
    let mut view = host.watch_state();
    let mut settled = finish.subscribe();
    loop {
        let state = view.borrow_and_update().clone();
        let done = settled
            .borrow_and_update()
            .as_ref()
            .map(|last| *last == state);
        match done {
            Some(true) => return Ok(state),
            Some(false) => {}
            None => {
                play_turn(&state, host.id(), &budget, &finish, |mv| {
                    submit_host(&host, mv)
                })
                .await?;
            }
        }

        if settled.has_changed()? {
            continue;
        }

        tokio::select! {
            changed = view.changed() => changed?,
            changed = settled.changed() => changed?,
        }
    }
}

/// Act on `state` if it is `me`'s turn: move, or settle the table when the
/// game is over or the budget is spent.
async fn play_turn<F, Fut>(
    state: &GameState,
    me: PlayerId,
    budget: &TurnBudget,
    finish: &Finish,
    submit: F,
) -> Result<()>
where
    F: FnOnce(Move) -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    if state.status == GameStatus::Ended {
        settle(finish, state);
        return Ok(());
    }
    let Some(mv) = choose_move(state, me) else {
        return Ok(());
    };
    if !budget.take() {
        tracing::info!(turns = budget.used(), "Turn budget spent");
        settle(finish, state);
        return Ok(());
    }
    submit(mv).await
}

async fn submit_follower(follower: &Follower<MemoryTransport>, mv: Move) -> Result<()> {
    match mv {
        Move::Play {
            card_id,
            chosen_color,
        } => follower.play_card(card_id, chosen_color).await?,
        Move::Draw => follower.draw_card().await?,
    }
    Ok(())
}

async fn submit_host(host: &Host, mv: Move) -> Result<()> {
    match mv {
        Move::Play {
            card_id,
            chosen_color,
        } => host.play_card(card_id, chosen_color).await?,
        Move::Draw => host.draw_card().await?,
    }
    Ok(())
}
