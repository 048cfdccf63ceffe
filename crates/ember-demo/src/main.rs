//! Ember demo: one relaying server and two owning clients in a single process,
//! talking over loopback TCP.
//!
//! Alice consumes life crystals, walks into a grove, enters the arena fight
//! and takes lethal hits until her hero lives run out. Bob toggles party
//! mode and stands by a void monolith. Each side ends up with a mirror of
//! the other, and both players are saved through the background queue.

mod actors;

use std::time::Duration;

use clap::Parser;
use ember_combat::{Adversary, CombatPipeline, DamageContext, HitOutcome, effects};
use ember_config::{CliArgs, CombatConfig, Config, default_config_dir};
use ember_multiplayer::{Autosave, ClientSession, SaveQueue, ServerSession, load_or_default};
use ember_net::{
    ConnectionConfig, ConnectionHandle, NetEvent, connect, drain_events, event_channel, serve,
};
use ember_state::{ExtensionState, ZoneSurvey, zones::update_zones};
use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};

use actors::{ArenaBoss, DemoPlayer};

/// Ticks the scripted session runs for.
const DEMO_TICKS: u64 = 40;

/// Ticks at which Alice takes a lethal hit.
const LETHAL_HITS: [u64; 4] = [16, 18, 20, 22];

/// Raw damage of each scripted hit.
const LETHAL_DAMAGE: i32 = 500;

/// Seed for the arena debuff rolls, so every run plays out the same.
const DEMO_SEED: u64 = 0xE3BE;

// ---------------------------------------------------------------------------
// Peers
// ---------------------------------------------------------------------------

/// One owning client: its session, its server link and its body in the base
/// simulation.
struct Peer {
    name: &'static str,
    session: ClientSession,
    link: ConnectionHandle,
    events: mpsc::Receiver<NetEvent>,
    body: DemoPlayer,
    autosave: Autosave,
}

impl Peer {
    /// Applies inbound sync, runs `gameplay` between checkpoint and diff, and
    /// sends everything that changed.
    fn tick(
        &mut self,
        saves: &SaveQueue,
        gameplay: impl FnOnce(&mut ExtensionState, &mut DemoPlayer),
    ) {
        let mut outbound = self
            .session
            .process_events(drain_events(&mut self.events));

        self.session.begin_tick();
        self.body.begin_tick();
        gameplay(self.session.state_mut(), &mut self.body);
        outbound.extend(self.session.end_tick());

        for message in outbound {
            if let Err(e) = self.link.send(message) {
                tracing::warn!(peer = self.name, error = %e, "sync not sent");
            }
        }
        self.autosave.tick(saves, self.name, self.session.state());
    }
}

// ---------------------------------------------------------------------------
// Scripts
// ---------------------------------------------------------------------------

/// The per-tick effect passes, in the order the owning process runs them.
fn run_effect_passes(
    state: &mut ExtensionState,
    body: &mut DemoPlayer,
    boss: Option<&ArenaBoss>,
    config: &CombatConfig,
    rng: &mut ChaCha8Rng,
) {
    effects::reset_effects(state, body);
    if body.dead {
        effects::update_dead(state);
    }
    effects::bad_life_regen(state, body);
    effects::pre_update_buffs(state, body, boss.map(|b| b as &dyn Adversary), config, rng);
    effects::post_update_buffs(state, body);
    effects::update_equips(state, body);
    effects::post_update_equips(state, body, config);
    effects::post_update_misc(state);
}

fn alice_script(
    tick: u64,
    state: &mut ExtensionState,
    body: &mut DemoPlayer,
    boss: &mut ArenaBoss,
    pipeline: &CombatPipeline,
    config: &CombatConfig,
    rng: &mut ChaCha8Rng,
) {
    match tick {
        4 | 5 => {
            if state.consume_life_crystal() {
                tracing::info!(crystals = state.life_crystals, "life crystal consumed");
            }
        }
        8 => update_zones(
            state,
            &ZoneSurvey {
                grove_tiles: 64,
                ..ZoneSurvey::default()
            },
        ),
        12 => {
            tracing::info!("arena fight begins");
            state.hero_lives = 3;
            body.walk(Vec2::new(-5000.0, 0.0));
        }
        _ => {}
    }

    run_effect_passes(state, body, (!body.dead).then_some(&*boss), config, rng);

    if LETHAL_HITS.contains(&tick) && !body.dead {
        let mut ctx = DamageContext::new(LETHAL_DAMAGE, 1);
        match pipeline.resolve_hit(state, body, Some(&mut *boss), &mut ctx, config) {
            Ok(HitOutcome::Revived { damage }) => {
                tracing::info!(damage, lives = state.hero_lives, "revived")
            }
            Ok(outcome) => tracing::info!(?outcome, weights = ?boss.weights(), "hit resolved"),
            Err(e) => tracing::warn!(error = %e, "hit rejected"),
        }
    }
}

fn bob_script(
    tick: u64,
    state: &mut ExtensionState,
    body: &mut DemoPlayer,
    config: &CombatConfig,
    rng: &mut ChaCha8Rng,
) {
    match tick {
        6 => state.party_mode = true,
        10 => update_zones(
            state,
            &ZoneSurvey {
                near_void_monolith: true,
                ..ZoneSurvey::default()
            },
        ),
        _ => {}
    }
    run_effect_passes(state, body, None, config, rng);
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

async fn join(
    name: &'static str,
    addr: std::net::SocketAddr,
    config: &Config,
    shutdown: watch::Receiver<bool>,
    defense: i32,
) -> std::io::Result<Peer> {
    let (tx, events) = event_channel(config.network.inbound_capacity);
    let link = connect(addr, tx, shutdown, &ConnectionConfig::default()).await?;
    let state = load_or_default(&config.persistence.save_dir, name);
    Ok(Peer {
        name,
        session: ClientSession::new(state),
        link,
        events,
        body: DemoPlayer::new(name, defense),
        autosave: Autosave::new(config.persistence.autosave_interval_ticks),
    })
}

async fn run(config: Config) -> std::io::Result<()> {
    let network = &config.network;
    let listener = TcpListener::bind((network.server_address.as_str(), network.server_port)).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "server listening");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (server_tx, mut server_events) = event_channel(network.inbound_capacity);
    let acceptor = tokio::spawn(serve(
        listener,
        server_tx,
        shutdown_rx.clone(),
        ConnectionConfig::default(),
    ));
    let mut server = ServerSession::new(network.max_players);

    let (saves, writer) = SaveQueue::spawn(
        config.persistence.save_dir.clone(),
        config.persistence.queue_capacity,
    );
    let mut alice = join("Alice", addr, &config, shutdown_rx.clone(), 10).await?;
    let mut bob = join("Bob", addr, &config, shutdown_rx.clone(), 4).await?;

    let pipeline = CombatPipeline::default();
    let mut boss = ArenaBoss::new(Vec2::ZERO);
    let combat = &config.combat;
    let mut rng = ChaCha8Rng::seed_from_u64(DEMO_SEED);

    let period = Duration::from_secs_f64(1.0 / f64::from(network.tick_rate.max(1)));
    let mut interval = tokio::time::interval(period);
    for tick in 0..DEMO_TICKS {
        interval.tick().await;
        server.process_events(drain_events(&mut server_events));
        alice.tick(&saves, |state, body| {
            alice_script(tick, state, body, &mut boss, &pipeline, combat, &mut rng)
        });
        bob.tick(&saves, |state, body| {
            bob_script(tick, state, body, combat, &mut rng)
        });
    }

    report(&server, &alice, &bob);

    for peer in [&alice, &bob] {
        if let Err(e) = saves.enqueue(peer.name, peer.session.state()) {
            tracing::warn!(peer = peer.name, error = %e, "final save not queued");
        }
    }
    drop(saves);
    match writer.await {
        Ok(written) => tracing::info!(written, "saves flushed"),
        Err(e) => tracing::warn!(error = %e, "save writer failed"),
    }
    let reloaded = load_or_default(&config.persistence.save_dir, alice.name);
    tracing::info!(persisted = ?reloaded.persisted(), "Alice reloaded");

    let _ = shutdown_tx.send(true);
    match acceptor.await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, "accept loop aborted");
            Ok(())
        }
    }
}

/// Logs what every process believes about every player.
fn report(server: &ServerSession, alice: &Peer, bob: &Peer) {
    for peer in [alice, bob] {
        tracing::info!(
            peer = peer.name,
            player = ?peer.session.player(),
            owned = ?peer.session.state().replicated(),
            "owned state"
        );
        for player in peer.session.mirrors().players() {
            if let Some(mirror) = peer.session.mirrors().get(player) {
                tracing::info!(peer = peer.name, %player, fields = ?mirror.fields(), "mirror");
            }
        }
    }
    for player in server.mirrors().players() {
        if let Some(mirror) = server.mirrors().get(player) {
            tracing::info!(%player, fields = ?mirror.fields(), "server mirror");
        }
    }
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    ember_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "demo failed");
        std::process::exit(1);
    }
}
