use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::notifier::Notifier;
use super::{assignment, night, trial, victory};
use crate::error::GameError;
use crate::models::config::GameConfig;
use crate::models::event::{Envelope, GameEvent, RevealedRole};
use crate::models::game::{Ballot, DayAction, GameSession, Phase};
use crate::models::role::Capability;
use crate::services::victory::Verdict;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStatus {
    pub phase: Phase,
    pub day_number: u32,
    pub lobby_size: usize,
    pub capacity: usize,
    pub living: Vec<ParticipantView>,
    /// Roles are revealed on death.
    pub dead: Vec<RevealedRole>,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    /// `None` when an operator ended the match.
    pub verdict: Option<Verdict>,
    pub day_number: u32,
    pub roles: Vec<RevealedRole>,
    pub ended_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerStep {
    BeginMatch,
    CloseNight,
    OpenTrial,
    CloseTrial,
    OpenNight,
}

struct Engine {
    session: GameSession,
    rng: StdRng,
    /// Bumped whenever the pending timer is replaced or cancelled; a timer
    /// only acts if the epoch it captured is still current.
    epoch: u64,
    timer: Option<JoinHandle<()>>,
    last_result: Option<MatchResult>,
}

impl Engine {
    fn cancel_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
        self.epoch += 1;
    }

    fn revealed_roles(&self, only_dead: bool) -> Vec<RevealedRole> {
        self.session
            .roster
            .values()
            .filter(|p| !only_dead || !p.is_alive())
            .filter_map(|p| {
                Some(RevealedRole {
                    participant_id: p.id.clone(),
                    name: p.name.clone(),
                    role: p.role_id()?,
                    alive: p.is_alive(),
                })
            })
            .collect()
    }
}

/// Owns the single game session of this process and drives its phases.
#[derive(Clone)]
pub struct GameService {
    inner: Arc<Mutex<Engine>>,
    config: Arc<GameConfig>,
    notifier: Arc<dyn Notifier>,
}

impl GameService {
    pub fn new(config: GameConfig, notifier: Arc<dyn Notifier>) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, notifier, rng)
    }

    pub fn with_rng(config: GameConfig, notifier: Arc<dyn Notifier>, rng: StdRng) -> Self {
        GameService {
            inner: Arc::new(Mutex::new(Engine {
                session: GameSession::new(),
                rng,
                epoch: 0,
                timer: None,
                last_result: None,
            })),
            config: Arc::new(config),
            notifier,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    // ---- lobby ----

    pub async fn add_participant(&self, id: &str, name: &str) -> Result<usize, GameError> {
        let mut engine = self.inner.lock().await;
        let size = engine
            .session
            .add_participant(id, name, self.config.max_players)?;
        info!("{} ({}) joined the lobby: {}/{}", name, id, size, self.config.max_players);

        self.notifier
            .publish(Envelope::public(GameEvent::ParticipantJoined {
                participant_id: id.to_string(),
                name: name.to_string(),
                lobby_size: size,
                capacity: self.config.max_players,
            }));

        if self.config.auto_start && size == self.config.min_players {
            let delay = self.config.auto_start_delay();
            self.schedule(&mut engine, delay, TimerStep::BeginMatch);
            self.notifier
                .publish(Envelope::public(GameEvent::MatchStarting {
                    starts_at: engine.session.deadline.unwrap_or_else(Utc::now),
                }));
        }
        Ok(size)
    }

    pub async fn begin_match(&self) -> Result<(), GameError> {
        let mut engine = self.inner.lock().await;
        self.start(&mut engine)
    }

    // ---- submissions ----

    pub async fn submit_night_action(
        &self,
        actor: &str,
        capability: Capability,
        target: &str,
    ) -> Result<(), GameError> {
        let mut engine = self.inner.lock().await;
        engine
            .session
            .record_night_action(actor, capability, target)
            .map_err(|e| self.rejected(actor, e))?;
        debug!("Night action {:?} recorded for {}", capability, actor);

        if engine.session.night_complete() {
            self.close_night(&mut engine)?;
        }
        Ok(())
    }

    pub async fn skip_night_action(&self, actor: &str) -> Result<(), GameError> {
        let mut engine = self.inner.lock().await;
        engine
            .session
            .skip_night_action(actor)
            .map_err(|e| self.rejected(actor, e))?;
        debug!("{} skipped their night action", actor);

        if engine.session.night_complete() {
            self.close_night(&mut engine)?;
        }
        Ok(())
    }

    pub async fn submit_vote(&self, voter: &str, ballot: Ballot) -> Result<(), GameError> {
        let mut engine = self.inner.lock().await;
        engine
            .session
            .record_vote(voter, ballot)
            .map_err(|e| self.rejected(voter, e))?;
        debug!("Vote recorded for {}", voter);

        if engine.session.trial_complete() {
            self.close_trial(&mut engine)?;
        }
        Ok(())
    }

    pub async fn submit_day_action(&self, actor: &str, action: DayAction) -> Result<(), GameError> {
        let mut engine = self.inner.lock().await;
        engine
            .session
            .check_day_action(actor, &action)
            .map_err(|e| self.rejected(actor, e))?;

        match &action {
            DayAction::SwapVotes { .. } | DayAction::CancelVotes => {
                engine
                    .session
                    .record_day_action(actor, &action)
                    .map_err(|e| self.rejected(actor, e))?;
                debug!("{:?} recorded for {}", action.capability(), actor);
            }
            DayAction::DayKill { target } => {
                let Some(victim) = trial::day_kill(&mut engine.session.roster, actor, target)
                else {
                    return Err(self.rejected(actor, GameError::IllegalTarget(target.clone())));
                };
                info!("{} was struck down during the trial", victim.participant_id);
                let actor_role = engine.session.participant(actor)?.role_id();
                if let (Some(actor_role), Some(victim_role)) = (actor_role, victim.role) {
                    self.notifier.publish(Envelope::public(GameEvent::DayKill {
                        actor_role,
                        victim_id: victim.participant_id.clone(),
                        victim_role,
                    }));
                }
                if self.check_victory(&mut engine) {
                    return Ok(());
                }
                if engine.session.trial_complete() {
                    self.close_trial(&mut engine)?;
                }
            }
            DayAction::Commune { target } => {
                let Some(role) = trial::commune(&mut engine.session.roster, actor, target) else {
                    return Err(self.rejected(actor, GameError::IllegalTarget(target.clone())));
                };
                self.notifier.publish(Envelope::private(
                    actor,
                    GameEvent::CommuneResult {
                        target_id: target.clone(),
                        role,
                    },
                ));
            }
        }
        Ok(())
    }

    /// Ends the match without a winner and returns to an empty lobby. The win
    /// evaluator is not consulted; a forced end never names a winner.
    pub async fn force_end(&self) -> Result<(), GameError> {
        let mut engine = self.inner.lock().await;
        if !engine.session.is_active() {
            return Err(GameError::NoActiveMatch);
        }
        info!("Match ended by operator");
        self.finish(&mut engine, None);
        Ok(())
    }

    /// Runs the current phase's timeout transition now.
    pub async fn advance_phase(&self) -> Result<Phase, GameError> {
        let mut engine = self.inner.lock().await;
        match engine.session.phase {
            Phase::Lobby => self.start(&mut engine)?,
            Phase::Night => self.close_night(&mut engine)?,
            Phase::Dawn => self.open_trial(&mut engine)?,
            Phase::Trial => self.close_trial(&mut engine)?,
            Phase::Banishment => self.open_night(&mut engine)?,
            Phase::Ended => return Err(GameError::NoActiveMatch),
        }
        Ok(engine.session.phase)
    }

    // ---- queries ----

    pub async fn current_phase(&self) -> Phase {
        self.inner.lock().await.session.phase
    }

    pub async fn day_number(&self) -> u32 {
        self.inner.lock().await.session.day_number
    }

    pub async fn living_roster(&self) -> Vec<ParticipantView> {
        let engine = self.inner.lock().await;
        engine
            .session
            .living()
            .map(|p| ParticipantView {
                id: p.id.clone(),
                name: p.name.clone(),
            })
            .collect()
    }

    pub async fn status(&self) -> GameStatus {
        let engine = self.inner.lock().await;
        let session = &engine.session;
        GameStatus {
            phase: session.phase,
            day_number: session.day_number,
            lobby_size: session.roster.len(),
            capacity: self.config.max_players,
            living: session
                .living()
                .map(|p| ParticipantView {
                    id: p.id.clone(),
                    name: p.name.clone(),
                })
                .collect(),
            dead: engine.revealed_roles(true),
            deadline: session.deadline,
        }
    }

    pub async fn last_result(&self) -> Option<MatchResult> {
        self.inner.lock().await.last_result.clone()
    }

    // ---- transitions; all run with the session lock held ----

    fn rejected(&self, participant: &str, err: GameError) -> GameError {
        warn!("Rejected submission from {}: {}", participant, err);
        self.notifier.publish(Envelope::private(
            participant,
            GameEvent::ActionRejected {
                reason: err.to_string(),
            },
        ));
        err
    }

    fn schedule(&self, engine: &mut Engine, delay: Duration, step: TimerStep) {
        engine.cancel_timer();
        let epoch = engine.epoch;
        engine.session.deadline = chrono::Duration::from_std(delay)
            .ok()
            .map(|delay| Utc::now() + delay);

        let service = self.clone();
        engine.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            service.fire(epoch, step).await;
        }));
    }

    async fn fire(&self, epoch: u64, step: TimerStep) {
        let mut engine = self.inner.lock().await;
        if engine.epoch != epoch {
            debug!("Discarding stale {:?} timer", step);
            return;
        }
        // this task is the timer; drop the handle without aborting it
        engine.timer = None;

        let result = match step {
            TimerStep::BeginMatch => self.start(&mut engine),
            TimerStep::CloseNight => self.close_night(&mut engine),
            TimerStep::OpenTrial => self.open_trial(&mut engine),
            TimerStep::CloseTrial => self.close_trial(&mut engine),
            TimerStep::OpenNight => self.open_night(&mut engine),
        };
        match result {
            Err(e) if e.is_recoverable() => {
                warn!("{:?} timer could not advance the match: {}", step, e)
            }
            Err(e) => error!("{:?} timer hit a broken invariant: {}", step, e),
            Ok(()) => {}
        }
    }

    fn announce_phase(&self, engine: &Engine, from: Phase) {
        info!(
            "Phase {} -> {} (day {})",
            from, engine.session.phase, engine.session.day_number
        );
        self.notifier.publish(Envelope::public(GameEvent::PhaseChanged {
            from,
            to: engine.session.phase,
            day_number: engine.session.day_number,
            deadline: engine.session.deadline,
        }));
    }

    fn start(&self, engine: &mut Engine) -> Result<(), GameError> {
        if engine.session.phase != Phase::Lobby {
            return Err(GameError::WrongPhase);
        }
        let count = engine.session.roster.len();
        if count < self.config.min_players {
            return Err(GameError::InsufficientPlayers {
                found: count,
                required: self.config.min_players,
            });
        }

        let dealt = assignment::assign(&mut engine.session.roster, count, &mut engine.rng)
            .map_err(|e| {
                warn!("Role assignment failed: {}", e);
                e
            })?;
        for (id, role_id) in dealt {
            let role = role_id.role();
            self.notifier.publish(Envelope::private(
                &id,
                GameEvent::RoleRevealed {
                    role: role_id,
                    team: role.team,
                    description: role.description.to_string(),
                },
            ));
        }
        info!("Match started with {} participants", count);

        engine.session.day_number = 0;
        self.enter_night(engine);
        Ok(())
    }

    fn enter_night(&self, engine: &mut Engine) {
        let from = engine.session.phase;
        engine.session.open_night();
        self.schedule(engine, self.config.night(), TimerStep::CloseNight);
        self.announce_phase(engine, from);

        if engine.session.night_complete() {
            debug!("Nobody can act tonight");
            if let Err(e) = self.close_night(engine) {
                warn!("Could not close an idle night: {}", e);
            }
        }
    }

    fn close_night(&self, engine: &mut Engine) -> Result<(), GameError> {
        if engine.session.phase != Phase::Night {
            return Err(GameError::IllegalActionPhase);
        }
        engine.cancel_timer();
        engine.session.phase = Phase::Dawn;
        engine.session.deadline = None;

        let actions = std::mem::take(&mut engine.session.night_actions);
        let outcome = night::resolve(&mut engine.session.roster, actions);
        for casualty in &outcome.report.deaths {
            info!("{} died in the night", casualty.participant_id);
        }

        self.announce_phase(engine, Phase::Night);
        self.notifier
            .publish(Envelope::public(GameEvent::NightReport(outcome.report)));
        for (investigator, result) in outcome.investigations {
            self.notifier.publish(Envelope::private(
                &investigator,
                GameEvent::InvestigationResult {
                    target_id: result.target_id,
                    team: result.team,
                },
            ));
        }

        if self.check_victory(engine) {
            return Ok(());
        }
        self.schedule(engine, self.config.dawn(), TimerStep::OpenTrial);
        Ok(())
    }

    fn open_trial(&self, engine: &mut Engine) -> Result<(), GameError> {
        if engine.session.phase != Phase::Dawn {
            return Err(GameError::IllegalActionPhase);
        }
        engine.session.open_trial();
        self.schedule(engine, self.config.trial(), TimerStep::CloseTrial);
        self.announce_phase(engine, Phase::Dawn);
        Ok(())
    }

    fn close_trial(&self, engine: &mut Engine) -> Result<(), GameError> {
        if engine.session.phase != Phase::Trial {
            return Err(GameError::IllegalActionPhase);
        }
        engine.cancel_timer();
        engine.session.phase = Phase::Banishment;
        engine.session.deadline = None;

        let votes = std::mem::take(&mut engine.session.votes);
        let day_actions = std::mem::take(&mut engine.session.day_actions);
        let report = trial::resolve(
            &mut engine.session.roster,
            votes,
            day_actions,
            &mut engine.rng,
        );
        match &report.exiled {
            Some(exiled) => info!("{} was exiled", exiled.participant_id),
            None if report.cancelled => info!("The trial was annulled"),
            None => info!("Nobody was exiled"),
        }

        self.announce_phase(engine, Phase::Trial);
        self.notifier
            .publish(Envelope::public(GameEvent::TrialReport(report)));

        if self.check_victory(engine) {
            return Ok(());
        }
        self.schedule(engine, self.config.banishment(), TimerStep::OpenNight);
        Ok(())
    }

    fn open_night(&self, engine: &mut Engine) -> Result<(), GameError> {
        if engine.session.phase != Phase::Banishment {
            return Err(GameError::IllegalActionPhase);
        }
        engine.session.day_number += 1;
        self.enter_night(engine);
        Ok(())
    }

    /// Returns true when the match is over.
    fn check_victory(&self, engine: &mut Engine) -> bool {
        match victory::evaluate(&engine.session.roster) {
            Some(verdict) => {
                info!("Match over: {:?}", verdict.winner);
                self.finish(engine, Some(verdict));
                true
            }
            None => false,
        }
    }

    fn finish(&self, engine: &mut Engine, verdict: Option<Verdict>) {
        engine.cancel_timer();
        let from = engine.session.phase;
        engine.session.phase = Phase::Ended;
        engine.session.deadline = None;
        self.announce_phase(engine, from);

        let roles = engine.revealed_roles(false);
        self.notifier.publish(Envelope::public(GameEvent::MatchEnded {
            verdict: verdict.clone(),
            roles: roles.clone(),
        }));
        engine.last_result = Some(MatchResult {
            verdict,
            day_number: engine.session.day_number,
            roles,
            ended_at: Utc::now(),
        });
        engine.session = GameSession::new();
    }
}
