use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::player::Participant;
use super::role::{Capability, Team};
use crate::error::GameError;

/// Participants keyed by id. Ordered so that seeded runs are reproducible.
pub type Roster = BTreeMap<String, Participant>;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Phase {
    Lobby,
    Night,
    Dawn,
    Trial,
    Banishment,
    Ended,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum Ballot {
    Target(String),
    Abstain,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DayAction {
    SwapVotes { first: String, second: String },
    DayKill { target: String },
    CancelVotes,
    Commune { target: String },
}

impl DayAction {
    pub fn capability(&self) -> Capability {
        match self {
            DayAction::SwapVotes { .. } => Capability::SwapVotes,
            DayAction::DayKill { .. } => Capability::DayKill,
            DayAction::CancelVotes => Capability::CancelVotes,
            DayAction::Commune { .. } => Capability::Commune,
        }
    }
}

/// Night submissions, one per actor. A later submission replaces the
/// earlier one, whatever capability either was recorded under.
#[derive(Clone, Debug, Default, Serialize)]
pub struct NightActions {
    by_capability: BTreeMap<Capability, BTreeMap<String, String>>,
    skipped: BTreeSet<String>,
}

impl NightActions {
    pub fn record(&mut self, capability: Capability, actor: &str, target: &str) {
        self.forget(actor);
        self.by_capability
            .entry(capability)
            .or_default()
            .insert(actor.to_string(), target.to_string());
    }

    pub fn skip(&mut self, actor: &str) {
        self.forget(actor);
        self.skipped.insert(actor.to_string());
    }

    fn forget(&mut self, actor: &str) {
        self.skipped.remove(actor);
        for actions in self.by_capability.values_mut() {
            actions.remove(actor);
        }
    }

    /// `(actor, target)` pairs recorded under `capability`, ordered by actor.
    pub fn targets(&self, capability: Capability) -> impl Iterator<Item = (&str, &str)> {
        self.by_capability
            .get(&capability)
            .into_iter()
            .flat_map(|actions| actions.iter())
            .map(|(actor, target)| (actor.as_str(), target.as_str()))
    }

    pub fn target_of(&self, actor: &str) -> Option<&str> {
        self.by_capability
            .values()
            .find_map(|actions| actions.get(actor))
            .map(String::as_str)
    }

    pub fn has_acted(&self, actor: &str) -> bool {
        self.skipped.contains(actor) || self.target_of(actor).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.skipped.is_empty() && self.by_capability.values().all(BTreeMap::is_empty)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SwapRequest {
    pub actor: String,
    pub first: String,
    pub second: String,
}

/// Trial-time abilities that wait for the tally.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PendingDayActions {
    pub swap: Option<SwapRequest>,
    pub cancel: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameSession {
    pub phase: Phase,
    pub day_number: u32,
    pub roster: Roster,
    pub night_actions: NightActions,
    pub votes: BTreeMap<String, Ballot>,
    pub day_actions: PendingDayActions,
    pub deadline: Option<DateTime<Utc>>,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

impl GameSession {
    pub fn new() -> Self {
        GameSession {
            phase: Phase::Lobby,
            day_number: 0,
            roster: Roster::new(),
            night_actions: NightActions::default(),
            votes: BTreeMap::new(),
            day_actions: PendingDayActions::default(),
            deadline: None,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.phase, Phase::Lobby | Phase::Ended)
    }

    /// Returns the roster size after the join.
    pub fn add_participant(
        &mut self,
        id: &str,
        name: &str,
        max_players: usize,
    ) -> Result<usize, GameError> {
        if self.phase != Phase::Lobby {
            return Err(GameError::WrongPhase);
        }
        if self.roster.contains_key(id) {
            return Err(GameError::AlreadyJoined(id.to_string()));
        }
        if self.roster.len() >= max_players {
            return Err(GameError::GameFull(max_players));
        }
        self.roster.insert(
            id.to_string(),
            Participant::new(id.to_string(), name.to_string()),
        );
        Ok(self.roster.len())
    }

    pub fn participant(&self, id: &str) -> Result<&Participant, GameError> {
        self.roster
            .get(id)
            .ok_or_else(|| GameError::UnknownActor(id.to_string()))
    }

    pub fn living(&self) -> impl Iterator<Item = &Participant> {
        self.roster.values().filter(|p| p.is_alive())
    }

    pub fn living_count(&self) -> usize {
        self.living().count()
    }

    pub fn living_team_count(&self, team: Team) -> usize {
        self.living().filter(|p| p.team() == Some(team)).count()
    }

    fn living_actor(&self, id: &str) -> Result<&Participant, GameError> {
        let actor = self.participant(id)?;
        if !actor.is_alive() {
            return Err(GameError::DeadActor(id.to_string()));
        }
        Ok(actor)
    }

    fn living_target(&self, id: &str) -> Result<&Participant, GameError> {
        let target = self
            .roster
            .get(id)
            .ok_or_else(|| GameError::UnknownTarget(id.to_string()))?;
        if !target.is_alive() {
            return Err(GameError::DeadTarget(id.to_string()));
        }
        Ok(target)
    }

    fn holds(&self, actor: &Participant, capability: Capability) -> Result<(), GameError> {
        let role = actor
            .role()
            .filter(|role| role.capability == capability && capability != Capability::None)
            .ok_or_else(|| GameError::CapabilityNotHeld(actor.id.clone()))?;
        if role.single_use && actor.ability_used() {
            return Err(GameError::AbilityAlreadyUsed(actor.id.clone()));
        }
        Ok(())
    }

    pub fn record_night_action(
        &mut self,
        actor: &str,
        capability: Capability,
        target: &str,
    ) -> Result<(), GameError> {
        if self.phase != Phase::Night || !capability.is_night() {
            return Err(GameError::IllegalActionPhase);
        }
        let participant = self.living_actor(actor)?;
        self.holds(participant, capability)?;

        match capability {
            Capability::Kill | Capability::Protect => {
                self.living_target(target)?;
            }
            _ => {
                if !self.roster.contains_key(target) {
                    return Err(GameError::UnknownTarget(target.to_string()));
                }
            }
        }
        if actor == target && capability != Capability::Protect {
            return Err(GameError::IllegalTarget(target.to_string()));
        }

        self.night_actions.record(capability, actor, target);
        Ok(())
    }

    pub fn skip_night_action(&mut self, actor: &str) -> Result<(), GameError> {
        if self.phase != Phase::Night {
            return Err(GameError::IllegalActionPhase);
        }
        let participant = self.living_actor(actor)?;
        let capability = participant
            .role()
            .map(|role| role.capability)
            .unwrap_or(Capability::None);
        if !capability.is_night() {
            return Err(GameError::CapabilityNotHeld(actor.to_string()));
        }
        self.night_actions.skip(actor);
        Ok(())
    }

    pub fn record_vote(&mut self, voter: &str, ballot: Ballot) -> Result<(), GameError> {
        if self.phase != Phase::Trial {
            return Err(GameError::IllegalActionPhase);
        }
        self.living_actor(voter)?;
        if let Ballot::Target(target) = &ballot {
            self.living_target(target)?;
            if target == voter {
                return Err(GameError::IllegalTarget(target.clone()));
            }
        }
        self.votes.insert(voter.to_string(), ballot);
        Ok(())
    }

    /// Checks a trial ability without applying it.
    pub fn check_day_action(&self, actor: &str, action: &DayAction) -> Result<(), GameError> {
        if self.phase != Phase::Trial {
            return Err(GameError::IllegalActionPhase);
        }
        let participant = self.living_actor(actor)?;
        self.holds(participant, action.capability())?;

        match action {
            DayAction::SwapVotes { first, second } => {
                self.living_target(first)?;
                self.living_target(second)?;
                if first == second {
                    return Err(GameError::IllegalTarget(second.clone()));
                }
            }
            DayAction::DayKill { target } => {
                self.living_target(target)?;
                if target == actor {
                    return Err(GameError::IllegalTarget(target.clone()));
                }
            }
            DayAction::CancelVotes => {}
            DayAction::Commune { target } => {
                let dead = self
                    .roster
                    .get(target)
                    .ok_or_else(|| GameError::UnknownTarget(target.clone()))?;
                if dead.is_alive() {
                    return Err(GameError::IllegalTarget(target.clone()));
                }
            }
        }
        Ok(())
    }

    /// Records a swap or cancellation for the tally. Immediate abilities are
    /// resolved by the trial resolver instead.
    pub fn record_day_action(&mut self, actor: &str, action: &DayAction) -> Result<(), GameError> {
        self.check_day_action(actor, action)?;
        match action {
            DayAction::SwapVotes { first, second } => {
                self.day_actions.swap = Some(SwapRequest {
                    actor: actor.to_string(),
                    first: first.clone(),
                    second: second.clone(),
                });
            }
            DayAction::CancelVotes => {
                self.day_actions.cancel = Some(actor.to_string());
            }
            DayAction::DayKill { .. } | DayAction::Commune { .. } => {
                return Err(GameError::IllegalActionPhase);
            }
        }
        Ok(())
    }

    /// Living participants whose role acts at night.
    pub fn night_actors(&self) -> impl Iterator<Item = &Participant> {
        self.living()
            .filter(|p| p.role().is_some_and(|role| role.capability.is_night()))
    }

    pub fn night_complete(&self) -> bool {
        self.night_actors()
            .all(|p| self.night_actions.has_acted(&p.id))
    }

    pub fn trial_complete(&self) -> bool {
        self.living().all(|p| self.votes.contains_key(&p.id))
    }

    pub(crate) fn open_night(&mut self) {
        self.phase = Phase::Night;
        self.night_actions = NightActions::default();
        for participant in self.roster.values_mut() {
            participant.protected_this_night = false;
        }
    }

    pub(crate) fn open_trial(&mut self) {
        self.phase = Phase::Trial;
        self.votes.clear();
        self.day_actions = PendingDayActions::default();
    }
}
