use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::game::Phase;
use super::role::{RoleId, Team};
use crate::services::night::NightReport;
use crate::services::trial::TrialReport;
use crate::services::victory::Verdict;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "participant_id", rename_all = "snake_case")]
pub enum Audience {
    Everyone,
    Participant(String),
}

impl Audience {
    pub fn includes(&self, participant_id: &str) -> bool {
        match self {
            Audience::Everyone => true,
            Audience::Participant(id) => id == participant_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealedRole {
    pub participant_id: String,
    pub name: String,
    pub role: RoleId,
    pub alive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GameEvent {
    ParticipantJoined {
        participant_id: String,
        name: String,
        lobby_size: usize,
        capacity: usize,
    },
    MatchStarting {
        starts_at: DateTime<Utc>,
    },
    RoleRevealed {
        role: RoleId,
        team: Team,
        description: String,
    },
    PhaseChanged {
        from: Phase,
        to: Phase,
        day_number: u32,
        deadline: Option<DateTime<Utc>>,
    },
    NightReport(NightReport),
    InvestigationResult {
        target_id: String,
        team: Team,
    },
    CommuneResult {
        target_id: String,
        role: RoleId,
    },
    DayKill {
        actor_role: RoleId,
        victim_id: String,
        victim_role: RoleId,
    },
    TrialReport(TrialReport),
    MatchEnded {
        verdict: Option<Verdict>,
        roles: Vec<RevealedRole>,
    },
    ActionRejected {
        reason: String,
    },
}

/// One notification with its routing information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub audience: Audience,
    pub event: GameEvent,
}

impl Envelope {
    pub fn new(audience: Audience, event: GameEvent) -> Self {
        Envelope {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            audience,
            event,
        }
    }

    pub fn public(event: GameEvent) -> Self {
        Self::new(Audience::Everyone, event)
    }

    pub fn private(participant_id: &str, event: GameEvent) -> Self {
        Self::new(Audience::Participant(participant_id.to_string()), event)
    }
}
