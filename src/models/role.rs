use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::GameError;

pub const MIN_PLAYERS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Good,
    Evil,
    Neutral,
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Good => write!(f, "Good"),
            Team::Evil => write!(f, "Evil"),
            Team::Neutral => write!(f, "Neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    None,
    Kill,
    Protect,
    Investigate,
    SwapVotes,
    DayKill,
    CancelVotes,
    Commune,
}

impl Capability {
    /// Capabilities resolved by the Night Resolver.
    pub fn is_night(self) -> bool {
        matches!(
            self,
            Capability::Kill | Capability::Protect | Capability::Investigate
        )
    }

    /// Capabilities usable only while a trial is open.
    pub fn is_day(self) -> bool {
        matches!(
            self,
            Capability::SwapVotes
                | Capability::DayKill
                | Capability::CancelVotes
                | Capability::Commune
        )
    }
}

/// A neutral role's own victory, checked only when the match ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivateGoal {
    SurviveToFinal(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleId {
    Bloodseeker,
    Oracle,
    Guardian,
    Citizen,
    Trickster,
    Soulhunter,
    Magistrate,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Role {
    pub id: RoleId,
    pub name: &'static str,
    pub description: &'static str,
    pub team: Team,
    pub capability: Capability,
    pub single_use: bool,
    pub goal: Option<PrivateGoal>,
}

static CATALOG: [Role; 8] = [
    Role {
        id: RoleId::Bloodseeker,
        name: "Bloodseeker",
        description: "Kill one player each night",
        team: Team::Evil,
        capability: Capability::Kill,
        single_use: false,
        goal: None,
    },
    Role {
        id: RoleId::Oracle,
        name: "Oracle",
        description: "Investigate one player's alignment each night",
        team: Team::Good,
        capability: Capability::Investigate,
        single_use: false,
        goal: None,
    },
    Role {
        id: RoleId::Guardian,
        name: "Guardian",
        description: "Protect one player from night kills each night",
        team: Team::Good,
        capability: Capability::Protect,
        single_use: false,
        goal: None,
    },
    Role {
        id: RoleId::Citizen,
        name: "Citizen",
        description: "Vote during trials to find evil",
        team: Team::Good,
        capability: Capability::None,
        single_use: false,
        goal: None,
    },
    Role {
        id: RoleId::Trickster,
        name: "Trickster",
        description: "Swap two players' votes once, survive to the final three",
        team: Team::Neutral,
        capability: Capability::SwapVotes,
        single_use: true,
        goal: Some(PrivateGoal::SurviveToFinal(3)),
    },
    Role {
        id: RoleId::Soulhunter,
        name: "Soulhunter",
        description: "One-shot kill during a trial",
        team: Team::Evil,
        capability: Capability::DayKill,
        single_use: true,
        goal: None,
    },
    Role {
        id: RoleId::Magistrate,
        name: "Magistrate",
        description: "Annul one trial's votes",
        team: Team::Good,
        capability: Capability::CancelVotes,
        single_use: true,
        goal: None,
    },
    Role {
        id: RoleId::Medium,
        name: "Medium",
        description: "Commune once with the dead to learn their role",
        team: Team::Good,
        capability: Capability::Commune,
        single_use: true,
        goal: None,
    },
];

impl RoleId {
    pub fn as_str(self) -> &'static str {
        match self {
            RoleId::Bloodseeker => "bloodseeker",
            RoleId::Oracle => "oracle",
            RoleId::Guardian => "guardian",
            RoleId::Citizen => "citizen",
            RoleId::Trickster => "trickster",
            RoleId::Soulhunter => "soulhunter",
            RoleId::Magistrate => "magistrate",
            RoleId::Medium => "medium",
        }
    }

    pub fn role(self) -> &'static Role {
        // CATALOG is ordered by discriminant.
        &CATALOG[self as usize]
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.role().name)
    }
}

impl FromStr for RoleId {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CATALOG
            .iter()
            .map(|role| role.id)
            .find(|id| id.as_str() == s)
            .ok_or_else(|| GameError::UnknownRole(s.to_string()))
    }
}

pub fn role_for(id: &str) -> Result<&'static Role, GameError> {
    Ok(id.parse::<RoleId>()?.role())
}

pub fn catalog() -> &'static [Role] {
    &CATALOG
}

/// Roles added by each band, starting at four participants. Each band only
/// adds to the ones below it.
const BANDS: [&[RoleId]; 9] = [
    &[
        RoleId::Bloodseeker,
        RoleId::Oracle,
        RoleId::Guardian,
        RoleId::Citizen,
    ],
    &[RoleId::Citizen],
    &[RoleId::Trickster],
    &[RoleId::Bloodseeker],
    &[RoleId::Soulhunter],
    &[RoleId::Citizen],
    &[RoleId::Magistrate],
    &[RoleId::Bloodseeker],
    &[RoleId::Medium],
];

/// Ordered role sequence for `player_count` participants. Counts beyond the
/// last band are padded with citizens.
pub fn distribution_for(player_count: usize) -> Result<Vec<RoleId>, GameError> {
    if player_count < MIN_PLAYERS {
        return Err(GameError::InsufficientPlayers {
            found: player_count,
            required: MIN_PLAYERS,
        });
    }

    let mut roles: Vec<RoleId> = Vec::with_capacity(player_count);
    for band in BANDS.iter() {
        if roles.len() + band.len() > player_count {
            break;
        }
        roles.extend_from_slice(band);
    }
    roles.resize(player_count, RoleId::Citizen);
    Ok(roles)
}
