use serde::{Deserialize, Serialize};

use crate::models::game::Roster;
use crate::models::role::{PrivateGoal, Team};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Good,
    Evil,
    /// Too few participants left to continue.
    Stalemate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub winner: Winner,
    /// Neutral participants whose own goal was met when the match ended.
    pub co_winners: Vec<String>,
}

/// `None` while the match should go on.
pub fn evaluate(roster: &Roster) -> Option<Verdict> {
    let living: Vec<_> = roster.values().filter(|p| p.is_alive()).collect();
    let count = |team| living.iter().filter(|p| p.team() == Some(team)).count();
    let evil = count(Team::Evil);
    let good = count(Team::Good);

    let winner = if living.len() <= 1 {
        Winner::Stalemate
    } else if evil == 0 {
        Winner::Good
    } else if evil >= good {
        Winner::Evil
    } else {
        return None;
    };

    let co_winners = living
        .iter()
        .filter(|p| {
            p.role()
                .and_then(|role| role.goal)
                .is_some_and(|goal| match goal {
                    PrivateGoal::SurviveToFinal(limit) => living.len() <= limit,
                })
        })
        .map(|p| p.id.clone())
        .collect();

    Some(Verdict { winner, co_winners })
}
