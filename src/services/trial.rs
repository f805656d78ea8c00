use log::warn;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::night::Casualty;
use crate::models::game::{Ballot, PendingDayActions, Roster};
use crate::models::role::RoleId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub candidate_id: String,
    pub votes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialReport {
    pub exiled: Option<Casualty>,
    /// Highest tally first, then by candidate id.
    pub tally: Vec<Tally>,
    pub abstained: usize,
    pub participation: usize,
    /// Candidates sharing the top tally when a random pick was needed.
    pub tied: Vec<String>,
    pub cancelled: bool,
    pub swapped: Option<(String, String)>,
}

fn can_use_ability(roster: &Roster, actor: &str) -> bool {
    roster
        .get(actor)
        .is_some_and(|p| p.is_alive() && !p.ability_used())
}

fn apply_swap(
    roster: &mut Roster,
    votes: &mut BTreeMap<String, Ballot>,
    day_actions: &PendingDayActions,
) -> Option<(String, String)> {
    let swap = day_actions.swap.as_ref()?;
    if !can_use_ability(roster, &swap.actor) {
        warn!("Dropping vote swap from {}: ability unavailable", swap.actor);
        return None;
    }
    for named in [&swap.first, &swap.second] {
        if !roster.get(named).is_some_and(|p| p.is_alive()) {
            warn!("Dropping vote swap: {} is no longer in the trial", named);
            return None;
        }
    }

    // ballots naming one of the pair now name the other
    for ballot in votes.values_mut() {
        if let Ballot::Target(target) = ballot {
            if *target == swap.first {
                *target = swap.second.clone();
            } else if *target == swap.second {
                *target = swap.first.clone();
            }
        }
    }
    if let Some(actor) = roster.get_mut(&swap.actor) {
        actor.consume_ability();
    }
    Some((swap.first.clone(), swap.second.clone()))
}

/// Tallies one trial and exiles the winner, if any.
///
/// Swaps are applied before counting and a cancellation voids the exile.
/// Ties at the top are broken by a uniform draw from `rng`; this is the
/// house rule, so pass a seeded generator when a replay must match.
pub fn resolve<R: Rng + ?Sized>(
    roster: &mut Roster,
    mut votes: BTreeMap<String, Ballot>,
    day_actions: PendingDayActions,
    rng: &mut R,
) -> TrialReport {
    let mut report = TrialReport {
        swapped: apply_swap(roster, &mut votes, &day_actions),
        ..TrialReport::default()
    };

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for (voter, ballot) in &votes {
        if !roster.get(voter).is_some_and(|p| p.is_alive()) {
            warn!("Ignoring ballot from {}: not a living participant", voter);
            continue;
        }
        report.participation += 1;
        match ballot {
            Ballot::Abstain => report.abstained += 1,
            Ballot::Target(target) => {
                if roster.get(target).is_some_and(|p| p.is_alive()) {
                    *counts.entry(target.as_str()).or_insert(0) += 1;
                } else {
                    warn!("Discarding vote from {} for eliminated {}", voter, target);
                }
            }
        }
    }

    report.tally = counts
        .iter()
        .map(|(candidate, votes)| Tally {
            candidate_id: candidate.to_string(),
            votes: *votes,
        })
        .collect();
    report
        .tally
        .sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.candidate_id.cmp(&b.candidate_id)));

    if let Some(actor) = day_actions.cancel.as_deref() {
        if can_use_ability(roster, actor) {
            if let Some(magistrate) = roster.get_mut(actor) {
                magistrate.consume_ability();
            }
            report.cancelled = true;
            return report;
        }
        warn!("Dropping vote cancellation from {}: ability unavailable", actor);
    }

    let top = counts.values().copied().max().unwrap_or(0);
    if top == 0 {
        return report;
    }
    let leaders: Vec<&str> = counts
        .iter()
        .filter(|(_, votes)| **votes == top)
        .map(|(candidate, _)| *candidate)
        .collect();
    if leaders.len() > 1 {
        report.tied = leaders.iter().map(|id| id.to_string()).collect();
    }

    let Some(chosen) = leaders.choose(rng).map(|id| id.to_string()) else {
        return report;
    };
    if let Some(exiled) = roster.get_mut(&chosen) {
        exiled.eliminate();
        report.exiled = Some(Casualty {
            participant_id: exiled.id.clone(),
            name: exiled.name.clone(),
            role: exiled.role_id(),
        });
    }
    report
}

/// Applies a validated day kill. Protection does not reach into the day.
pub fn day_kill(roster: &mut Roster, actor: &str, target: &str) -> Option<Casualty> {
    if !can_use_ability(roster, actor) || !roster.get(target).is_some_and(|p| p.is_alive()) {
        return None;
    }
    roster.get_mut(actor)?.consume_ability();
    let victim = roster.get_mut(target)?;
    victim.eliminate();
    Some(Casualty {
        participant_id: victim.id.clone(),
        name: victim.name.clone(),
        role: victim.role_id(),
    })
}

/// Reveals a dead participant's role to the actor, once.
pub fn commune(roster: &mut Roster, actor: &str, target: &str) -> Option<RoleId> {
    if !can_use_ability(roster, actor) {
        return None;
    }
    let role = roster.get(target).filter(|p| !p.is_alive())?.role_id()?;
    roster.get_mut(actor)?.consume_ability();
    Some(role)
}
