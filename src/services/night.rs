use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::game::{NightActions, Roster};
use crate::models::role::{Capability, RoleId, Team};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Casualty {
    pub participant_id: String,
    pub name: String,
    pub role: Option<RoleId>,
}

/// Public part of a dawn: who died and who was saved, in resolution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightReport {
    pub deaths: Vec<Casualty>,
    pub survived: Vec<String>,
}

impl NightReport {
    pub fn is_peaceful(&self) -> bool {
        self.deaths.is_empty() && self.survived.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investigation {
    pub target_id: String,
    pub team: Team,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NightOutcome {
    pub report: NightReport,
    /// Keyed by investigator.
    pub investigations: BTreeMap<String, Investigation>,
}

/// Resolves one night. Everything is judged against who was alive when the
/// night closed, so a killer struck down in the same night still acts.
pub fn resolve(roster: &mut Roster, actions: NightActions) -> NightOutcome {
    let alive_at_dusk: BTreeSet<String> = roster
        .values()
        .filter(|p| p.is_alive())
        .map(|p| p.id.clone())
        .collect();

    let protected: BTreeSet<&str> = actions
        .targets(Capability::Protect)
        .filter(|(actor, _)| alive_at_dusk.contains(*actor))
        .map(|(_, target)| target)
        .collect();
    for target in &protected {
        if let Some(participant) = roster.get_mut(*target) {
            participant.protected_this_night = true;
        }
    }

    let mut outcome = NightOutcome::default();

    for (actor, target) in actions.targets(Capability::Kill) {
        if !alive_at_dusk.contains(actor) {
            warn!("Ignoring kill from eliminated participant {}", actor);
            continue;
        }
        let Some(victim) = roster.get_mut(target) else {
            warn!("Kill by {} names unknown participant {}", actor, target);
            continue;
        };
        if !victim.is_alive() {
            continue;
        }
        if protected.contains(target) {
            if !outcome.report.survived.iter().any(|id| id == target) {
                outcome.report.survived.push(target.to_string());
            }
            continue;
        }
        victim.eliminate();
        outcome.report.deaths.push(Casualty {
            participant_id: victim.id.clone(),
            name: victim.name.clone(),
            role: victim.role_id(),
        });
    }

    for (actor, target) in actions.targets(Capability::Investigate) {
        if !alive_at_dusk.contains(actor) {
            continue;
        }
        match roster.get(target).and_then(|p| p.team()) {
            Some(team) => {
                outcome.investigations.insert(
                    actor.to_string(),
                    Investigation {
                        target_id: target.to_string(),
                        team,
                    },
                );
            }
            None => warn!("Investigation by {} names unknown participant {}", actor, target),
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::player::Participant;

    fn roster(roles: &[(&str, RoleId)]) -> Roster {
        roles
            .iter()
            .map(|(id, role)| {
                let mut p = Participant::new(id.to_string(), id.to_uppercase());
                p.assign_role(*role);
                (id.to_string(), p)
            })
            .collect()
    }

    fn village() -> Roster {
        roster(&[
            ("wolf", RoleId::Bloodseeker),
            ("wolf2", RoleId::Bloodseeker),
            ("seer", RoleId::Oracle),
            ("guard", RoleId::Guardian),
            ("plain", RoleId::Citizen),
            ("trick", RoleId::Trickster),
        ])
    }

    fn alive(roster: &Roster, id: &str) -> bool {
        roster[id].is_alive()
    }

    #[test]
    fn protection_beats_killing() {
        let mut players = village();
        let mut actions = NightActions::default();
        actions.record(Capability::Protect, "guard", "plain");
        actions.record(Capability::Kill, "wolf", "plain");

        let outcome = resolve(&mut players, actions);

        assert!(alive(&players, "plain"));
        assert!(players["plain"].protected_this_night);
        assert!(outcome.report.deaths.is_empty());
        assert_eq!(outcome.report.survived, vec!["plain".to_string()]);
    }

    #[test]
    fn duplicate_kills_produce_one_death() {
        let mut players = village();
        let mut actions = NightActions::default();
        actions.record(Capability::Kill, "wolf", "seer");
        actions.record(Capability::Kill, "wolf2", "seer");

        let outcome = resolve(&mut players, actions);

        assert_eq!(outcome.report.deaths.len(), 1);
        assert_eq!(outcome.report.deaths[0].participant_id, "seer");
        assert_eq!(outcome.report.deaths[0].role, Some(RoleId::Oracle));
        assert!(!alive(&players, "seer"));
    }

    #[test]
    fn guardian_may_protect_themselves() {
        let mut players = village();
        let mut actions = NightActions::default();
        actions.record(Capability::Protect, "guard", "guard");
        actions.record(Capability::Kill, "wolf", "guard");

        let outcome = resolve(&mut players, actions);
        assert!(alive(&players, "guard"));
        assert_eq!(outcome.report.survived, vec!["guard".to_string()]);
    }

    #[test]
    fn investigation_reports_team_even_for_the_dead() {
        let mut players = village();
        players.get_mut("trick").unwrap().eliminate();
        let mut actions = NightActions::default();
        actions.record(Capability::Investigate, "seer", "trick");

        let outcome = resolve(&mut players, actions);
        assert_eq!(
            outcome.investigations.get("seer"),
            Some(&Investigation {
                target_id: "trick".to_string(),
                team: Team::Neutral
            })
        );
    }

    #[test]
    fn investigator_killed_tonight_still_learns() {
        let mut players = village();
        let mut actions = NightActions::default();
        actions.record(Capability::Kill, "wolf", "seer");
        actions.record(Capability::Investigate, "seer", "wolf");

        let outcome = resolve(&mut players, actions);
        assert!(!alive(&players, "seer"));
        assert_eq!(outcome.investigations["seer"].team, Team::Evil);
    }

    #[test]
    fn actions_from_the_already_dead_are_ignored() {
        let mut players = village();
        players.get_mut("wolf").unwrap().eliminate();
        players.get_mut("guard").unwrap().eliminate();
        let mut actions = NightActions::default();
        actions.record(Capability::Kill, "wolf", "plain");
        actions.record(Capability::Protect, "guard", "seer");
        actions.record(Capability::Kill, "wolf2", "seer");

        let outcome = resolve(&mut players, actions);
        assert!(alive(&players, "plain"));
        assert!(!alive(&players, "seer"));
        assert_eq!(outcome.report.deaths.len(), 1);
    }

    #[test]
    fn empty_night_changes_nothing() {
        let mut players = village();
        let before: Vec<_> = players.values().map(|p| p.is_alive()).collect();

        let outcome = resolve(&mut players, NightActions::default());

        assert!(outcome.report.is_peaceful());
        assert!(outcome.investigations.is_empty());
        let after: Vec<_> = players.values().map(|p| p.is_alive()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn unknown_targets_are_skipped() {
        let mut players = village();
        let mut actions = NightActions::default();
        actions.record(Capability::Kill, "wolf", "ghost");
        actions.record(Capability::Investigate, "seer", "ghost");

        let outcome = resolve(&mut players, actions);
        assert!(outcome.report.is_peaceful());
        assert!(outcome.investigations.is_empty());
    }
}
