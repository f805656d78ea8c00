use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use shadow_court::services::victory::Winner;
use shadow_court::{
    Audience, Ballot, Capability, DayAction, GameConfig, GameError, GameEvent, GameService,
    Phase, RecordingNotifier, RoleId, Team,
};

fn config(auto_start: bool) -> GameConfig {
    GameConfig {
        auto_start,
        ..GameConfig::default()
    }
}

async fn lobby(config: GameConfig, n: usize, seed: u64) -> (GameService, RecordingNotifier) {
    let notifier = RecordingNotifier::new();
    let service = GameService::with_rng(
        config,
        Arc::new(notifier.clone()),
        StdRng::seed_from_u64(seed),
    );
    for i in 0..n {
        service
            .add_participant(&format!("p{i}"), &format!("Player {i}"))
            .await
            .unwrap();
    }
    (service, notifier)
}

/// Who got which role, read back from the private reveals.
fn dealt_roles(notifier: &RecordingNotifier) -> HashMap<RoleId, Vec<String>> {
    let mut roles: HashMap<RoleId, Vec<String>> = HashMap::new();
    for envelope in notifier.envelopes() {
        if let (Audience::Participant(id), GameEvent::RoleRevealed { role, .. }) =
            (&envelope.audience, &envelope.event)
        {
            roles.entry(*role).or_default().push(id.clone());
        }
    }
    roles
}

fn holder(roles: &HashMap<RoleId, Vec<String>>, role: RoleId) -> String {
    roles[&role][0].clone()
}

fn count_events(notifier: &RecordingNotifier, pred: impl Fn(&GameEvent) -> bool) -> usize {
    notifier
        .envelopes()
        .iter()
        .filter(|e| pred(&e.event))
        .count()
}

#[tokio::test]
async fn test_four_player_match_ends_with_good_victory() {
    let (service, notifier) = lobby(config(false), 4, 21).await;
    service.begin_match().await.unwrap();
    let roles = dealt_roles(&notifier);
    let wolf = holder(&roles, RoleId::Bloodseeker);
    let seer = holder(&roles, RoleId::Oracle);
    let guard = holder(&roles, RoleId::Guardian);
    let plain = holder(&roles, RoleId::Citizen);

    service
        .submit_night_action(&wolf, Capability::Kill, &seer)
        .await
        .unwrap();
    service
        .submit_night_action(&guard, Capability::Protect, &plain)
        .await
        .unwrap();
    assert_eq!(service.current_phase().await, Phase::Night);
    service
        .submit_night_action(&seer, Capability::Investigate, &wolf)
        .await
        .unwrap();

    // every night actor has acted, so dawn came early
    assert_eq!(service.current_phase().await, Phase::Dawn);
    let report = notifier
        .envelopes()
        .into_iter()
        .find_map(|e| match e.event {
            GameEvent::NightReport(report) => Some(report),
            _ => None,
        })
        .unwrap();
    assert_eq!(report.deaths.len(), 1);
    assert_eq!(report.deaths[0].participant_id, seer);
    assert!(report.survived.is_empty());

    let vision = notifier.events_for(&Audience::Participant(seer.clone()));
    assert!(vision.iter().any(|e| matches!(
        e,
        GameEvent::InvestigationResult { team: Team::Evil, .. }
    )));

    assert_eq!(service.advance_phase().await, Ok(Phase::Trial));
    assert_eq!(service.living_roster().await.len(), 3);

    service
        .submit_vote(&guard, Ballot::Target(wolf.clone()))
        .await
        .unwrap();
    service
        .submit_vote(&plain, Ballot::Target(wolf.clone()))
        .await
        .unwrap();
    service.submit_vote(&wolf, Ballot::Abstain).await.unwrap();

    let result = service.last_result().await.expect("match should be over");
    let verdict = result.verdict.unwrap();
    assert_eq!(verdict.winner, Winner::Good);
    assert!(verdict.co_winners.is_empty());
    assert_eq!(service.current_phase().await, Phase::Lobby);
    assert!(service.living_roster().await.is_empty());

    let trial = notifier
        .envelopes()
        .into_iter()
        .find_map(|e| match e.event {
            GameEvent::TrialReport(report) => Some(report),
            _ => None,
        })
        .unwrap();
    assert_eq!(trial.exiled.unwrap().participant_id, wolf);
    assert_eq!(trial.tally[0].votes, 2);
    assert_eq!(trial.abstained, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timers_drive_the_phase_cycle() {
    let (service, _) = lobby(config(false), 4, 1).await;
    service.begin_match().await.unwrap();
    assert_eq!(service.current_phase().await, Phase::Night);

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(service.current_phase().await, Phase::Dawn);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(service.current_phase().await, Phase::Trial);

    tokio::time::sleep(Duration::from_secs(45)).await;
    assert_eq!(service.current_phase().await, Phase::Banishment);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(service.current_phase().await, Phase::Night);
    assert_eq!(service.day_number().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_early_dawn_cancels_the_night_timer() {
    let config = GameConfig {
        auto_start: false,
        dawn_seconds: 120,
        ..GameConfig::default()
    };
    let (service, notifier) = lobby(config, 4, 2).await;
    service.begin_match().await.unwrap();
    let roles = dealt_roles(&notifier);
    let wolf = holder(&roles, RoleId::Bloodseeker);
    let seer = holder(&roles, RoleId::Oracle);
    let guard = holder(&roles, RoleId::Guardian);

    service
        .submit_night_action(&wolf, Capability::Kill, &guard)
        .await
        .unwrap();
    service.skip_night_action(&seer).await.unwrap();
    service
        .submit_night_action(&guard, Capability::Protect, &guard)
        .await
        .unwrap();
    assert_eq!(service.current_phase().await, Phase::Dawn);

    // well past the original night deadline, still before the trial opens
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(service.current_phase().await, Phase::Dawn);
    assert_eq!(
        count_events(&notifier, |e| matches!(e, GameEvent::NightReport(_))),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_force_end_silences_pending_timers() {
    let (service, notifier) = lobby(config(false), 5, 3).await;
    service.begin_match().await.unwrap();
    service.force_end().await.unwrap();
    let after_end = notifier.envelopes().len();

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(service.current_phase().await, Phase::Lobby);
    assert_eq!(notifier.envelopes().len(), after_end);
    assert_eq!(service.force_end().await, Err(GameError::NoActiveMatch));
}

#[tokio::test(start_paused = true)]
async fn test_auto_start_after_minimum_joins() {
    let (service, notifier) = lobby(config(true), 4, 4).await;
    assert_eq!(service.current_phase().await, Phase::Lobby);
    assert_eq!(
        count_events(&notifier, |e| matches!(e, GameEvent::MatchStarting { .. })),
        1
    );

    // joins are still open during the countdown
    service.add_participant("p4", "Player 4").await.unwrap();

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(service.current_phase().await, Phase::Night);
    assert_eq!(dealt_roles(&notifier).values().map(Vec::len).sum::<usize>(), 5);
}

#[tokio::test]
async fn test_manual_start_wins_the_race_with_auto_start() {
    let (service, _) = lobby(config(true), 4, 5).await;
    service.begin_match().await.unwrap();
    assert_eq!(service.current_phase().await, Phase::Night);
    assert_eq!(service.begin_match().await, Err(GameError::WrongPhase));
}

#[tokio::test]
async fn test_trickster_swap_changes_the_exile() {
    let (service, notifier) = lobby(config(false), 6, 6).await;
    service.begin_match().await.unwrap();
    let roles = dealt_roles(&notifier);
    let wolf = holder(&roles, RoleId::Bloodseeker);
    let seer = holder(&roles, RoleId::Oracle);
    let guard = holder(&roles, RoleId::Guardian);
    let trick = holder(&roles, RoleId::Trickster);
    let citizens = roles[&RoleId::Citizen].clone();

    // quiet night
    service.skip_night_action(&wolf).await.unwrap();
    service.skip_night_action(&seer).await.unwrap();
    service.skip_night_action(&guard).await.unwrap();
    assert_eq!(service.advance_phase().await, Ok(Phase::Trial));

    // the village piles onto the wolf; the trickster turns it onto a citizen
    service
        .submit_day_action(
            &trick,
            DayAction::SwapVotes {
                first: wolf.clone(),
                second: citizens[1].clone(),
            },
        )
        .await
        .unwrap();
    for voter in [&seer, &guard, &citizens[0]] {
        service
            .submit_vote(voter, Ballot::Target(wolf.clone()))
            .await
            .unwrap();
    }
    service
        .submit_vote(&citizens[1], Ballot::Target(citizens[0].clone()))
        .await
        .unwrap();
    service
        .submit_vote(&wolf, Ballot::Target(citizens[0].clone()))
        .await
        .unwrap();
    service.submit_vote(&trick, Ballot::Abstain).await.unwrap();

    assert_eq!(service.current_phase().await, Phase::Banishment);
    let trial = notifier
        .envelopes()
        .into_iter()
        .find_map(|e| match e.event {
            GameEvent::TrialReport(report) => Some(report),
            _ => None,
        })
        .unwrap();
    assert_eq!(trial.swapped, Some((wolf.clone(), citizens[1].clone())));
    assert_eq!(trial.exiled.unwrap().participant_id, citizens[1]);
    assert_eq!(trial.tally[0].votes, 3);
    assert!(service.living_roster().await.iter().any(|p| p.id == wolf));
    assert_eq!(
        service
            .submit_day_action(
                &trick,
                DayAction::SwapVotes {
                    first: wolf.clone(),
                    second: seer.clone(),
                },
            )
            .await,
        Err(GameError::IllegalActionPhase)
    );
}

#[tokio::test]
async fn test_day_abilities_resolve_during_the_trial() {
    let twelve = GameConfig {
        auto_start: false,
        max_players: 12,
        ..GameConfig::default()
    };
    let (service, notifier) = lobby(twelve, 12, 8).await;
    service.begin_match().await.unwrap();
    let roles = dealt_roles(&notifier);
    let hunter = holder(&roles, RoleId::Soulhunter);
    let medium = holder(&roles, RoleId::Medium);
    let judge = holder(&roles, RoleId::Magistrate);
    let seer = holder(&roles, RoleId::Oracle);

    let shot = DayAction::DayKill {
        target: seer.clone(),
    };
    assert_eq!(
        service.submit_day_action(&hunter, shot.clone()).await,
        Err(GameError::IllegalActionPhase)
    );

    service.advance_phase().await.unwrap();
    assert_eq!(service.advance_phase().await, Ok(Phase::Trial));

    service.submit_day_action(&hunter, shot.clone()).await.unwrap();
    assert_eq!(
        count_events(&notifier, |e| matches!(e, GameEvent::DayKill { .. })),
        1
    );
    assert!(!service
        .living_roster()
        .await
        .iter()
        .any(|p| p.id == seer));
    assert_eq!(
        service.submit_day_action(&hunter, shot).await,
        Err(GameError::AbilityAlreadyUsed(hunter.clone()))
    );

    service
        .submit_day_action(
            &medium,
            DayAction::Commune {
                target: seer.clone(),
            },
        )
        .await
        .unwrap();
    let private = notifier.events_for(&Audience::Participant(medium.clone()));
    assert!(private.iter().any(|e| matches!(
        e,
        GameEvent::CommuneResult {
            role: RoleId::Oracle,
            ..
        }
    )));

    service
        .submit_day_action(&judge, DayAction::CancelVotes)
        .await
        .unwrap();
    assert_eq!(service.advance_phase().await, Ok(Phase::Banishment));
    let trial = notifier
        .envelopes()
        .into_iter()
        .find_map(|e| match e.event {
            GameEvent::TrialReport(report) => Some(report),
            _ => None,
        })
        .unwrap();
    assert!(trial.cancelled);
    assert!(trial.exiled.is_none());
}

#[tokio::test]
async fn test_status_reveals_only_the_dead() {
    let (service, notifier) = lobby(config(false), 5, 9).await;
    service.begin_match().await.unwrap();
    let roles = dealt_roles(&notifier);
    let wolf = holder(&roles, RoleId::Bloodseeker);
    let plain = roles[&RoleId::Citizen][0].clone();

    service
        .submit_night_action(&wolf, Capability::Kill, &plain)
        .await
        .unwrap();
    service.advance_phase().await.unwrap();

    let status = service.status().await;
    assert_eq!(status.phase, Phase::Dawn);
    assert_eq!(status.living.len(), 4);
    assert_eq!(status.dead.len(), 1);
    assert_eq!(status.dead[0].participant_id, plain);
    assert_eq!(status.dead[0].role, RoleId::Citizen);
    assert!(status.deadline.is_some());
}
