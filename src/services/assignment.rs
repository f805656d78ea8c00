use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::GameError;
use crate::models::game::Roster;
use crate::models::role::{distribution_for, RoleId, MIN_PLAYERS};

/// Deals the band distribution for `player_count` to the roster. The
/// participant order is shuffled, the role sequence is not.
pub fn assign<R: Rng + ?Sized>(
    roster: &mut Roster,
    player_count: usize,
    rng: &mut R,
) -> Result<Vec<(String, RoleId)>, GameError> {
    if player_count != roster.len() || player_count < MIN_PLAYERS {
        return Err(GameError::InsufficientPlayers {
            found: roster.len(),
            required: player_count.max(MIN_PLAYERS),
        });
    }
    if roster.values().any(|p| p.role_id().is_some()) {
        return Err(GameError::AlreadyAssigned);
    }

    let roles = distribution_for(player_count)?;
    let mut order: Vec<String> = roster.keys().cloned().collect();
    order.shuffle(rng);

    let mut dealt = Vec::with_capacity(order.len());
    for (id, role) in order.into_iter().zip(roles) {
        if let Some(participant) = roster.get_mut(&id) {
            participant.assign_role(role);
            dealt.push((id, role));
        }
    }
    Ok(dealt)
}
