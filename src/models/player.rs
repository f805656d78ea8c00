use serde::{Deserialize, Serialize};

use super::role::{Role, RoleId, Team};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    role: Option<RoleId>,
    alive: bool,
    pub protected_this_night: bool,
    ability_used: bool,
}

impl Participant {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            role: None,
            alive: true,
            protected_this_night: false,
            ability_used: false,
        }
    }

    pub fn role_id(&self) -> Option<RoleId> {
        self.role
    }

    pub fn role(&self) -> Option<&'static Role> {
        self.role.map(RoleId::role)
    }

    pub fn team(&self) -> Option<Team> {
        self.role().map(|role| role.team)
    }

    /// Returns false if a role was already set; the first assignment sticks.
    pub(crate) fn assign_role(&mut self, role: RoleId) -> bool {
        if self.role.is_some() {
            return false;
        }
        self.role = Some(role);
        true
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Elimination is one-way.
    pub(crate) fn eliminate(&mut self) {
        self.alive = false;
    }

    pub fn ability_used(&self) -> bool {
        self.ability_used
    }

    pub(crate) fn consume_ability(&mut self) {
        self.ability_used = true;
    }
}
