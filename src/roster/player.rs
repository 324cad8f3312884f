use crate::*;

/// A registered participant.
///
/// `order` is drawn once at registration and fixes the player's place in
/// the ticket line, independently of any later draw seed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Player {
    id: PlayerId,
    order: i64,
    panel: bool,
}

impl Player {
    /// Registers with a fresh random ordering key.
    pub fn register(id: PlayerId, panel: bool) -> Self {
        use rand::Rng;
        Self {
            id,
            order: rand::rng().random(),
            panel,
        }
    }
    pub fn id(&self) -> PlayerId {
        self.id
    }
    pub fn order(&self) -> i64 {
        self.order
    }
    /// Sourced from an external panel and therefore outside the lottery.
    pub fn panel(&self) -> bool {
        self.panel
    }
    /// Position key in the ticket line.
    pub fn rank(&self) -> (i64, PlayerId) {
        (self.order, self.id)
    }
}

impl From<(PlayerId, i64, bool)> for Player {
    fn from((id, order, panel): (PlayerId, i64, bool)) -> Self {
        Self { id, order, panel }
    }
}
