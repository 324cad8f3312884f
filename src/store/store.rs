use crate::*;

/// Shared persistent state of one experiment.
///
/// Every method is atomic on its own; the `commit_*` methods and
/// [`Store::submit`] run as exclusive transactions that re-read what they
/// depend on before writing. Plain reads may be stale. Keyed inserts never
/// overwrite and report [`Insert::Conflict`] instead.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn experiment(&self) -> Result<Option<Experiment>, StoreError>;
    async fn create(&self, experiment: &Experiment) -> Result<Insert, StoreError>;
    /// New → Started at `at`. False if the experiment was not New.
    async fn commit_start(&self, at: Stamp) -> Result<bool, StoreError>;
    /// Opens round `to` at `at` unless the stored round already reached it.
    async fn commit_round(&self, to: Round, at: Stamp) -> Result<bool, StoreError>;
    /// Started → Prewin together with the ticket line. False if not Started.
    async fn commit_finish(&self, line: &[Allotment], total: Tickets) -> Result<bool, StoreError>;
    /// Prewin → Postwin together with every outcome. False if not Prewin.
    async fn commit_draw(&self, outcome: &[Winner]) -> Result<bool, StoreError>;

    async fn games(&self) -> Result<Vec<Game>, StoreError>;
    async fn insert_game(&self, game: &Game) -> Result<Insert, StoreError>;

    async fn players(&self) -> Result<Vec<Player>, StoreError>;
    async fn insert_player(&self, player: &Player) -> Result<Insert, StoreError>;

    async fn seat(&self, round: Round, player: PlayerId) -> Result<Option<Seat>, StoreError>;
    async fn seats(&self, round: Round) -> Result<Vec<Seat>, StoreError>;
    /// Number of rounds the player has been admitted to.
    async fn admissions(&self, player: PlayerId) -> Result<usize, StoreError>;
    async fn admit(&self, seat: &Seat) -> Result<Insert, StoreError>;

    /// Records the choice and bumps the seat's completed count in one
    /// transaction, provided the choice's round is still the current one.
    async fn submit(&self, choice: &Choice) -> Result<Submission, StoreError>;
    async fn choices(&self, round: Round, game: GameId) -> Result<Vec<Choice>, StoreError>;

    async fn roundup(&self, round: Round, game: GameId) -> Result<Option<Roundup>, StoreError>;
    /// Persists a roundup together with the payoffs it settles, in one
    /// transaction. On [`Insert::Conflict`] nothing is written, so a visible
    /// roundup always comes with all of its payoffs.
    async fn insert_roundup(&self, roundup: &Roundup, payoffs: &[Payoff]) -> Result<Insert, StoreError>;

    async fn payoffs(&self, round: Round, player: PlayerId) -> Result<Vec<Payoff>, StoreError>;

    async fn entry(&self, round: Round, player: PlayerId) -> Result<Option<Entry>, StoreError>;
    async fn insert_entry(&self, entry: &Entry) -> Result<Insert, StoreError>;

    /// The ticket line, in line order.
    async fn allotments(&self) -> Result<Vec<Allotment>, StoreError>;
    /// Every outcome, winners by rank first.
    async fn winners(&self) -> Result<Vec<Winner>, StoreError>;
}
