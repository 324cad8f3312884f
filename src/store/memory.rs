use crate::*;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

/// In-process store for tests, benchmarks and simulations.
///
/// Transactions are a single mutex acquisition. Two fault knobs imitate a
/// contended shared database: [`Memory::flaky`] makes the next calls report
/// busy, [`Memory::jammed`] does the same for keyed inserts only, and
/// [`Memory::stale`] makes the next memo reads miss as if another process
/// had not yet committed.
#[derive(Debug, Default)]
pub struct Memory {
    tables: Mutex<Tables>,
    flaky: AtomicUsize,
    jammed: AtomicUsize,
    stale: AtomicUsize,
}

#[derive(Debug, Default)]
struct Tables {
    experiment: Option<Experiment>,
    games: BTreeMap<GameId, Game>,
    players: BTreeMap<PlayerId, Player>,
    seats: BTreeMap<(Round, PlayerId), Seat>,
    choices: BTreeMap<(Round, GameId, PlayerId), Choice>,
    roundups: BTreeMap<(Round, GameId), Roundup>,
    payoffs: BTreeMap<(Round, PlayerId, GameId), Payoff>,
    entries: BTreeMap<(Round, PlayerId), Entry>,
    line: Vec<Allotment>,
    outcome: Vec<Winner>,
}

impl Memory {
    /// The next `n` calls report [`StoreError::Busy`].
    pub fn flaky(&self, n: usize) {
        self.flaky.store(n, Ordering::SeqCst);
    }
    /// The next `n` keyed inserts report [`StoreError::Busy`].
    pub fn jammed(&self, n: usize) {
        self.jammed.store(n, Ordering::SeqCst);
    }
    /// The next `n` roundup or ledger reads find nothing.
    pub fn stale(&self, n: usize) {
        self.stale.store(n, Ordering::SeqCst);
    }
    /// Number of persisted roundups, for assertions on exactly-once writes.
    pub fn roundup_count(&self) -> usize {
        self.tables.lock().map(|t| t.roundups.len()).unwrap_or(0)
    }
    /// Number of persisted payoffs.
    pub fn payoff_count(&self) -> usize {
        self.tables.lock().map(|t| t.payoffs.len()).unwrap_or(0)
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
    fn with<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> Result<T, StoreError> {
        if Self::take(&self.flaky) {
            return Err(StoreError::Busy);
        }
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| StoreError::Failure("memory store poisoned".into()))?;
        Ok(f(&mut tables))
    }
    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> Result<T, StoreError> {
        if Self::take(&self.jammed) {
            return Err(StoreError::Busy);
        }
        self.with(f)
    }
    fn memo<T>(&self, f: impl FnOnce(&mut Tables) -> Option<T>) -> Result<Option<T>, StoreError> {
        let found = self.with(f)?;
        if found.is_some() && Self::take(&self.stale) {
            return Ok(None);
        }
        Ok(found)
    }
    fn insert<K: Ord, V>(map: &mut BTreeMap<K, V>, key: K, value: V) -> Insert {
        match map.entry(key) {
            std::collections::btree_map::Entry::Occupied(_) => Insert::Conflict,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
                Insert::Inserted
            }
        }
    }
}

#[async_trait::async_trait]
impl Store for Memory {
    async fn experiment(&self) -> Result<Option<Experiment>, StoreError> {
        self.with(|t| t.experiment.clone())
    }
    async fn create(&self, experiment: &Experiment) -> Result<Insert, StoreError> {
        self.write(|t| match t.experiment {
            Some(_) => Insert::Conflict,
            None => {
                t.experiment = Some(experiment.clone());
                Insert::Inserted
            }
        })
    }
    async fn commit_start(&self, at: Stamp) -> Result<bool, StoreError> {
        self.with(|t| match t.experiment.as_mut() {
            Some(e) if e.phase() == Phase::New => {
                e.started(at);
                true
            }
            _ => false,
        })
    }
    async fn commit_round(&self, to: Round, at: Stamp) -> Result<bool, StoreError> {
        self.with(|t| match t.experiment.as_mut() {
            Some(e) if e.phase() == Phase::Started && e.round() < to => {
                e.opened(to, at);
                true
            }
            _ => false,
        })
    }
    async fn commit_finish(&self, line: &[Allotment], total: Tickets) -> Result<bool, StoreError> {
        self.with(|t| match t.experiment.as_mut() {
            Some(e) if e.phase() == Phase::Started => {
                e.allotted(total);
                t.line = line.to_vec();
                true
            }
            _ => false,
        })
    }
    async fn commit_draw(&self, outcome: &[Winner]) -> Result<bool, StoreError> {
        self.with(|t| match t.experiment.as_mut() {
            Some(e) if e.phase() == Phase::Prewin => {
                e.drawn();
                t.outcome = outcome.to_vec();
                true
            }
            _ => false,
        })
    }

    async fn games(&self) -> Result<Vec<Game>, StoreError> {
        self.with(|t| t.games.values().cloned().collect())
    }
    async fn insert_game(&self, game: &Game) -> Result<Insert, StoreError> {
        self.write(|t| Self::insert(&mut t.games, game.id(), game.clone()))
    }

    async fn players(&self) -> Result<Vec<Player>, StoreError> {
        self.with(|t| t.players.values().cloned().collect())
    }
    async fn insert_player(&self, player: &Player) -> Result<Insert, StoreError> {
        self.write(|t| Self::insert(&mut t.players, player.id(), player.clone()))
    }

    async fn seat(&self, round: Round, player: PlayerId) -> Result<Option<Seat>, StoreError> {
        self.with(|t| t.seats.get(&(round, player)).cloned())
    }
    async fn seats(&self, round: Round) -> Result<Vec<Seat>, StoreError> {
        self.with(|t| {
            t.seats
                .range((round, PlayerId::MIN)..=(round, PlayerId::MAX))
                .map(|(_, seat)| seat.clone())
                .collect()
        })
    }
    async fn admissions(&self, player: PlayerId) -> Result<usize, StoreError> {
        self.with(|t| t.seats.values().filter(|s| s.player() == player).count())
    }
    async fn admit(&self, seat: &Seat) -> Result<Insert, StoreError> {
        self.write(|t| Self::insert(&mut t.seats, (seat.round(), seat.player()), seat.clone()))
    }

    async fn submit(&self, choice: &Choice) -> Result<Submission, StoreError> {
        self.with(|t| {
            let open = t
                .experiment
                .as_ref()
                .map_or(false, |e| e.phase() == Phase::Started && e.round() == choice.round());
            if !open {
                return Submission::Closed;
            }
            let key = (choice.round(), choice.game(), choice.player());
            if t.choices.contains_key(&key) {
                return Submission::Duplicate;
            }
            match t.seats.get_mut(&(choice.round(), choice.player())) {
                None => Submission::Unseated,
                Some(seat) => {
                    seat.complete();
                    t.choices.insert(key, choice.clone());
                    Submission::Accepted
                }
            }
        })
    }
    async fn choices(&self, round: Round, game: GameId) -> Result<Vec<Choice>, StoreError> {
        self.with(|t| {
            t.choices
                .range((round, game, PlayerId::MIN)..=(round, game, PlayerId::MAX))
                .map(|(_, choice)| choice.clone())
                .collect()
        })
    }

    async fn roundup(&self, round: Round, game: GameId) -> Result<Option<Roundup>, StoreError> {
        self.memo(|t| t.roundups.get(&(round, game)).cloned())
    }
    async fn insert_roundup(&self, roundup: &Roundup, payoffs: &[Payoff]) -> Result<Insert, StoreError> {
        self.write(|t| {
            let key = (roundup.round(), roundup.game());
            if t.roundups.contains_key(&key) {
                return Insert::Conflict;
            }
            t.roundups.insert(key, roundup.clone());
            for payoff in payoffs {
                let key = (payoff.round(), payoff.player(), payoff.game());
                t.payoffs.entry(key).or_insert_with(|| payoff.clone());
            }
            Insert::Inserted
        })
    }

    async fn payoffs(&self, round: Round, player: PlayerId) -> Result<Vec<Payoff>, StoreError> {
        self.with(|t| {
            t.payoffs
                .range((round, player, GameId::MIN)..=(round, player, GameId::MAX))
                .map(|(_, payoff)| payoff.clone())
                .collect()
        })
    }
    async fn entry(&self, round: Round, player: PlayerId) -> Result<Option<Entry>, StoreError> {
        self.memo(|t| t.entries.get(&(round, player)).cloned())
    }
    async fn insert_entry(&self, entry: &Entry) -> Result<Insert, StoreError> {
        self.write(|t| Self::insert(&mut t.entries, (entry.round(), entry.player()), entry.clone()))
    }

    async fn allotments(&self) -> Result<Vec<Allotment>, StoreError> {
        self.with(|t| t.line.clone())
    }
    async fn winners(&self) -> Result<Vec<Winner>, StoreError> {
        self.with(|t| t.outcome.clone())
    }
}
