use super::schema::*;
use crate::*;
use const_format::concatcp;
use tokio::sync::Mutex;
use tokio_postgres::Client;
use tokio_postgres::IsolationLevel;
use tokio_postgres::Row;
use tokio_postgres::Transaction;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::FromSql;
use tokio_postgres::types::ToSql;

type Params<'a> = &'a [&'a (dyn ToSql + Sync)];

/// PostgreSQL-backed [`Store`].
///
/// Each process holds one connection. Transactional commits run at
/// SERIALIZABLE isolation and lock the experiment row, so concurrent
/// processes either serialize or fail with a retryable error.
pub struct Postgres {
    client: Mutex<Client>,
}

/// Connects to the database named by the `DB_URL` environment variable.
pub async fn db() -> Result<Postgres, StoreError> {
    log::info!("connecting to database");
    let ref url = std::env::var("DB_URL")
        .map_err(|_| StoreError::Failure("DB_URL must be set".into()))?;
    Postgres::connect(url).await
}

impl Postgres {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let tls = tokio_postgres::tls::NoTls;
        let (client, connection) = tokio_postgres::connect(url, tls).await.map_err(classify)?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::error!("database connection closed: {}", e);
            }
        });
        client
            .execute("SET client_min_messages TO WARNING", &[])
            .await
            .map_err(classify)?;
        Ok(Self {
            client: Mutex::new(client),
        })
    }

    /// Creates any missing tables.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        log::info!("creating tables");
        self.client
            .lock()
            .await
            .batch_execute(CREATES)
            .await
            .map_err(classify)
    }

    async fn read<T>(
        &self,
        sql: &str,
        params: Params<'_>,
        hydrate: fn(&Row) -> Result<T, StoreError>,
    ) -> Result<Vec<T>, StoreError> {
        self.client
            .lock()
            .await
            .query(sql, params)
            .await
            .map_err(classify)?
            .iter()
            .map(hydrate)
            .collect()
    }

    async fn write(&self, sql: &str, params: Params<'_>) -> Result<Insert, StoreError> {
        let rows = self
            .client
            .lock()
            .await
            .execute(sql, params)
            .await
            .map_err(classify)?;
        Ok(if rows == 0 {
            Insert::Conflict
        } else {
            Insert::Inserted
        })
    }
}

/// Busy-type SQLSTATEs become [`StoreError::Busy`]; everything else fails.
fn classify(e: tokio_postgres::Error) -> StoreError {
    match e.code() {
        Some(code)
            if code == &SqlState::T_R_SERIALIZATION_FAILURE
                || code == &SqlState::T_R_DEADLOCK_DETECTED
                || code == &SqlState::LOCK_NOT_AVAILABLE =>
        {
            StoreError::Busy
        }
        _ => StoreError::Failure(e.to_string()),
    }
}

async fn begin(client: &mut Client) -> Result<Transaction<'_>, StoreError> {
    client
        .build_transaction()
        .isolation_level(IsolationLevel::Serializable)
        .start()
        .await
        .map_err(classify)
}

/// Locks the experiment row for the rest of the transaction.
async fn lock(tx: &Transaction<'_>, sql: &str) -> Result<Option<(Phase, Round)>, StoreError> {
    match tx.query_opt(sql, &[]).await.map_err(classify)? {
        None => Ok(None),
        Some(row) => Ok(Some((phase(get(&row, "phase")?)?, get(&row, "round")?))),
    }
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, column: &str) -> Result<T, StoreError> {
    row.try_get(column).map_err(classify)
}
fn phase(n: i16) -> Result<Phase, StoreError> {
    Phase::try_from(n).map_err(|e| StoreError::Failure(e.to_string()))
}
fn role(n: i16) -> Result<Role, StoreError> {
    Role::try_from(n).map_err(|e| StoreError::Failure(e.to_string()))
}
fn ratio(s: String) -> Result<Ratio, StoreError> {
    parse(&s).map_err(|e| StoreError::Failure(e.to_string()))
}
fn mix(weights: Vec<String>) -> Result<Mix, StoreError> {
    Mix::try_from(weights.as_slice()).map_err(|e| StoreError::Failure(e.to_string()))
}

fn experiment(row: &Row) -> Result<Experiment, StoreError> {
    Ok(Experiment {
        phase: phase(get(row, "phase")?)?,
        round: get(row, "round")?,
        rounds: get(row, "rounds")?,
        prounds: get::<i64>(row, "prounds")? as usize,
        minutes: get(row, "minutes")?,
        round_pct: get::<i32>(row, "round_pct")? as u32,
        round_min: get(row, "round_min")?,
        start: get(row, "start")?,
        began: get(row, "began")?,
        total: get(row, "total")?,
        lottery: get(row, "lottery")?,
    })
}
fn game(row: &Row) -> Result<Game, StoreError> {
    let payoffs = get::<Vec<String>>(row, "payoffs")?
        .into_iter()
        .map(ratio)
        .collect::<Result<Vec<_>, _>>()?;
    Game::new(
        get(row, "id")?,
        get::<i32>(row, "p1")? as usize,
        get::<i32>(row, "p2")? as usize,
        payoffs,
    )
    .map_err(|e| StoreError::Failure(e.to_string()))
}
fn player(row: &Row) -> Result<Player, StoreError> {
    Ok(Player::from((get(row, "id")?, get(row, "ord")?, get(row, "panel")?)))
}
fn seat(row: &Row) -> Result<Seat, StoreError> {
    Ok(Seat::from((
        get(row, "round")?,
        get(row, "player")?,
        role(get(row, "role")?)?,
        get::<i32>(row, "completed")? as usize,
    )))
}
fn choice(row: &Row) -> Result<Choice, StoreError> {
    Ok(Choice::new(
        get(row, "round")?,
        get(row, "player")?,
        get(row, "game")?,
        role(get(row, "role")?)?,
        mix(get(row, "mix")?)?,
    ))
}
fn roundup(row: &Row) -> Result<Roundup, StoreError> {
    Ok(Roundup::from((
        get(row, "round")?,
        get(row, "game")?,
        mix(get(row, "row_mix")?)?,
        mix(get(row, "col_mix")?)?,
        get(row, "skip")?,
        get(row, "count")?,
    )))
}
fn payoff(row: &Row) -> Result<Payoff, StoreError> {
    Ok(Payoff::new(
        get(row, "round")?,
        get(row, "player")?,
        get(row, "game")?,
        ratio(get(row, "value")?)?,
    ))
}
fn entry(row: &Row) -> Result<Entry, StoreError> {
    Ok(Entry::from((
        get(row, "round")?,
        get(row, "player")?,
        ratio(get(row, "current")?)?,
        ratio(get(row, "aggregate")?)?,
        get(row, "tickets")?,
    )))
}
fn allotment(row: &Row) -> Result<Allotment, StoreError> {
    Ok(Allotment::from((
        get(row, "player")?,
        get(row, "start")?,
        get(row, "tickets")?,
    )))
}
fn winner(row: &Row) -> Result<Winner, StoreError> {
    Ok(Winner::from((
        get(row, "player")?,
        get(row, "won")?,
        get::<Option<i32>>(row, "rank")?.map(|r| r as usize),
        get(row, "ticket")?,
    )))
}

#[rustfmt::skip]
const LOCK_UPDATE: &str = concatcp!("SELECT phase, round FROM ", EXPERIMENT, " WHERE id = 1 FOR UPDATE");
#[rustfmt::skip]
const LOCK_SHARE:  &str = concatcp!("SELECT phase, round FROM ", EXPERIMENT, " WHERE id = 1 FOR SHARE");

#[async_trait::async_trait]
impl Store for Postgres {
    async fn experiment(&self) -> Result<Option<Experiment>, StoreError> {
        const SQL: &str = concatcp!(
            "SELECT ", EXPERIMENT_COLUMNS, " ",
            "FROM   ", EXPERIMENT, " ",
            "WHERE  id = 1"
        );
        Ok(self.read(SQL, &[], experiment).await?.into_iter().next())
    }
    async fn create(&self, e: &Experiment) -> Result<Insert, StoreError> {
        const SQL: &str = concatcp!(
            "INSERT INTO ", EXPERIMENT, " ",
            "(id, phase, round, rounds, prounds, minutes, round_pct, round_min, start, began, total, lottery) ",
            "VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) ",
            "ON CONFLICT DO NOTHING"
        );
        self.write(
            SQL,
            &[
                &i16::from(e.phase()),
                &e.round(),
                &e.rounds(),
                &(e.prounds() as i64),
                &e.minutes(),
                &(e.round_pct() as i32),
                &e.round_min(),
                &e.start(),
                &e.began(),
                &e.total(),
                &e.lottery(),
            ],
        )
        .await
    }
    async fn commit_start(&self, at: Stamp) -> Result<bool, StoreError> {
        const SQL: &str = concatcp!(
            "UPDATE ", EXPERIMENT, " ",
            "SET    phase = $1, start = $2 ",
            "WHERE  id = 1"
        );
        let mut client = self.client.lock().await;
        let tx = begin(&mut client).await?;
        match lock(&tx, LOCK_UPDATE).await? {
            Some((Phase::New, _)) => {}
            _ => return Ok(false),
        }
        tx.execute(SQL, &[&i16::from(Phase::Started), &at])
            .await
            .map_err(classify)?;
        tx.commit().await.map_err(classify)?;
        Ok(true)
    }
    async fn commit_round(&self, to: Round, at: Stamp) -> Result<bool, StoreError> {
        const SQL: &str = concatcp!(
            "UPDATE ", EXPERIMENT, " ",
            "SET    round = $1, began = $2 ",
            "WHERE  id = 1"
        );
        let mut client = self.client.lock().await;
        let tx = begin(&mut client).await?;
        match lock(&tx, LOCK_UPDATE).await? {
            Some((Phase::Started, round)) if round < to => {}
            _ => return Ok(false),
        }
        tx.execute(SQL, &[&to, &at]).await.map_err(classify)?;
        tx.commit().await.map_err(classify)?;
        Ok(true)
    }
    async fn commit_finish(&self, line: &[Allotment], total: Tickets) -> Result<bool, StoreError> {
        const ALLOT: &str = concatcp!(
            "INSERT INTO ", ALLOTMENTS, " (player, start, tickets) ",
            "VALUES ($1, $2, $3)"
        );
        const SQL: &str = concatcp!(
            "UPDATE ", EXPERIMENT, " ",
            "SET    phase = $1, total = $2 ",
            "WHERE  id = 1"
        );
        let mut client = self.client.lock().await;
        let tx = begin(&mut client).await?;
        match lock(&tx, LOCK_UPDATE).await? {
            Some((Phase::Started, _)) => {}
            _ => return Ok(false),
        }
        for a in line {
            tx.execute(ALLOT, &[&a.player(), &a.start(), &a.tickets()])
                .await
                .map_err(classify)?;
        }
        tx.execute(SQL, &[&i16::from(Phase::Prewin), &total])
            .await
            .map_err(classify)?;
        tx.commit().await.map_err(classify)?;
        Ok(true)
    }
    async fn commit_draw(&self, outcome: &[Winner]) -> Result<bool, StoreError> {
        const DRAW: &str = concatcp!(
            "INSERT INTO ", WINNERS, " (player, won, rank, ticket) ",
            "VALUES ($1, $2, $3, $4)"
        );
        const SQL: &str = concatcp!(
            "UPDATE ", EXPERIMENT, " ",
            "SET    phase = $1 ",
            "WHERE  id = 1"
        );
        let mut client = self.client.lock().await;
        let tx = begin(&mut client).await?;
        match lock(&tx, LOCK_UPDATE).await? {
            Some((Phase::Prewin, _)) => {}
            _ => return Ok(false),
        }
        for w in outcome {
            let rank = w.rank().map(|r| r as i32);
            tx.execute(DRAW, &[&w.player(), &w.is_winner(), &rank, &w.ticket()])
                .await
                .map_err(classify)?;
        }
        tx.execute(SQL, &[&i16::from(Phase::Postwin)])
            .await
            .map_err(classify)?;
        tx.commit().await.map_err(classify)?;
        Ok(true)
    }

    async fn games(&self) -> Result<Vec<Game>, StoreError> {
        const SQL: &str = concatcp!(
            "SELECT ", GAME_COLUMNS, " ",
            "FROM   ", GAMES, " ",
            "ORDER  BY id"
        );
        self.read(SQL, &[], game).await
    }
    async fn insert_game(&self, g: &Game) -> Result<Insert, StoreError> {
        const SQL: &str = concatcp!(
            "INSERT INTO ", GAMES, " (id, p1, p2, payoffs) ",
            "VALUES ($1, $2, $3, $4) ",
            "ON CONFLICT DO NOTHING"
        );
        let payoffs = g.payoffs().iter().map(|r| r.to_string()).collect::<Vec<_>>();
        self.write(
            SQL,
            &[&g.id(), &(g.p1() as i32), &(g.p2() as i32), &payoffs],
        )
        .await
    }

    async fn players(&self) -> Result<Vec<Player>, StoreError> {
        const SQL: &str = concatcp!(
            "SELECT ", PLAYER_COLUMNS, " ",
            "FROM   ", PLAYERS, " ",
            "ORDER  BY id"
        );
        self.read(SQL, &[], player).await
    }
    async fn insert_player(&self, p: &Player) -> Result<Insert, StoreError> {
        const SQL: &str = concatcp!(
            "INSERT INTO ", PLAYERS, " (id, ord, panel) ",
            "VALUES ($1, $2, $3) ",
            "ON CONFLICT DO NOTHING"
        );
        self.write(SQL, &[&p.id(), &p.order(), &p.panel()]).await
    }

    async fn seat(&self, round: Round, player: PlayerId) -> Result<Option<Seat>, StoreError> {
        const SQL: &str = concatcp!(
            "SELECT ", SEAT_COLUMNS, " ",
            "FROM   ", SEATS, " ",
            "WHERE  round  = $1 ",
            "AND    player = $2"
        );
        Ok(self.read(SQL, &[&round, &player], seat).await?.into_iter().next())
    }
    async fn seats(&self, round: Round) -> Result<Vec<Seat>, StoreError> {
        const SQL: &str = concatcp!(
            "SELECT ", SEAT_COLUMNS, " ",
            "FROM   ", SEATS, " ",
            "WHERE  round = $1 ",
            "ORDER  BY player"
        );
        self.read(SQL, &[&round], seat).await
    }
    async fn admissions(&self, player: PlayerId) -> Result<usize, StoreError> {
        const SQL: &str = concatcp!(
            "SELECT COUNT(*) AS admissions ",
            "FROM   ", SEATS, " ",
            "WHERE  player = $1"
        );
        let counts = self.read(SQL, &[&player], |row| get::<i64>(row, "admissions")).await?;
        Ok(counts.into_iter().next().unwrap_or(0) as usize)
    }
    async fn admit(&self, s: &Seat) -> Result<Insert, StoreError> {
        const SQL: &str = concatcp!(
            "INSERT INTO ", SEATS, " (round, player, role, completed) ",
            "VALUES ($1, $2, $3, 0) ",
            "ON CONFLICT DO NOTHING"
        );
        self.write(SQL, &[&s.round(), &s.player(), &i16::from(s.role())])
            .await
    }

    async fn submit(&self, c: &Choice) -> Result<Submission, StoreError> {
        const SEAT: &str = concatcp!(
            "SELECT completed ",
            "FROM   ", SEATS, " ",
            "WHERE  round  = $1 ",
            "AND    player = $2 ",
            "FOR    UPDATE"
        );
        const CHOOSE: &str = concatcp!(
            "INSERT INTO ", CHOICES, " (round, game, player, role, mix) ",
            "VALUES ($1, $2, $3, $4, $5) ",
            "ON CONFLICT DO NOTHING"
        );
        const BUMP: &str = concatcp!(
            "UPDATE ", SEATS, " ",
            "SET    completed = completed + 1 ",
            "WHERE  round  = $1 ",
            "AND    player = $2"
        );
        let mut client = self.client.lock().await;
        let tx = begin(&mut client).await?;
        match lock(&tx, LOCK_SHARE).await? {
            Some((Phase::Started, round)) if round == c.round() => {}
            _ => return Ok(Submission::Closed),
        }
        if tx
            .query_opt(SEAT, &[&c.round(), &c.player()])
            .await
            .map_err(classify)?
            .is_none()
        {
            return Ok(Submission::Unseated);
        }
        let ref weights = Vec::<String>::from(c.mix());
        let inserted = tx
            .execute(
                CHOOSE,
                &[
                    &c.round(),
                    &c.game(),
                    &c.player(),
                    &i16::from(c.role()),
                    weights,
                ],
            )
            .await
            .map_err(classify)?;
        if inserted == 0 {
            return Ok(Submission::Duplicate);
        }
        tx.execute(BUMP, &[&c.round(), &c.player()])
            .await
            .map_err(classify)?;
        tx.commit().await.map_err(classify)?;
        Ok(Submission::Accepted)
    }
    async fn choices(&self, round: Round, game: GameId) -> Result<Vec<Choice>, StoreError> {
        const SQL: &str = concatcp!(
            "SELECT ", CHOICE_COLUMNS, " ",
            "FROM   ", CHOICES, " ",
            "WHERE  round = $1 ",
            "AND    game  = $2 ",
            "ORDER  BY player"
        );
        self.read(SQL, &[&round, &game], choice).await
    }

    async fn roundup(&self, round: Round, game: GameId) -> Result<Option<Roundup>, StoreError> {
        const SQL: &str = concatcp!(
            "SELECT ", ROUNDUP_COLUMNS, " ",
            "FROM   ", ROUNDUPS, " ",
            "WHERE  round = $1 ",
            "AND    game  = $2"
        );
        Ok(self.read(SQL, &[&round, &game], roundup).await?.into_iter().next())
    }
    async fn insert_roundup(&self, r: &Roundup, payoffs: &[Payoff]) -> Result<Insert, StoreError> {
        const SQL: &str = concatcp!(
            "INSERT INTO ", ROUNDUPS, " (round, game, row_mix, col_mix, skip, count) ",
            "VALUES ($1, $2, $3, $4, $5, $6) ",
            "ON CONFLICT DO NOTHING"
        );
        const SETTLE: &str = concatcp!(
            "INSERT INTO ", PAYOFFS, " (round, player, game, value) ",
            "VALUES ($1, $2, $3, $4) ",
            "ON CONFLICT DO NOTHING"
        );
        let ref row = Vec::<String>::from(r.row());
        let ref col = Vec::<String>::from(r.col());
        let mut client = self.client.lock().await;
        let tx = begin(&mut client).await?;
        let inserted = tx
            .execute(SQL, &[&r.round(), &r.game(), row, col, &r.skip(), &r.count()])
            .await
            .map_err(classify)?;
        if inserted == 0 {
            return Ok(Insert::Conflict);
        }
        for p in payoffs {
            let ref value = p.value().to_string();
            tx.execute(SETTLE, &[&p.round(), &p.player(), &p.game(), value])
                .await
                .map_err(classify)?;
        }
        tx.commit().await.map_err(classify)?;
        Ok(Insert::Inserted)
    }

    async fn payoffs(&self, round: Round, player: PlayerId) -> Result<Vec<Payoff>, StoreError> {
        const SQL: &str = concatcp!(
            "SELECT ", PAYOFF_COLUMNS, " ",
            "FROM   ", PAYOFFS, " ",
            "WHERE  round  = $1 ",
            "AND    player = $2 ",
            "ORDER  BY game"
        );
        self.read(SQL, &[&round, &player], payoff).await
    }
    async fn entry(&self, round: Round, player: PlayerId) -> Result<Option<Entry>, StoreError> {
        const SQL: &str = concatcp!(
            "SELECT ", ENTRY_COLUMNS, " ",
            "FROM   ", LOTTERY, " ",
            "WHERE  round  = $1 ",
            "AND    player = $2"
        );
        Ok(self.read(SQL, &[&round, &player], entry).await?.into_iter().next())
    }
    async fn insert_entry(&self, e: &Entry) -> Result<Insert, StoreError> {
        const SQL: &str = concatcp!(
            "INSERT INTO ", LOTTERY, " (round, player, current, aggregate, tickets) ",
            "VALUES ($1, $2, $3, $4, $5) ",
            "ON CONFLICT DO NOTHING"
        );
        let ref current = e.current().to_string();
        let ref aggregate = e.aggregate().to_string();
        self.write(
            SQL,
            &[&e.round(), &e.player(), current, aggregate, &e.tickets()],
        )
        .await
    }

    async fn allotments(&self) -> Result<Vec<Allotment>, StoreError> {
        const SQL: &str = concatcp!(
            "SELECT ", ALLOTMENT_COLUMNS, " ",
            "FROM   ", ALLOTMENTS, " ",
            "ORDER  BY start, tickets, player"
        );
        self.read(SQL, &[], allotment).await
    }
    async fn winners(&self) -> Result<Vec<Winner>, StoreError> {
        const SQL: &str = concatcp!(
            "SELECT ", WINNER_COLUMNS, " ",
            "FROM   ", WINNERS, " ",
            "ORDER  BY rank NULLS LAST, player"
        );
        self.read(SQL, &[], winner).await
    }
}
