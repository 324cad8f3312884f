use crate::*;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const PERIOD: Stamp = 600;

/// Prisoner's dilemma: (3,3) (0,5) / (5,0) (1,1).
fn dilemma(id: GameId) -> Game {
    matrix(id, [3, 3, 0, 5, 5, 0, 1, 1])
}
/// Coordination: (2,2) (0,0) / (0,0) (1,1).
fn coordination(id: GameId) -> Game {
    matrix(id, [2, 2, 0, 0, 0, 0, 1, 1])
}
fn matrix(id: GameId, cells: [i64; 8]) -> Game {
    Game::new(id, 2, 2, cells.into_iter().map(whole).collect()).unwrap()
}
fn mix(weights: &str) -> Mix {
    weights.parse().unwrap()
}
fn ratio(s: &str) -> Ratio {
    parse(s).unwrap()
}
fn quick() -> Backoff {
    Backoff::new(8, 2, Duration::from_millis(1), Duration::from_millis(2))
}

/// Configured, populated and started, with round 0 open since t = 0.
async fn running(
    lab: Lab<Memory>,
    experiment: Experiment,
    games: &[Game],
    players: &[PlayerId],
) -> Lab<Memory> {
    lab.configure(experiment).await.unwrap();
    for game in games {
        lab.add_game(game.clone()).await.unwrap();
    }
    for &player in players {
        lab.register(player, false).await.unwrap();
    }
    assert!(lab.start(0).await.unwrap());
    assert!(lab.advance(0).await.unwrap());
    lab
}

/// Seats `player` in `round` and submits the given mixes just after the round opens.
async fn play(lab: &Lab<Memory>, round: Round, player: PlayerId, role: Role, plays: &[(GameId, &str)]) {
    let now = round * PERIOD + 1;
    lab.admit(round, player, role, now).await.unwrap();
    for &(game, weights) in plays {
        lab.submit(round, player, game, mix(weights), now).await.unwrap();
    }
}

fn rejected(result: Result<impl std::fmt::Debug, Error>) -> Rejection {
    match result {
        Err(Error::Rejected(rejection)) => rejection,
        other => panic!("expected a rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn pure_strategies_average_to_themselves() {
    let lab = running(
        Lab::new(Memory::default()),
        Experiment::new(2, 10),
        &[dilemma(1), coordination(2)],
        &[1, 2],
    )
    .await;
    play(&lab, 0, 1, Role::Row, &[(1, "1,0"), (2, "1,0")]).await;
    play(&lab, 0, 2, Role::Col, &[(1, "1,0"), (2, "1,0")]).await;
    assert!(lab.advance(PERIOD).await.unwrap());

    for game in [1, 2] {
        let roundup = lab.ensure_roundup(0, game).await.unwrap();
        assert_eq!(roundup.row(), &mix("1,0"));
        assert_eq!(roundup.col(), &mix("1,0"));
        assert!(!roundup.skip());
        assert_eq!(roundup.count(), 1);
    }
    let standing = lab.standing(1, PERIOD).await.unwrap();
    assert_eq!(standing.round(), 0);
    assert_eq!(standing.current(), &whole(5));
    assert_eq!(standing.tickets(), 5);
}

#[tokio::test]
async fn missing_row_role_is_skipped_and_zeroed() {
    let lab = running(
        Lab::new(Memory::default()),
        Experiment::new(2, 10),
        &[dilemma(1)],
        &[1, 2],
    )
    .await;
    play(&lab, 0, 2, Role::Col, &[(1, "0,1")]).await;
    lab.advance(PERIOD).await.unwrap();

    let roundup = lab.ensure_roundup(0, 1).await.unwrap();
    assert!(roundup.skip());
    assert!(roundup.row().is_zero());
    assert_eq!(roundup.col(), &mix("0,1"));
    assert_eq!(roundup.count(), 0);
    assert_eq!(lab.standing(2, PERIOD).await.unwrap().aggregate(), &whole(0));
}

#[tokio::test]
async fn partial_round_contributes_nothing() {
    let lab = running(
        Lab::new(Memory::default()),
        Experiment::new(2, 10),
        &[dilemma(1), coordination(2)],
        &[1, 2],
    )
    .await;
    play(&lab, 0, 1, Role::Row, &[(1, "1,0"), (2, "1,0")]).await;
    play(&lab, 0, 2, Role::Col, &[(1, "1,0"), (2, "1,0")]).await;
    lab.advance(PERIOD).await.unwrap();
    play(&lab, 1, 1, Role::Row, &[(1, "0,1")]).await;
    play(&lab, 1, 2, Role::Col, &[(1, "1,0"), (2, "1,0")]).await;
    lab.advance(2 * PERIOD).await.unwrap();

    let before = lab.lottery_for(0, 1).await.unwrap();
    let after = lab.lottery_for(1, 1).await.unwrap();
    assert_eq!(after.current(), &whole(0));
    assert_eq!(after.aggregate(), before.aggregate());
    assert_eq!(after.tickets(), before.tickets());
    let ref store = lab.store();
    assert_eq!(store.payoffs(1, 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn negative_tickets_are_lifted_to_zero() {
    let lab = running(
        Lab::new(Memory::default()),
        Experiment::new(1, 10),
        &[matrix(1, [-5, 2, -5, 2, -5, 2, -5, 2])],
        &[1, 2, 3],
    )
    .await;
    play(&lab, 0, 1, Role::Row, &[(1, "1,0")]).await;
    play(&lab, 0, 2, Role::Col, &[(1, "1,0")]).await;
    lab.advance(PERIOD).await.unwrap();

    assert_eq!(lab.lottery_for(0, 1).await.unwrap().tickets(), -5);
    assert!(lab.finish().await.unwrap());
    let line = lab.store().allotments().await.unwrap();
    let tickets = line
        .iter()
        .map(|a| (a.player(), a.tickets()))
        .collect::<BTreeMap<_, _>>();
    assert_eq!(tickets, BTreeMap::from([(1, 0), (2, 7), (3, 5)]));
    let experiment = lab.experiment().await.unwrap();
    assert_eq!(experiment.phase(), Phase::Prewin);
    assert_eq!(experiment.total(), Some(12));
    assert_eq!(Allotment::total(&line), 12);
}

#[tokio::test]
async fn aggregates_never_decrease() {
    let lab = running(
        Lab::new(Memory::default()),
        Experiment::new(3, 10),
        &[dilemma(1), coordination(2)],
        &[1, 2, 3],
    )
    .await;
    let plays = [("1,0", "0,1"), ("1/3,2/3", "1/2,1/2"), ("0,1", "1,0")];
    for (round, (row, col)) in plays.into_iter().enumerate() {
        let round = round as Round;
        play(&lab, round, 1, Role::Row, &[(1, row), (2, row)]).await;
        play(&lab, round, 2, Role::Col, &[(1, col), (2, col)]).await;
        if round == 1 {
            play(&lab, round, 3, Role::Row, &[(2, col)]).await;
        }
        lab.advance((round + 1) * PERIOD).await.unwrap();
    }
    assert!(lab.experiment().await.unwrap().is_finished());
    for player in [1, 2, 3] {
        let mut prev = Entry::genesis(player);
        for round in 0..3 {
            let entry = lab.lottery_for(round, player).await.unwrap();
            assert!(entry.aggregate() >= prev.aggregate());
            assert_eq!(entry.aggregate(), &(prev.aggregate() + entry.current()));
            prev = entry;
        }
    }
}

#[tokio::test]
async fn roundups_are_idempotent() {
    let lab = running(
        Lab::new(Memory::default()),
        Experiment::new(2, 10),
        &[dilemma(1)],
        &[1, 2],
    )
    .await;
    play(&lab, 0, 1, Role::Row, &[(1, "1/4,3/4")]).await;
    play(&lab, 0, 2, Role::Col, &[(1, "2/3,1/3")]).await;
    lab.advance(PERIOD).await.unwrap();

    let first = lab.ensure_roundup(0, 1).await.unwrap();
    let payoffs = lab.store().payoff_count();
    let second = lab.ensure_roundup(0, 1).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(lab.store().roundup_count(), 1);
    assert_eq!(lab.store().payoff_count(), payoffs);
    assert_eq!(payoffs, 2);
}

#[tokio::test]
async fn later_roundups_fill_earlier_ones() {
    let lab = running(
        Lab::new(Memory::default()),
        Experiment::new(3, 10),
        &[dilemma(1)],
        &[1, 2],
    )
    .await;
    play(&lab, 0, 1, Role::Row, &[(1, "1,0")]).await;
    play(&lab, 0, 2, Role::Col, &[(1, "1,0")]).await;
    lab.advance(PERIOD).await.unwrap();
    play(&lab, 1, 2, Role::Col, &[(1, "0,1")]).await;
    lab.advance(2 * PERIOD).await.unwrap();
    play(&lab, 2, 1, Role::Row, &[(1, "0,1")]).await;
    play(&lab, 2, 2, Role::Col, &[(1, "0,1")]).await;
    lab.advance(3 * PERIOD).await.unwrap();

    let last = lab.ensure_roundup(2, 1).await.unwrap();
    assert_eq!(lab.store().roundup_count(), 3);
    assert_eq!(last.count(), 2);
    let history = lab.history(1, 3 * PERIOD).await.unwrap();
    assert_eq!(
        history.iter().map(Roundup::skip).collect::<Vec<_>>(),
        vec![false, true, false]
    );
    assert_eq!(history[2], last);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_roundups_persist_once() {
    let lab = running(
        Lab::new(Memory::default()),
        Experiment::new(2, 10),
        &[dilemma(1)],
        &[1, 2, 3],
    )
    .await;
    play(&lab, 0, 1, Role::Row, &[(1, "1,0")]).await;
    play(&lab, 0, 2, Role::Col, &[(1, "1/2,1/2")]).await;
    play(&lab, 0, 3, Role::Col, &[(1, "0,1")]).await;
    lab.advance(PERIOD).await.unwrap();

    let lab = Arc::new(lab);
    let handles = (0..8)
        .map(|_| {
            let lab = lab.clone();
            tokio::spawn(async move { lab.ensure_roundup(0, 1).await })
        })
        .collect::<Vec<_>>();
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }
    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(results[0].col(), &mix("1/4,3/4"));
    assert_eq!(lab.store().roundup_count(), 1);
    assert_eq!(lab.store().payoff_count(), 3);
}

#[tokio::test]
async fn stale_reads_fall_back_to_persisted_values() {
    let lab = running(
        Lab::new(Memory::default()),
        Experiment::new(2, 10),
        &[dilemma(1)],
        &[1, 2],
    )
    .await;
    play(&lab, 0, 1, Role::Row, &[(1, "1,0")]).await;
    play(&lab, 0, 2, Role::Col, &[(1, "1,0")]).await;
    lab.advance(PERIOD).await.unwrap();

    let roundup = lab.ensure_roundup(0, 1).await.unwrap();
    let entry = lab.lottery_for(0, 1).await.unwrap();
    lab.store().stale(1);
    assert_eq!(lab.ensure_roundup(0, 1).await.unwrap(), roundup);
    lab.store().stale(1);
    assert_eq!(lab.lottery_for(0, 1).await.unwrap(), entry);
    assert_eq!(lab.store().roundup_count(), 1);
    assert_eq!(lab.store().payoff_count(), 2);
}

#[tokio::test]
async fn ledger_after_foreign_roundup_sees_its_payoffs() {
    let lab = running(
        Lab::new(Memory::default()),
        Experiment::new(2, 10),
        &[dilemma(1)],
        &[1, 2],
    )
    .await;
    play(&lab, 0, 1, Role::Row, &[(1, "1,0")]).await;
    play(&lab, 0, 2, Role::Col, &[(1, "1,0")]).await;
    lab.advance(PERIOD).await.unwrap();

    let store = lab.store();
    let game = dilemma(1);
    let choices = store.choices(0, 1).await.unwrap();
    let roundup = Roundup::aggregate(0, &game, 0, &choices, |_| true).unwrap();
    let payoffs = Payoff::settle(&roundup, &game, &choices).unwrap();
    assert_eq!(
        store.insert_roundup(&roundup, &payoffs).await,
        Ok(Insert::Inserted)
    );

    let entry = lab.lottery_for(0, 1).await.unwrap();
    assert_eq!(entry.current(), &whole(3));
    assert_eq!(lab.lottery_for(0, 2).await.unwrap().current(), &whole(3));
    assert_eq!(store.roundup_count(), 1);
    assert_eq!(store.payoff_count(), 2);
}

#[tokio::test]
async fn failed_roundup_write_leaves_nothing_behind() {
    let lab = running(
        Lab::with_backoff(Memory::default(), quick()),
        Experiment::new(2, 10),
        &[dilemma(1)],
        &[1, 2],
    )
    .await;
    play(&lab, 0, 1, Role::Row, &[(1, "1,0")]).await;
    play(&lab, 0, 2, Role::Col, &[(1, "1,0")]).await;
    lab.advance(PERIOD).await.unwrap();

    lab.store().jammed(8);
    assert!(matches!(
        lab.ensure_roundup(0, 1).await,
        Err(Error::Contention { .. })
    ));
    assert_eq!(lab.store().roundup_count(), 0);
    assert_eq!(lab.store().payoff_count(), 0);

    assert_eq!(lab.ensure_roundup(0, 1).await.unwrap().count(), 1);
    assert_eq!(lab.store().payoff_count(), 2);
    assert_eq!(lab.lottery_for(0, 1).await.unwrap().current(), &whole(3));
}

#[tokio::test]
async fn busy_store_is_retried_then_surfaces() {
    let lab = running(
        Lab::with_backoff(Memory::default(), quick()),
        Experiment::new(2, 10),
        &[dilemma(1)],
        &[1, 2],
    )
    .await;
    play(&lab, 0, 1, Role::Row, &[(1, "1,0")]).await;
    play(&lab, 0, 2, Role::Col, &[(1, "1,0")]).await;

    lab.store().flaky(3);
    assert!(lab.advance(PERIOD).await.unwrap());
    lab.store().flaky(100);
    match lab.ensure_roundup(0, 1).await {
        Err(Error::Contention { attempts, .. }) => assert_eq!(attempts, 8),
        other => panic!("expected contention, got {:?}", other),
    }
    lab.store().flaky(0);
    assert_eq!(lab.ensure_roundup(0, 1).await.unwrap().count(), 1);
}

#[tokio::test]
async fn unnormalized_mixes_are_taken_as_sent() {
    let lab = running(
        Lab::new(Memory::default()),
        Experiment::new(1, 10),
        &[dilemma(1)],
        &[1, 2],
    )
    .await;
    play(&lab, 0, 1, Role::Row, &[(1, "2,0")]).await;
    play(&lab, 0, 2, Role::Col, &[(1, "1,0")]).await;
    lab.advance(PERIOD).await.unwrap();

    assert_eq!(lab.ensure_roundup(0, 1).await.unwrap().row(), &mix("2,0"));
    assert_eq!(lab.lottery_for(0, 1).await.unwrap().aggregate(), &whole(6));
    assert_eq!(lab.lottery_for(0, 2).await.unwrap().aggregate(), &whole(6));
}

#[tokio::test]
async fn fractional_payoffs_round_up() {
    let lab = running(
        Lab::new(Memory::default()),
        Experiment::new(1, 10),
        &[dilemma(1)],
        &[1, 2],
    )
    .await;
    play(&lab, 0, 1, Role::Row, &[(1, "1,0")]).await;
    play(&lab, 0, 2, Role::Col, &[(1, "1/3,2/3")]).await;
    lab.advance(PERIOD).await.unwrap();

    let entry = lab.lottery_for(0, 1).await.unwrap();
    assert_eq!(entry.aggregate(), &ratio("1"));
    let entry = lab.lottery_for(0, 2).await.unwrap();
    assert_eq!(entry.aggregate(), &ratio("13/3"));
    assert_eq!(entry.tickets(), 5);
}

#[tokio::test]
async fn draws_are_reproducible_and_distinct() {
    let lab = running(
        Lab::new(Memory::default()),
        Experiment::new(1, 10),
        &[dilemma(1)],
        &[1, 2, 3, 4],
    )
    .await;
    play(&lab, 0, 1, Role::Row, &[(1, "1,0")]).await;
    play(&lab, 0, 2, Role::Row, &[(1, "0,1")]).await;
    play(&lab, 0, 3, Role::Col, &[(1, "1,0")]).await;
    play(&lab, 0, 4, Role::Col, &[(1, "1/2,1/2")]).await;
    lab.advance(PERIOD).await.unwrap();

    assert!(lab.finalize_and_draw(3, 42).await.unwrap());
    let outcome = lab.winners().await.unwrap();
    let line = lab.store().allotments().await.unwrap();
    assert_eq!(Draw::new(&line, 42).winners(3).unwrap(), outcome);
    assert_eq!(outcome.len(), 4);

    let winners = outcome.iter().filter(|w| w.is_winner()).collect::<Vec<_>>();
    assert_eq!(winners.len(), 3);
    let distinct = winners.iter().map(|w| w.player()).collect::<BTreeSet<_>>();
    assert_eq!(distinct.len(), 3);
    for (rank, winner) in winners.iter().enumerate() {
        assert_eq!(winner.rank(), Some(rank));
        let ticket = winner.ticket().unwrap();
        assert!(
            line.iter()
                .any(|a| a.player() == winner.player() && a.contains(ticket))
        );
    }

    assert!(!lab.draw(3, 7).await.unwrap());
    assert!(!lab.finish().await.unwrap());
    assert_eq!(lab.winners().await.unwrap(), outcome);
    assert_eq!(lab.experiment().await.unwrap().phase(), Phase::Postwin);
}

#[tokio::test]
async fn panel_players_hold_no_tickets() {
    let lab = running(
        Lab::new(Memory::default()),
        Experiment::new(1, 10),
        &[dilemma(1)],
        &[1, 2],
    )
    .await;
    lab.register(3, true).await.unwrap();
    play(&lab, 0, 1, Role::Row, &[(1, "1,0")]).await;
    play(&lab, 0, 3, Role::Col, &[(1, "1,0")]).await;
    lab.advance(PERIOD).await.unwrap();

    assert!(lab.finish().await.unwrap());
    let line = lab.store().allotments().await.unwrap();
    assert!(line.iter().all(|a| a.player() != 3));
    assert_eq!(line.len(), 2);
}

#[tokio::test]
async fn lottery_off_finishes_without_tickets() {
    let lab = running(
        Lab::new(Memory::default()),
        Experiment::new(1, 10).with_lottery(false),
        &[dilemma(1)],
        &[1, 2],
    )
    .await;
    play(&lab, 0, 1, Role::Row, &[(1, "1,0")]).await;
    play(&lab, 0, 2, Role::Col, &[(1, "1,0")]).await;
    lab.advance(PERIOD).await.unwrap();

    assert!(lab.finish().await.unwrap());
    assert_eq!(lab.experiment().await.unwrap().total(), Some(0));
    assert!(lab.store().allotments().await.unwrap().is_empty());
    assert_eq!(rejected(lab.draw(1, 1).await), Rejection::LotteryDisabled);
    assert_eq!(lab.standing(1, PERIOD).await.unwrap().tickets(), 3);
}

#[tokio::test]
async fn participation_closes_round_early() {
    let lab = running(
        Lab::new(Memory::default()),
        Experiment::new(3, 10).with_participation(100, 0),
        &[dilemma(1)],
        &[1, 2],
    )
    .await;
    play(&lab, 0, 1, Role::Row, &[(1, "1,0")]).await;
    play(&lab, 0, 2, Role::Col, &[(1, "1,0")]).await;

    assert!(lab.advance(60).await.unwrap());
    let experiment = lab.experiment().await.unwrap();
    assert_eq!(experiment.round(), 1);
    assert_eq!(experiment.began(), Some(60));
    assert!(!lab.advance(61).await.unwrap());
    assert!(matches!(lab.advance(30).await, Err(Error::Invariant(_))));
    assert_eq!(lab.experiment().await.unwrap().round(), 1);
}

#[tokio::test]
async fn time_closes_idle_rounds() {
    let lab = running(
        Lab::new(Memory::default()),
        Experiment::new(3, 10),
        &[dilemma(1)],
        &[1],
    )
    .await;
    assert!(!lab.advance(PERIOD - 1).await.unwrap());
    assert!(lab.advance(2 * PERIOD).await.unwrap());
    assert_eq!(lab.experiment().await.unwrap().round(), 2);
    assert!(lab.advance(100 * PERIOD).await.unwrap());
    assert_eq!(lab.experiment().await.unwrap().round(), 3);
    assert!(!lab.advance(200 * PERIOD).await.unwrap());
}

#[tokio::test]
async fn lifecycle_rejections() {
    let lab = Lab::new(Memory::default());
    assert_eq!(rejected(lab.experiment().await), Rejection::NotConfigured);
    lab.configure(Experiment::new(3, 10).with_prounds(2)).await.unwrap();
    assert_eq!(
        rejected(lab.configure(Experiment::new(3, 10)).await),
        Rejection::AlreadyConfigured
    );
    assert_eq!(rejected(lab.start(0).await), Rejection::NoGames);
    assert!(matches!(
        rejected(lab.configure(Experiment::new(0, 10)).await),
        Rejection::Malformed(_)
    ));
    lab.add_game(dilemma(1)).await.unwrap();
    assert_eq!(rejected(lab.add_game(dilemma(1)).await), Rejection::DuplicateGame(1));
    lab.register(1, false).await.unwrap();
    assert_eq!(rejected(lab.register(1, false).await), Rejection::AlreadyRegistered(1));
    assert_eq!(rejected(lab.finish().await), Rejection::NotStarted);
    assert!(lab.start(0).await.unwrap());
    assert!(!lab.start(5).await.unwrap());
    assert_eq!(rejected(lab.add_game(coordination(2)).await), Rejection::AlreadyStarted);
}

#[tokio::test]
async fn admission_and_submission_rejections() {
    let lab = running(
        Lab::new(Memory::default()),
        Experiment::new(3, 10).with_prounds(2),
        &[dilemma(1)],
        &[1, 2],
    )
    .await;
    assert_eq!(
        rejected(lab.admit(0, 9, Role::Row, 1).await),
        Rejection::UnknownPlayer(9)
    );
    assert_eq!(
        rejected(lab.submit(0, 1, 1, mix("1,0"), 1).await),
        Rejection::NotAdmitted { round: 0, player: 1 }
    );
    lab.admit(0, 1, Role::Row, 1).await.unwrap();
    lab.admit(1, 1, Role::Row, 1).await.unwrap();
    assert_eq!(
        rejected(lab.admit(2, 1, Role::Row, 1).await),
        Rejection::BudgetExhausted { player: 1, prounds: 2 }
    );
    lab.admit(0, 2, Role::Col, 1).await.unwrap();
    assert_eq!(
        rejected(lab.admit(0, 2, Role::Col, 1).await),
        Rejection::AlreadyAdmitted { round: 0, player: 2 }
    );
    assert_eq!(
        rejected(lab.admit(3, 2, Role::Col, 1).await),
        Rejection::WrongRound { round: 3, current: 0 }
    );
    assert_eq!(
        rejected(lab.submit(1, 1, 1, mix("1,0"), 1).await),
        Rejection::WrongRound { round: 1, current: 0 }
    );
    assert_eq!(
        rejected(lab.submit(0, 1, 9, mix("1,0"), 1).await),
        Rejection::UnknownGame(9)
    );
    assert!(matches!(
        rejected(lab.submit(0, 1, 1, mix("1,0,0"), 1).await),
        Rejection::Malformed(_)
    ));
    lab.submit(0, 1, 1, mix("1,0"), 1).await.unwrap();
    assert_eq!(
        rejected(lab.submit(0, 1, 1, mix("0,1"), 2).await),
        Rejection::AlreadySubmitted { round: 0, player: 1, game: 1 }
    );
    assert_eq!(
        rejected(lab.ensure_roundup(0, 1).await),
        Rejection::RoundOpen { round: 0 }
    );
    assert_eq!(
        rejected(lab.finish().await),
        Rejection::RoundsIncomplete { round: 0, rounds: 3 }
    );
    assert_eq!(rejected(lab.draw(1, 1).await), Rejection::NotFinished);
    assert_eq!(
        rejected(lab.submit(0, 2, 1, mix("1,0"), PERIOD).await),
        Rejection::WrongRound { round: 0, current: 1 }
    );
}
