use crate::*;

/// Per-role head count of one round: who is seated, and who has played
/// every game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Census {
    seated: [usize; 2],
    finished: [usize; 2],
}

impl Census {
    pub fn count(seats: &[Seat], games: usize) -> Self {
        seats.iter().fold(Self::default(), |mut census, seat| {
            let i = Self::index(seat.role());
            census.seated[i] += 1;
            census.finished[i] += seat.finished(games) as usize;
            census
        })
    }
    pub fn seated(&self, role: Role) -> usize {
        self.seated[Self::index(role)]
    }
    pub fn finished(&self, role: Role) -> usize {
        self.finished[Self::index(role)]
    }
    /// Whether both roles reached `pct` percent completion.
    /// `None` when either role has nobody seated, so there is nothing to judge.
    pub fn quorum(&self, pct: u32) -> Option<bool> {
        if Role::all().iter().any(|&r| self.seated(r) == 0) {
            return None;
        }
        Some(
            Role::all()
                .iter()
                .all(|&r| self.finished(r) * 100 >= pct as usize * self.seated(r)),
        )
    }
    fn index(role: Role) -> usize {
        match role {
            Role::Row => 0,
            Role::Col => 1,
        }
    }
}

impl Experiment {
    /// The round the experiment should be in at `now`.
    ///
    /// Participation wins when a census is given and both roles reached
    /// quorum; otherwise elapsed time decides. Never exceeds `rounds`. A
    /// result below the current round means the clock went backwards.
    pub fn target(&self, census: Option<&Census>, now: Stamp) -> Round {
        if let Some(true) = census.and_then(|c| c.quorum(self.round_pct())) {
            return (self.round() + 1).min(self.rounds());
        }
        let timed = match (self.began(), self.start()) {
            (Some(began), _) => self.round() + (now - began).div_euclid(self.period()),
            (None, Some(start)) if now >= start => (now - start).div_euclid(self.period()),
            (None, _) => self.round(),
        };
        timed.min(self.rounds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seats(roster: &[(Role, usize)]) -> Vec<Seat> {
        roster.iter()
            .enumerate()
            .map(|(i, &(role, done))| Seat::from((0, i as PlayerId, role, done)))
            .collect()
    }
    fn running(round: Round, began: Stamp) -> Experiment {
        let mut e = Experiment::new(4, 10).with_participation(75, 2);
        e.started(0);
        if round >= 0 {
            e.opened(round, began);
        }
        e
    }

    #[test]
    fn census_counts_by_role() {
        let c = Census::count(
            &seats(&[(Role::Row, 2), (Role::Row, 1), (Role::Col, 2), (Role::Col, 2)]),
            2,
        );
        assert_eq!(c.seated(Role::Row), 2);
        assert_eq!(c.finished(Role::Row), 1);
        assert_eq!(c.seated(Role::Col), 2);
        assert_eq!(c.finished(Role::Col), 2);
        assert_eq!(c.quorum(50), Some(true));
        assert_eq!(c.quorum(51), Some(false));
    }

    #[test]
    fn empty_role_has_no_quorum() {
        let c = Census::count(&seats(&[(Role::Row, 2)]), 2);
        assert_eq!(c.quorum(0), None);
        assert_eq!(c.quorum(100), None);
    }

    #[test]
    fn overcompleted_seat_is_not_finished() {
        let c = Census::count(&seats(&[(Role::Row, 3), (Role::Col, 2)]), 2);
        assert_eq!(c.finished(Role::Row), 0);
    }

    #[test]
    fn time_policy_from_start() {
        let e = running(-1, 0);
        assert_eq!(e.target(None, -5), -1);
        assert_eq!(e.target(None, 0), 0);
        assert_eq!(e.target(None, 599), 0);
        assert_eq!(e.target(None, 600), 1);
    }

    #[test]
    fn time_policy_from_began() {
        let e = running(1, 1_000);
        assert_eq!(e.target(None, 1_599), 1);
        assert_eq!(e.target(None, 1_600), 2);
        assert_eq!(e.target(None, 1_000 + 600 * 10), 4);
    }

    #[test]
    fn clock_regression_goes_backwards() {
        let e = running(2, 1_000);
        assert_eq!(e.target(None, 999), 1);
    }

    #[test]
    fn quorum_advances_one_round() {
        let e = running(1, 1_000);
        let all = Census::count(&seats(&[(Role::Row, 2), (Role::Col, 2)]), 2);
        assert_eq!(e.target(Some(&all), 1_200), 2);
        let some = Census::count(&seats(&[(Role::Row, 2), (Role::Col, 1)]), 2);
        assert_eq!(e.target(Some(&some), 1_200), 1);
        assert_eq!(e.target(Some(&some), 1_600), 2);
    }

    #[test]
    fn quorum_is_clamped() {
        let e = running(4, 1_000);
        let all = Census::count(&seats(&[(Role::Row, 2), (Role::Col, 2)]), 2);
        assert_eq!(e.target(Some(&all), 1_200), 4);
    }
}
