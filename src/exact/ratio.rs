use crate::*;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// Whole number as an exact rational.
pub fn whole(n: i64) -> Ratio {
    Ratio::from_integer(BigInt::from(n))
}

/// Parses `"p/q"` or `"p"` into an exact rational.
pub fn parse(s: &str) -> Result<Ratio, Rejection> {
    s.trim()
        .parse::<Ratio>()
        .map_err(|e| Rejection::Malformed(format!("{:?} is not a rational: {}", s, e)))
}

/// Rounds up to the next whole ticket.
///
/// This is the only place an exact rational becomes an integer. Fractional
/// payoff sums always round toward more tickets, never to nearest or down.
pub fn ceil(x: &Ratio) -> Result<Tickets, Error> {
    x.ceil()
        .to_integer()
        .to_i64()
        .ok_or_else(|| Error::invariant(format!("ticket count {} overflows", x)))
}
