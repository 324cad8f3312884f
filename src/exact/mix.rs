use crate::*;
use num_traits::Zero;

/// A mixed strategy: one exact weight per available action.
///
/// Submitted mixes are expected to be non-negative and sum to one, but that
/// is the submitter's contract. Nothing here re-normalizes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Mix(Vec<Ratio>);

impl Mix {
    pub fn zeros(n: usize) -> Self {
        Self(vec![Ratio::zero(); n])
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn weights(&self) -> &[Ratio] {
        &self.0
    }
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(Zero::is_zero)
    }
    /// Componentwise sum. Lengths must agree.
    pub fn accumulate(&mut self, other: &Mix) -> Result<(), Error> {
        if self.len() != other.len() {
            return Err(Error::invariant(format!(
                "cannot add mix of width {} to width {}",
                other.len(),
                self.len()
            )));
        }
        self.0
            .iter_mut()
            .zip(other.0.iter())
            .for_each(|(a, b)| *a += b);
        Ok(())
    }
    /// Divides every weight by `n` contributors.
    pub fn mean(self, n: usize) -> Self {
        let ref n = whole(n as i64);
        Self(self.0.into_iter().map(|w| w / n).collect())
    }
    /// Expected value of this mix against a per-action value vector.
    pub fn dot(&self, values: &[Ratio]) -> Result<Ratio, Error> {
        if self.len() != values.len() {
            return Err(Error::invariant(format!(
                "mix of width {} against {} values",
                self.len(),
                values.len()
            )));
        }
        Ok(self
            .0
            .iter()
            .zip(values.iter())
            .map(|(w, v)| w * v)
            .fold(Ratio::zero(), |acc, x| acc + x))
    }
}

impl From<Vec<Ratio>> for Mix {
    fn from(weights: Vec<Ratio>) -> Self {
        Self(weights)
    }
}

impl TryFrom<&[String]> for Mix {
    type Error = Rejection;
    fn try_from(weights: &[String]) -> Result<Self, Self::Error> {
        weights
            .iter()
            .map(|w| parse(w))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl From<&Mix> for Vec<String> {
    fn from(mix: &Mix) -> Self {
        mix.0.iter().map(|w| w.to_string()).collect()
    }
}

impl std::str::FromStr for Mix {
    type Err = Rejection;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .filter(|w| !w.trim().is_empty())
            .map(parse)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl std::fmt::Display for Mix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let weights = self
            .0
            .iter()
            .map(|w| w.to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "[{}]", weights)
    }
}
