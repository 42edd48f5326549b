//! Window reduction functions.
//!
//! Every reducer receives the valid values of a window (in arbitrary order) and returns `None` when there are none.
//! The slice is scratch space, reducers are allowed to reorder it.
//!
//! `majority`, `minority` and `unique_count` compare values for exact equality.
//! They are meant for categorical input, on continuous floating point data nearly every value is distinct
//! and the results reflect that (no rounding or binning is applied).

use itertools::{Itertools, MinMaxResult};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::{Error, Result};

/// Reduction function resolved from a [`Reducer`]
pub type ReduceFn = fn(&mut [f64]) -> Option<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Reducer {
    #[default]
    Mean,
    Median,
    Min,
    Max,
    Sum,
    Range,
    Variance,
    Std,
    Majority,
    Minority,
    UniqueCount,
}

impl Reducer {
    /// Resolves a reducer by its snake case name
    pub fn from_name(name: &str) -> Result<Self> {
        name.parse().map_err(|_| {
            Error::Configuration(format!(
                "Unknown reducer '{name}', expected one of: {}",
                Reducer::iter().join(", ")
            ))
        })
    }

    pub fn function(self) -> ReduceFn {
        match self {
            Reducer::Mean => mean,
            Reducer::Median => median,
            Reducer::Min => min,
            Reducer::Max => max,
            Reducer::Sum => sum,
            Reducer::Range => range,
            Reducer::Variance => variance,
            Reducer::Std => std_dev,
            Reducer::Majority => majority,
            Reducer::Minority => minority,
            Reducer::UniqueCount => unique_count,
        }
    }

    pub fn reduce(self, values: &mut [f64]) -> Option<f64> {
        (self.function())(values)
    }
}

pub fn mean(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    values.sort_unstable_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

pub fn min(values: &mut [f64]) -> Option<f64> {
    values.iter().copied().min_by(f64::total_cmp)
}

pub fn max(values: &mut [f64]) -> Option<f64> {
    values.iter().copied().max_by(f64::total_cmp)
}

pub fn sum(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    Some(values.iter().sum())
}

pub fn range(values: &mut [f64]) -> Option<f64> {
    match values.iter().copied().minmax_by(f64::total_cmp) {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(_) => Some(0.0),
        MinMaxResult::MinMax(min, max) => Some(max - min),
    }
}

/// Population variance (divides by N)
pub fn variance(values: &mut [f64]) -> Option<f64> {
    let avg = mean(values)?;
    Some(values.iter().map(|v| (v - avg) * (v - avg)).sum::<f64>() / values.len() as f64)
}

/// Population standard deviation
pub fn std_dev(values: &mut [f64]) -> Option<f64> {
    variance(values).map(f64::sqrt)
}

/// Sorts the values and returns the (value, count) pairs in ascending value order
fn value_counts(values: &mut [f64]) -> impl Iterator<Item = (f64, usize)> + '_ {
    values.sort_unstable_by(f64::total_cmp);
    values.chunk_by(|a, b| a == b).map(|run| (run[0], run.len()))
}

/// Most frequent value, ties resolve to the smallest value
pub fn majority(values: &mut [f64]) -> Option<f64> {
    value_counts(values)
        .fold(None, |best: Option<(f64, usize)>, (value, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((value, count)),
        })
        .map(|(value, _)| value)
}

/// Least frequent value, ties resolve to the smallest value
pub fn minority(values: &mut [f64]) -> Option<f64> {
    value_counts(values)
        .fold(None, |best: Option<(f64, usize)>, (value, count)| match best {
            Some((_, best_count)) if best_count <= count => best,
            _ => Some((value, count)),
        })
        .map(|(value, _)| value)
}

/// Number of distinct values
pub fn unique_count(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    Some(value_counts(values).count() as f64)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn reduce(reducer: Reducer, values: &[f64]) -> Option<f64> {
        let mut scratch = values.to_vec();
        reducer.reduce(&mut scratch)
    }

    #[test_log::test]
    fn reducer_values() {
        let values = [3.0, 1.0, 4.0, 2.0];

        assert_eq!(reduce(Reducer::Mean, &values), Some(2.5));
        assert_eq!(reduce(Reducer::Median, &values), Some(2.5));
        assert_eq!(reduce(Reducer::Min, &values), Some(1.0));
        assert_eq!(reduce(Reducer::Max, &values), Some(4.0));
        assert_eq!(reduce(Reducer::Sum, &values), Some(10.0));
        assert_eq!(reduce(Reducer::Range, &values), Some(3.0));
        assert_eq!(reduce(Reducer::Variance, &values), Some(1.25));
        assert_relative_eq!(reduce(Reducer::Std, &values).unwrap(), 1.118, epsilon = 1e-3);
        assert_eq!(reduce(Reducer::UniqueCount, &values), Some(4.0));
    }

    #[test]
    fn odd_median() {
        assert_eq!(reduce(Reducer::Median, &[7.0, -1.0, 3.0]), Some(3.0));
        assert_eq!(reduce(Reducer::Median, &[7.0]), Some(7.0));
    }

    #[test]
    fn majority_minority_tie_break() {
        let values = [2.0, 1.0, 2.0, 1.0];
        assert_eq!(reduce(Reducer::Majority, &values), Some(1.0));
        assert_eq!(reduce(Reducer::Minority, &values), Some(1.0));
    }

    #[test]
    fn majority_minority() {
        let values = [5.0, 3.0, 5.0, 9.0, 5.0, 3.0, 9.0, 7.0];
        assert_eq!(reduce(Reducer::Majority, &values), Some(5.0));
        assert_eq!(reduce(Reducer::Minority, &values), Some(7.0));
        assert_eq!(reduce(Reducer::UniqueCount, &values), Some(4.0));
    }

    #[test]
    fn single_value() {
        assert_eq!(reduce(Reducer::Range, &[4.0]), Some(0.0));
        assert_eq!(reduce(Reducer::Variance, &[4.0]), Some(0.0));
        assert_eq!(reduce(Reducer::Majority, &[4.0]), Some(4.0));
    }

    #[test]
    fn empty_input_is_missing() {
        for reducer in Reducer::iter() {
            assert_eq!(reduce(reducer, &[]), None, "{reducer}");
        }
    }

    #[test]
    fn wide_integers_do_not_overflow() {
        let values = [i32::MAX as f64; 9];
        assert_eq!(reduce(Reducer::Sum, &values), Some(9.0 * i32::MAX as f64));
        assert_eq!(reduce(Reducer::Variance, &values), Some(0.0));
    }

    #[test]
    fn names() {
        assert_eq!("mean".parse::<Reducer>().unwrap(), Reducer::Mean);
        assert_eq!("unique_count".parse::<Reducer>().unwrap(), Reducer::UniqueCount);
        assert_eq!("STD".parse::<Reducer>().unwrap(), Reducer::Std);
        assert!(matches!(Reducer::from_name("average"), Err(Error::Configuration(_))));
        assert_eq!(Reducer::UniqueCount.to_string(), "unique_count");
        assert_eq!(Reducer::iter().count(), 11);
    }
}
