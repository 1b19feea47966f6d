use std::cmp::Ordering;

use ahash::RandomState;
use hashbrown::HashMap;

/// One parsed value. Values with at most one significant decimal are kept
/// exactly as tenths; everything else (more decimals, exponents, huge
/// magnitudes) falls back to `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    Tenths(i64),
    Float(f64),
}

impl Measurement {
    pub fn as_f64(self) -> f64 {
        match self {
            Measurement::Tenths(t) => t as f64 / 10.0,
            Measurement::Float(v) => v,
        }
    }

    /// Total order: exact values compare as integers, anything involving a
    /// float compares by `f64::total_cmp`, and on a tie the exact form
    /// sorts first.
    fn order(self, other: Measurement) -> Ordering {
        match (self, other) {
            (Measurement::Tenths(a), Measurement::Tenths(b)) => a.cmp(&b),
            _ => self
                .as_f64()
                .total_cmp(&other.as_f64())
                .then_with(|| self.is_float().cmp(&other.is_float())),
        }
    }

    fn is_float(self) -> bool {
        matches!(self, Measurement::Float(_))
    }
}

/// Running min/max/sum/count for one key. Only ever built from a first
/// observation, so `count >= 1` and `min <= max` always hold.
///
/// Exact values are summed as integer tenths, so the sum does not depend on
/// the order or grouping in which observations and partials are folded.
/// Float fallbacks are summed separately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accumulator {
    pub min: Measurement,
    pub max: Measurement,
    pub count: u64,
    sum_tenths: i128,
    sum_float: f64,
    floats: u64,
}

impl Accumulator {
    pub fn new(value: Measurement) -> Self {
        let mut acc = Accumulator {
            min: value,
            max: value,
            count: 0,
            sum_tenths: 0,
            sum_float: 0.0,
            floats: 0,
        };
        acc.add_to_sum(value);
        acc
    }

    #[inline]
    fn add_to_sum(&mut self, value: Measurement) {
        match value {
            Measurement::Tenths(t) => self.sum_tenths += t as i128,
            Measurement::Float(v) => {
                self.sum_float += v;
                self.floats += 1;
            }
        }
        self.count += 1;
    }

    #[inline]
    pub fn add(&mut self, value: Measurement) {
        if value.order(self.min) == Ordering::Less {
            self.min = value;
        }
        if value.order(self.max) == Ordering::Greater {
            self.max = value;
        }
        self.add_to_sum(value);
    }

    pub fn merge(&mut self, other: &Accumulator) {
        if other.min.order(self.min) == Ordering::Less {
            self.min = other.min;
        }
        if other.max.order(self.max) == Ordering::Greater {
            self.max = other.max;
        }
        self.sum_tenths += other.sum_tenths;
        self.sum_float += other.sum_float;
        self.floats += other.floats;
        self.count += other.count;
    }

    pub fn sum(&self) -> f64 {
        self.sum_tenths as f64 / 10.0 + self.sum_float
    }

    pub fn mean(&self) -> f64 {
        self.sum() / self.count as f64
    }

    /// The mean in tenths, rounded half away from zero, when every folded
    /// value was exact.
    pub fn mean_tenths(&self) -> Option<i128> {
        if self.floats > 0 {
            return None;
        }
        let count = self.count as i128;
        let (q, r) = (self.sum_tenths / count, self.sum_tenths % count);
        if 2 * r.abs() >= count {
            Some(q + self.sum_tenths.signum())
        } else {
            Some(q)
        }
    }
}

/// Key -> statistics. A worker's private partial result and the merged
/// global result share this type.
#[derive(Debug, Clone, Default)]
pub struct Aggregates {
    map: HashMap<Box<[u8]>, Accumulator, RandomState>,
}

/// One worker's private result.
pub type PartialResult = Aggregates;
/// The merged result over every range.
pub type GlobalResult = Aggregates;

impl Aggregates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Aggregates {
            map: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
        }
    }

    /// Folds one observation for `key`, allocating the key only the first
    /// time it is seen.
    #[inline]
    pub fn record(&mut self, key: &[u8], value: Measurement) {
        if let Some(acc) = self.map.get_mut(key) {
            acc.add(value);
        } else {
            self.map.insert(Box::from(key), Accumulator::new(value));
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<&Accumulator> {
        self.map.get(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Accumulator)> {
        self.map.iter().map(|(k, v)| (&**k, v))
    }

    /// Combines two results key by key; keys present on one side only are
    /// carried over unchanged.
    pub fn merge(self, other: Aggregates) -> Aggregates {
        // fold the smaller map into the larger one
        let (mut into, from) = if self.map.len() >= other.map.len() {
            (self, other)
        } else {
            (other, self)
        };
        for (key, acc) in from.map {
            match into.map.get_mut(&key) {
                Some(existing) => existing.merge(&acc),
                None => {
                    into.map.insert(key, acc);
                }
            }
        }
        into
    }
}

/// Reduces any number of partial results into one, in iteration order.
pub fn merge_all<I>(partials: I) -> GlobalResult
where
    I: IntoIterator<Item = PartialResult>,
{
    partials.into_iter().fold(Aggregates::new(), Aggregates::merge)
}
