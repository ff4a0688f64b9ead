//! Scalar collective reductions across cooperating processes.
//!
//! The serial communicator is rank 0 of a group of one and returns its input
//! from [`Communicator::sum`]. An in-process group runs each rank on its own
//! thread; every reduction is a blocking collective, so all members must
//! reach the same reductions in the same order.

use std::sync::{Arc, Barrier};

use num_complex::Complex64;
use parking_lot::Mutex;

/// Scalars that can be summed across ranks.
///
/// Values travel between ranks as two 64-bit words so integers stay exact.
pub trait Reducible: Copy + Send + 'static {
    fn zero() -> Self;
    fn add(self, other: Self) -> Self;
    fn encode(self) -> [u64; 2];
    fn decode(words: [u64; 2]) -> Self;
}

impl Reducible for f64 {
    fn zero() -> Self {
        0.0
    }
    fn add(self, other: Self) -> Self {
        self + other
    }
    fn encode(self) -> [u64; 2] {
        [self.to_bits(), 0]
    }
    fn decode(words: [u64; 2]) -> Self {
        f64::from_bits(words[0])
    }
}

impl Reducible for Complex64 {
    fn zero() -> Self {
        Complex64::new(0.0, 0.0)
    }
    fn add(self, other: Self) -> Self {
        self + other
    }
    fn encode(self) -> [u64; 2] {
        [self.re.to_bits(), self.im.to_bits()]
    }
    fn decode(words: [u64; 2]) -> Self {
        Complex64::new(f64::from_bits(words[0]), f64::from_bits(words[1]))
    }
}

macro_rules! impl_reducible_int {
    ($($ty:ty),*) => {
        $(
            impl Reducible for $ty {
                fn zero() -> Self {
                    0
                }
                fn add(self, other: Self) -> Self {
                    self + other
                }
                fn encode(self) -> [u64; 2] {
                    [self as u64, 0]
                }
                fn decode(words: [u64; 2]) -> Self {
                    words[0] as $ty
                }
            }
        )*
    };
}

impl_reducible_int!(i64, u64, usize);

struct Group {
    size: usize,
    slots: Mutex<Vec<[u64; 2]>>,
    barrier: Barrier,
}

/// Handle onto a reduction group; cheap to clone.
#[derive(Clone)]
pub struct Communicator {
    rank: usize,
    group: Option<Arc<Group>>,
}

impl std::fmt::Debug for Communicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Communicator")
            .field("rank", &self.rank)
            .field("size", &self.size())
            .finish()
    }
}

impl Default for Communicator {
    fn default() -> Self {
        Self::serial()
    }
}

impl Communicator {
    pub fn serial() -> Self {
        Self {
            rank: 0,
            group: None,
        }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.group.as_ref().map_or(1, |group| group.size)
    }

    pub fn is_serial(&self) -> bool {
        self.size() == 1
    }

    /// Global sum; blocks until every rank of the group contributed.
    ///
    /// Contributions are accumulated in rank order, so all ranks receive the
    /// same bits.
    pub fn sum<T: Reducible>(&self, value: T) -> T {
        let Some(group) = self.group.as_ref() else {
            return value;
        };
        group.slots.lock()[self.rank] = value.encode();
        group.barrier.wait();
        let total = group
            .slots
            .lock()
            .iter()
            .fold(T::zero(), |acc, words| acc.add(T::decode(*words)));
        // nobody may overwrite a slot before every rank has read the total
        group.barrier.wait();
        total
    }

    /// Whether `flag` is set on any rank.
    pub fn any(&self, flag: bool) -> bool {
        self.sum(usize::from(flag)) > 0
    }

    /// Global sum of a slice's squared entries.
    pub fn squared_norm(&self, values: &[f64]) -> f64 {
        self.sum(values.iter().map(|v| v * v).sum::<f64>())
    }

    /// Global dot product.
    pub fn dot(&self, a: &[f64], b: &[f64]) -> f64 {
        self.sum(a.iter().zip(b).map(|(x, y)| x * y).sum::<f64>())
    }
}

/// Communicators for `size` ranks that reduce through shared memory.
///
/// Hand one communicator to each thread; reductions block until all threads
/// arrive.
pub fn in_process_group(size: usize) -> Vec<Communicator> {
    assert!(size > 0, "a communicator group needs at least one rank");
    let group = Arc::new(Group {
        size,
        slots: Mutex::new(vec![[0, 0]; size]),
        barrier: Barrier::new(size),
    });
    (0..size)
        .map(|rank| Communicator {
            rank,
            group: Some(Arc::clone(&group)),
        })
        .collect()
}
