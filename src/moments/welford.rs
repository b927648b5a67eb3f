//! Batched running mean and variance
//!
//! Tracks the running mean and sum of squared deviations of every slot of an
//! n-dimensional observation using Welford's numerically stable update.
//! Supports Chan's parallel merge and single-level rollback.

use ndarray::{ArrayBase, ArrayD, ArrayViewD, Axis, Data, Dimension, IxDyn, Zip};

use crate::array::{array_bytes, nan_like, Element};
use crate::history::History;
use crate::traits::{check_order, check_rank, check_shape, Accumulator, AccumulatorError, Result};

/// Per-slot first and second moments sharing one count
#[derive(Debug)]
struct Moments<A> {
    count: u64,
    mean: ArrayD<A>,
    /// Sum of squared deviations from the mean (M2), never normalized
    m2: ArrayD<A>,
}

impl<A: Clone> Clone for Moments<A> {
    fn clone(&self) -> Self {
        Self {
            count: self.count,
            mean: self.mean.clone(),
            m2: self.m2.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.count = source.count;
        self.mean.clone_from(&source.mean);
        self.m2.clone_from(&source.m2);
    }
}

impl<A: Element> Moments<A> {
    fn zeros(order: &[usize]) -> Self {
        Self {
            count: 0,
            mean: ArrayD::zeros(IxDyn(order)),
            m2: ArrayD::zeros(IxDyn(order)),
        }
    }

    fn order(&self) -> &[usize] {
        self.mean.shape()
    }

    /// Welford update with one observation of matching shape
    fn push(&mut self, x: ArrayViewD<'_, A>) {
        self.count += 1;
        let n = A::from_count(self.count);

        Zip::from(&mut self.mean)
            .and(&mut self.m2)
            .and(&x)
            .for_each(|mean, m2, &value| {
                let delta = value - *mean;
                *mean = *mean + delta / n;
                let delta2 = value - *mean;
                *m2 = *m2 + delta * delta2;
            });
    }

    /// Chan et al.'s parallel combination
    fn combine(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }

        if self.count == 0 {
            self.clone_from(other);
            return;
        }

        let count = self.count + other.count;
        let n = A::from_count(count);
        let n_a = A::from_count(self.count);
        let n_b = A::from_count(other.count);
        let weight = n_b / n;
        let cross = n_a * n_b / n;

        Zip::from(&mut self.mean)
            .and(&mut self.m2)
            .and(&other.mean)
            .and(&other.m2)
            .for_each(|mean, m2, &mean_b, &m2_b| {
                let delta = mean_b - *mean;
                *mean = *mean + delta * weight;
                *m2 = *m2 + m2_b + delta * delta * cross;
            });

        self.count = count;
    }

    fn heap_bytes(&self) -> usize {
        array_bytes(&self.mean) + array_bytes(&self.m2)
    }
}

/// Running mean and variance over batched observations
///
/// Every position of an observation is an independent slot with its own mean
/// and variance; all slots advance with one shared count. The observation
/// shape is bound by the first observation.
///
/// # Example
///
/// ```
/// use flowmoments::moments::Welford;
/// use flowmoments::traits::Accumulator;
/// use ndarray::array;
///
/// let mut w = Welford::<f64>::new();
/// w.add_all(&array![[0.0, 100.0], [1.0, 110.0], [2.0, 120.0], [3.0, 130.0], [4.0, 140.0]])
///     .unwrap();
///
/// assert_eq!(w.count(), 5);
/// assert_eq!(w.mean().unwrap(), array![2.0, 120.0].into_dyn());
/// assert_eq!(w.var_s().unwrap(), array![2.5, 250.0].into_dyn());
/// assert_eq!(w.var_p().unwrap(), array![2.0, 200.0].into_dyn());
/// ```
///
/// # Distributed Usage
///
/// ```
/// use flowmoments::moments::Welford;
/// use flowmoments::traits::Accumulator;
/// use ndarray::array;
///
/// // Each worker processes its shard
/// let mut a = Welford::<f64>::from_observations(&array![[0.0], [1.0], [2.0]]).unwrap();
/// let b = Welford::<f64>::from_observations(&array![[3.0], [4.0]]).unwrap();
///
/// a.merge(&b).unwrap();
/// assert_eq!(a.count(), 5);
/// assert!((a.mean().unwrap()[[0]] - 2.0).abs() < 1e-12);
/// ```
#[derive(Clone, Debug)]
pub struct Welford<A = f64> {
    /// `None` until the first observation binds the order
    state: Option<Moments<A>>,
    history: History<Option<Moments<A>>>,
}

impl<A: Element> Default for Welford<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Element> Welford<A> {
    /// Create an empty accumulator; the order is bound by the first observation
    pub fn new() -> Self {
        Self {
            state: None,
            history: History::default(),
        }
    }

    /// Create an accumulator seeded with the observations along axis 0 of `xs`
    pub fn from_observations<S, D>(xs: &ArrayBase<S, D>) -> Result<Self>
    where
        S: Data<Elem = A>,
        D: Dimension,
    {
        let mut welford = Self::new();
        welford.add_all(xs)?;
        Ok(welford)
    }

    /// Bind `order` on first use, otherwise require it to match
    fn bind(&mut self, order: &[usize]) -> Result<()> {
        if let Some(moments) = &self.state {
            return check_shape(moments.order(), order);
        }
        self.state = Some(Moments::zeros(order));
        Ok(())
    }

    /// Add one observation
    pub fn add<S, D>(&mut self, x: &ArrayBase<S, D>) -> Result<()>
    where
        S: Data<Elem = A>,
        D: Dimension,
    {
        let x = x.view().into_dyn();
        self.bind(x.shape())?;
        self.history.record(&self.state);

        if let Some(moments) = self.state.as_mut() {
            moments.push(x);
        }
        Ok(())
    }

    /// Add every observation along axis 0 of `xs`, in order
    ///
    /// The trailing shape is checked once up front, so either all observations
    /// are applied or none are. A single rollback undoes the whole batch.
    pub fn add_all<S, D>(&mut self, xs: &ArrayBase<S, D>) -> Result<()>
    where
        S: Data<Elem = A>,
        D: Dimension,
    {
        check_rank(1, xs.ndim())?;
        let xs = xs.view().into_dyn();
        self.bind(&xs.shape()[1..])?;
        self.history.record(&self.state);

        if let Some(moments) = self.state.as_mut() {
            for x in xs.axis_iter(Axis(0)) {
                moments.push(x);
            }
        }
        Ok(())
    }

    /// Add a sequence of observations, in order
    ///
    /// Not atomic: on a shape mismatch the observations before the offending
    /// one stay applied. The rollback snapshot is taken once, before the
    /// first observation, so [`rollback`](Accumulator::rollback) undoes the
    /// applied prefix. An empty sequence still records a snapshot, like an
    /// empty [`add_all`](Self::add_all).
    pub fn add_iter<'a, I>(&mut self, observations: I) -> Result<()>
    where
        I: IntoIterator<Item = ArrayViewD<'a, A>>,
    {
        let mut recorded = false;
        for x in observations {
            self.bind(x.shape())?;
            if !recorded {
                self.history.record(&self.state);
                recorded = true;
            }
            if let Some(moments) = self.state.as_mut() {
                moments.push(x);
            }
        }
        if !recorded {
            self.history.record(&self.state);
        }
        Ok(())
    }

    /// Running mean per slot
    pub fn mean(&self) -> Option<ArrayViewD<'_, A>> {
        self.state.as_ref().map(|m| m.mean.view())
    }

    /// Sample variance per slot (Bessel's correction)
    ///
    /// NaN in every slot while fewer than two observations have been added.
    pub fn var_s(&self) -> Option<ArrayD<A>> {
        self.state.as_ref().map(|m| {
            if m.count < 2 {
                nan_like(m.order())
            } else {
                &m.m2 / A::from_count(m.count - 1)
            }
        })
    }

    /// Population variance per slot
    ///
    /// NaN in every slot until the first observation has been added.
    pub fn var_p(&self) -> Option<ArrayD<A>> {
        self.state.as_ref().map(|m| {
            if m.count < 1 {
                nan_like(m.order())
            } else {
                &m.m2 / A::from_count(m.count)
            }
        })
    }

    /// Sample standard deviation per slot
    pub fn std_s(&self) -> Option<ArrayD<A>> {
        self.var_s().map(|v| v.mapv_into(A::sqrt))
    }

    /// Population standard deviation per slot
    pub fn std_p(&self) -> Option<ArrayD<A>> {
        self.var_p().map(|v| v.mapv_into(A::sqrt))
    }
}

impl<A: Element> Accumulator for Welford<A> {
    fn merge(&mut self, other: &Self) -> Result<&mut Self> {
        if let (Some(ours), Some(theirs)) = (&self.state, &other.state) {
            check_order(ours.order(), theirs.order())?;
        }
        self.history.record(&self.state);

        if let Some(theirs) = &other.state {
            match self.state.as_mut() {
                Some(ours) => ours.combine(theirs),
                None => self.state = Some(theirs.clone()),
            }
        }
        Ok(self)
    }

    fn rollback(&mut self) -> Result<()> {
        let previous = self.history.take().ok_or(AccumulatorError::NoHistory)?;
        self.state = previous;
        Ok(())
    }

    fn can_rollback(&self) -> bool {
        self.history.is_recorded()
    }

    fn clear(&mut self) {
        self.state = None;
        self.history.clear();
    }

    fn size_bytes(&self) -> usize {
        let live = self.state.as_ref().map_or(0, Moments::heap_bytes);
        let snapshot = self
            .history
            .get()
            .and_then(Option::as_ref)
            .map_or(0, Moments::heap_bytes);
        core::mem::size_of::<Self>() + live + snapshot
    }

    fn count(&self) -> u64 {
        self.state.as_ref().map_or(0, |m| m.count)
    }

    fn order(&self) -> Option<&[usize]> {
        self.state.as_ref().map(Moments::order)
    }
}
