//! Batched online covariance matrices
//!
//! Generalizes Welford's update from per-slot variances to per-slot
//! feature-by-feature covariance matrices. The trailing axis of an
//! observation is the feature axis; every position of the leading axes is an
//! independent batch slot with its own D x D matrix.

use ndarray::{ArrayBase, ArrayD, ArrayViewD, Axis, Data, Dimension, IxDyn, Zip};

use crate::array::{array_bytes, diagonal, outer, Element};
use crate::history::History;
use crate::traits::{check_order, check_rank, check_shape, Accumulator, AccumulatorError, Result};

/// Per-slot mean and population covariance sharing one count
#[derive(Debug)]
struct Moments<A> {
    count: u64,
    /// Shape `order`
    mean: ArrayD<A>,
    /// Shape `[..order, D]`, always divided by `count`
    cov: ArrayD<A>,
}

impl<A: Clone> Clone for Moments<A> {
    fn clone(&self) -> Self {
        Self {
            count: self.count,
            mean: self.mean.clone(),
            cov: self.cov.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.count = source.count;
        self.mean.clone_from(&source.mean);
        self.cov.clone_from(&source.cov);
    }
}

impl<A: Element> Moments<A> {
    /// Zeroed state for observations of `order`, which has at least one axis
    fn zeros(order: &[usize]) -> Self {
        let mut shape = order.to_vec();
        shape.push(order[order.len() - 1]);
        Self {
            count: 0,
            mean: ArrayD::zeros(IxDyn(order)),
            cov: ArrayD::zeros(IxDyn(&shape)),
        }
    }

    fn order(&self) -> &[usize] {
        self.mean.shape()
    }

    fn push(&mut self, observation: ArrayViewD<'_, A>) {
        self.count += 1;
        let n = A::from_count(self.count);
        let decay = A::from_count(self.count - 1) / n;

        let delta_prev = &observation - &self.mean;
        self.mean.zip_mut_with(&delta_prev, |mean, &delta| {
            *mean = *mean + delta / n;
        });
        let weighted_delta = (&observation - &self.mean) / n;

        // Symmetric per slot: both factors are multiples of one deviation
        let correction = outer(delta_prev.view(), weighted_delta.view());
        self.cov.zip_mut_with(&correction, |cov, &d| {
            *cov = *cov * decay + d;
        });
    }

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
        let count_corr = n_a * n_b / n;

        let mean_diff = &self.mean - &other.mean;
        let spread = outer(mean_diff.view(), mean_diff.view());

        Zip::from(&mut self.mean)
            .and(&other.mean)
            .for_each(|mean, &mean_b| {
                *mean = (*mean / n_b + mean_b / n_a) * count_corr;
            });
        Zip::from(&mut self.cov)
            .and(&other.cov)
            .and(&spread)
            .for_each(|cov, &cov_b, &s| {
                *cov = (*cov * n_a + cov_b * n_b + s * count_corr) / n;
            });

        self.count = count;
    }

    fn heap_bytes(&self) -> usize {
        array_bytes(&self.mean) + array_bytes(&self.cov)
    }
}

/// Running mean and covariance matrix over batched observations
///
/// The covariance is the population (biased) estimate and is kept divided by
/// the count after every update.
///
/// # Example
///
/// ```
/// use flowmoments::covariance::OnlineCovariance;
/// use flowmoments::traits::Accumulator;
/// use ndarray::array;
///
/// let mut oc = OnlineCovariance::<f64>::new();
/// oc.add(&array![0.0, 100.0]).unwrap();
/// oc.add(&array![1.0, 110.0]).unwrap();
///
/// assert_eq!(oc.count(), 2);
/// assert_eq!(oc.mean().unwrap(), array![0.5, 105.0].into_dyn());
/// assert_eq!(oc.cov().unwrap(), array![[0.25, 2.5], [2.5, 25.0]].into_dyn());
///
/// // Perfectly correlated features
/// let corr = oc.corrcoef().unwrap();
/// assert!((corr[[0, 1]] - 1.0).abs() < 1e-12);
/// ```
#[derive(Clone, Debug)]
pub struct OnlineCovariance<A = f64> {
    /// `None` until the first observation binds the order
    state: Option<Moments<A>>,
    history: History<Option<Moments<A>>>,
}

impl<A: Element> Default for OnlineCovariance<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Element> OnlineCovariance<A> {
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
        let mut online = Self::new();
        online.add_all(xs)?;
        Ok(online)
    }

    fn bind(&mut self, order: &[usize]) -> Result<()> {
        check_rank(1, order.len())?;
        if let Some(moments) = &self.state {
            return check_shape(moments.order(), order);
        }
        self.state = Some(Moments::zeros(order));
        Ok(())
    }

    /// Add one observation; its last axis holds the features
    pub fn add<S, D>(&mut self, observation: &ArrayBase<S, D>) -> Result<()>
    where
        S: Data<Elem = A>,
        D: Dimension,
    {
        let observation = observation.view().into_dyn();
        self.bind(observation.shape())?;
        self.history.record(&self.state);

        if let Some(moments) = self.state.as_mut() {
            moments.push(observation);
        }
        Ok(())
    }

    /// Add every observation along axis 0 of `xs`, in order
    ///
    /// Checked once up front; either all observations are applied or none.
    pub fn add_all<S, D>(&mut self, xs: &ArrayBase<S, D>) -> Result<()>
    where
        S: Data<Elem = A>,
        D: Dimension,
    {
        check_rank(2, xs.ndim())?;
        let xs = xs.view().into_dyn();
        self.bind(&xs.shape()[1..])?;
        self.history.record(&self.state);

        if let Some(moments) = self.state.as_mut() {
            for observation in xs.axis_iter(Axis(0)) {
                moments.push(observation);
            }
        }
        Ok(())
    }

    /// Add a sequence of observations, in order
    ///
    /// Not atomic: on error the observations before the offending one stay
    /// applied, and one rollback undoes all of them. An empty sequence still
    /// counts as a call for rollback.
    pub fn add_iter<'a, I>(&mut self, observations: I) -> Result<()>
    where
        I: IntoIterator<Item = ArrayViewD<'a, A>>,
    {
        let mut recorded = false;
        for observation in observations {
            self.bind(observation.shape())?;
            if !recorded {
                self.history.record(&self.state);
                recorded = true;
            }
            if let Some(moments) = self.state.as_mut() {
                moments.push(observation);
            }
        }
        if !recorded {
            self.history.record(&self.state);
        }
        Ok(())
    }

    /// Shape of the covariance array: the order with the feature size appended
    pub fn shape(&self) -> Option<&[usize]> {
        self.state.as_ref().map(|m| m.cov.shape())
    }

    /// Running mean per slot and feature
    pub fn mean(&self) -> Option<ArrayViewD<'_, A>> {
        self.state.as_ref().map(|m| m.mean.view())
    }

    /// Population covariance matrix per batch slot
    pub fn cov(&self) -> Option<ArrayViewD<'_, A>> {
        self.state.as_ref().map(|m| m.cov.view())
    }

    /// Population variance per slot and feature (the covariance diagonal)
    pub fn var(&self) -> Option<ArrayD<A>> {
        self.state.as_ref().map(|m| diagonal(&m.cov))
    }

    /// Pearson correlation matrix per batch slot
    ///
    /// `None` until at least one observation has been added. Features with
    /// zero variance produce NaN entries.
    pub fn corrcoef(&self) -> Option<ArrayD<A>> {
        let moments = self.state.as_ref().filter(|m| m.count >= 1)?;
        let variances = diagonal(&moments.cov);
        let denominator = outer(variances.view(), variances.view()).mapv_into(A::sqrt);
        Some(&moments.cov / &denominator)
    }
}

impl<A: Element> Accumulator for OnlineCovariance<A> {
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
