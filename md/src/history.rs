/// Append-only record of sampled energies for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct RunHistory<T> {
    entries: Vec<T>,
}

impl<T> Default for RunHistory<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> RunHistory<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size for runs with a known upper bound on the sample count.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, entry: T) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.entries
    }
}

impl<'a, T> IntoIterator for &'a RunHistory<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// One periodic report of a dynamics run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergySample {
    /// Steps completed when the sample was taken
    pub step: usize,
    /// Potential energy per particle
    pub potential: f64,
    /// Kinetic energy per particle
    pub kinetic: f64,
    pub temperature: f64,
}

impl EnergySample {
    pub fn total(&self) -> f64 {
        self.potential + self.kinetic
    }
}
