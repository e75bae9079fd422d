use super::scalar::Scalar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorEntry {
    pub timestamp: u64,
    pub value: f64,
}

impl VectorEntry {
    pub fn new(timestamp: u64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A time-ordered series of values plus the unit they are displayed in.
/// Filters map one vector to another; [`Vector::to_scalar`] ends the chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vector {
    entries: Vec<VectorEntry>,
    unit: String,
}

impl Vector {
    pub fn new(entries: Vec<VectorEntry>) -> Self {
        Self {
            entries,
            unit: String::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn entries(&self) -> &[VectorEntry] {
        &self.entries
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn oldest(&self) -> Option<&VectorEntry> {
        self.entries.first()
    }

    pub fn newest(&self) -> Option<&VectorEntry> {
        self.entries.last()
    }

    /// The most recent value, not an aggregate. Empty vectors are pending.
    pub fn to_scalar(&self) -> Scalar {
        match self.newest() {
            Some(entry) => Scalar::new(entry.value, self.unit.clone()),
            None => Scalar::pending(),
        }
    }
}

impl FromIterator<VectorEntry> for Vector {
    fn from_iter<I: IntoIterator<Item = VectorEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
