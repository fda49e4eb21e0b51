use crate::error::SdkError;

/// One item a batch operation skipped.
#[derive(Debug)]
pub struct BatchFailure {
    /// The external key when it is known, otherwise the item's position.
    pub subject: String,
    pub error: SdkError,
}

/// Outcome of a batch operation: what went through, and what was skipped.
///
/// A failing item never aborts the batch; it is recorded here and the
/// operation moves on.
#[derive(Debug)]
pub struct BatchReport<T> {
    items: Vec<T>,
    failures: Vec<BatchFailure>,
}

impl<T> BatchReport<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub(crate) fn fail(&mut self, subject: impl Into<String>, error: impl Into<SdkError>) {
        self.failures.push(BatchFailure {
            subject: subject.into(),
            error: error.into(),
        });
    }

    /// Append another report's items and failures.
    pub(crate) fn absorb(&mut self, other: BatchReport<T>) {
        self.items.extend(other.items);
        self.failures.extend(other.failures);
    }

    /// Number of items that went through.
    pub fn succeeded(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if no item failed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn failures(&self) -> &[BatchFailure] {
        &self.failures
    }
}
