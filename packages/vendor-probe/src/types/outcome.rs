//! Tagged stage result.

/// Result of a pipeline stage that may legitimately produce nothing.
///
/// `Empty` is a normal outcome (no batches to run, nothing found) while
/// `Failure` means every attempt at the stage failed.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Empty,
    Failure(String),
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Empty => Outcome::Empty,
            Outcome::Failure(reason) => Outcome::Failure(reason),
        }
    }

    /// Success value, or `None` for empty and failed outcomes.
    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }
}
