use std::fmt;
use std::sync::Arc;

/// A loaded dataset, or the reason it could not be loaded.
#[derive(Debug, Clone)]
pub enum Dataset<T> {
    Available(Arc<T>),
    Unavailable(String),
}

impl<T> Dataset<T> {
    /// Turn a load result into a dataset, keeping the error text.
    pub fn from_result<E: fmt::Display>(result: Result<Arc<T>, E>) -> Self {
        match result {
            Ok(v) => Dataset::Available(v),
            Err(e) => Dataset::Unavailable(e.to_string()),
        }
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Dataset::Available(v) => Some(v.as_ref()),
            Dataset::Unavailable(_) => None,
        }
    }

    /// Run a section against the dataset, or report why it cannot run.
    pub fn section<R>(&self, f: impl FnOnce(&T) -> SectionOutcome<R>) -> SectionOutcome<R> {
        match self {
            Dataset::Available(v) => f(v.as_ref()),
            Dataset::Unavailable(reason) => SectionOutcome::Unavailable(format!("dataset unavailable: {}", reason)),
        }
    }
}

/// Result of one report section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionOutcome<T> {
    Ready(T),
    Unavailable(String),
}

impl<T> SectionOutcome<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            SectionOutcome::Ready(v) => Some(v),
            SectionOutcome::Unavailable(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SectionOutcome<U> {
        match self {
            SectionOutcome::Ready(v) => SectionOutcome::Ready(f(v)),
            SectionOutcome::Unavailable(r) => SectionOutcome::Unavailable(r),
        }
    }
}
