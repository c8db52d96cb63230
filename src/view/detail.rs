use crate::api::{Exam, Fee, Student};
use crate::error::ResourceError;

/// One half of a detail view.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailSection<T> {
    NotRequested,
    Loaded(Vec<T>),
    Failed(ResourceError),
}

impl<T> DetailSection<T> {
    pub fn from_result(r: Result<Vec<T>, ResourceError>) -> Self {
        match r {
            Ok(v) => DetailSection::Loaded(v),
            Err(e) => DetailSection::Failed(e),
        }
    }

    pub fn is_loaded(&self) -> bool { matches!(self, DetailSection::Loaded(_)) }
}

/// Read-only aggregate of a student's exams and fees, fetched on demand and not cached.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub student: Student,
    pub exams: DetailSection<Exam>,
    pub fees: DetailSection<Fee>,
}
