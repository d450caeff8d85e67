use thiserror::Error;

/// Failures of the select / pivot / compare queries.
///
/// Unknown grades and subjects are not errors: they select nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("value column `{0}` is not in the dataset")]
    UnknownColumn(String),

    #[error("more than one row for school `{key}` and student group `{group}`")]
    DuplicateEntry { key: String, group: String },

    #[error("comparison needs two populated columns, found {found}")]
    MissingColumn { found: usize },
}
