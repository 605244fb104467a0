/// State of an asynchronous repository operation.
///
/// Streams of outcomes always start with `Loading` and end with exactly one
/// of `Success` or `Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Loading,
    Success(T),
    Error(String),
}

#[cfg(test)]
impl<T> Outcome<T> {
    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<crate::app::Result<T>> for Outcome<T> {
    fn from(result: crate::app::Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(e) => Outcome::Error(e.user_message()),
        }
    }
}
