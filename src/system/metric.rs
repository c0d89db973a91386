use serde::{Serialize, Serializer};

/// Outcome of querying one snapshot field.
///
/// A failed query degrades only its own field; the rest of the snapshot is
/// still collected. Unavailable fields serialize as `null`.
#[derive(Clone, Debug, PartialEq)]
pub enum Metric<T> {
    Value(T),
    Unavailable(String),
}

impl<T> Metric<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Metric::Unavailable(reason.into())
    }

    pub fn from_option(value: Option<T>, reason: &str) -> Self {
        match value {
            Some(v) => Metric::Value(v),
            None => Metric::Unavailable(reason.to_string()),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Metric::Value(v) => Some(v),
            Metric::Unavailable(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Metric::Value(v) => Some(v),
            Metric::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Metric::Value(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Metric::Value(_) => None,
            Metric::Unavailable(reason) => Some(reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Metric<U> {
        match self {
            Metric::Value(v) => Metric::Value(f(v)),
            Metric::Unavailable(reason) => Metric::Unavailable(reason),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Metric<U>) -> Metric<U> {
        match self {
            Metric::Value(v) => f(v),
            Metric::Unavailable(reason) => Metric::Unavailable(reason),
        }
    }
}

impl<T: Serialize> Serialize for Metric<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Value(v) => v.serialize(serializer),
            Metric::Unavailable(_) => serializer.serialize_none(),
        }
    }
}
