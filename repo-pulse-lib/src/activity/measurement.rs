use serde::{Serialize, Serializer};

/// A metric value together with how much of it was observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Measurement<T> {
    /// Every record in the window was seen
    Observed(T),

    /// The fetch limit was reached first, so the value is a lower bound
    Truncated(T),

    /// The records could not be fetched
    Unknown,
}

impl<T> Measurement<T> {
    /// The value, whether complete or a lower bound
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Observed(v) | Self::Truncated(v) => Some(v),
            Self::Unknown => None,
        }
    }

    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated(_))
    }

    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Measurement<U> {
        match self {
            Self::Observed(v) => Measurement::Observed(f(v)),
            Self::Truncated(v) => Measurement::Truncated(f(v)),
            Self::Unknown => Measurement::Unknown,
        }
    }

    pub(crate) fn new(value: T, truncated: bool) -> Self {
        if truncated { Self::Truncated(value) } else { Self::Observed(value) }
    }
}

/// Serializes as the bare value, or `null` when unknown
impl<T: Serialize> Serialize for Measurement<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value() {
        assert_eq!(Measurement::Observed(3).value(), Some(&3));
        assert_eq!(Measurement::Truncated(100).value(), Some(&100));
        assert_eq!(Measurement::<u64>::Unknown.value(), None);
    }

    #[test]
    fn test_zero_is_observed() {
        let m = Measurement::new(0_u64, false);
        assert_eq!(m, Measurement::Observed(0));
        assert!(!m.is_unknown());
    }

    #[test]
    fn test_map_keeps_tag() {
        assert_eq!(Measurement::Truncated(vec![1, 2]).map(|v| v.len()), Measurement::Truncated(2));
        assert_eq!(Measurement::<Vec<u8>>::Unknown.map(|v| v.len()), Measurement::Unknown);
    }

    #[test]
    fn test_serialize() {
        assert_eq!(serde_json::to_string(&Measurement::Observed(5)).unwrap(), "5");
        assert_eq!(serde_json::to_string(&Measurement::Truncated(5)).unwrap(), "5");
        assert_eq!(serde_json::to_string(&Measurement::<u64>::Unknown).unwrap(), "null");
    }
}
