//! Three-valued answers for questions the source text may not settle.

use serde::Serialize;

/// A definite yes, a definite no, or "the text does not say".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Tristate {
    Yes,
    No,
    Unknown,
}

impl Tristate {
    /// `true` only for [`Tristate::Yes`].
    pub fn is_yes(self) -> bool {
        self == Tristate::Yes
    }

    /// `true` only for [`Tristate::No`].
    pub fn is_no(self) -> bool {
        self == Tristate::No
    }

    /// Collapse to a boolean, using `unknown_as` for [`Tristate::Unknown`].
    pub fn unwrap_or(self, unknown_as: bool) -> bool {
        match self {
            Tristate::Yes => true,
            Tristate::No => false,
            Tristate::Unknown => unknown_as,
        }
    }

    /// `Some(bool)` for definite answers, `None` for unknown.
    pub fn to_option(self) -> Option<bool> {
        match self {
            Tristate::Yes => Some(true),
            Tristate::No => Some(false),
            Tristate::Unknown => None,
        }
    }
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        if value {
            Tristate::Yes
        } else {
            Tristate::No
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bool() {
        assert_eq!(Tristate::from(true), Tristate::Yes);
        assert_eq!(Tristate::from(false), Tristate::No);
    }

    #[test]
    fn test_unwrap_or_only_affects_unknown() {
        assert!(Tristate::Yes.unwrap_or(false));
        assert!(!Tristate::No.unwrap_or(true));
        assert!(Tristate::Unknown.unwrap_or(true));
        assert!(!Tristate::Unknown.unwrap_or(false));
    }

    #[test]
    fn test_to_option() {
        assert_eq!(Tristate::Yes.to_option(), Some(true));
        assert_eq!(Tristate::No.to_option(), Some(false));
        assert_eq!(Tristate::Unknown.to_option(), None);
    }
}
