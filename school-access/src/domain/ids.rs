//! Identifier types for zones, stops and schools.

use std::fmt;

use serde::Serialize;

/// Error returned when an identifier is blank.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: identifier cannot be blank")]
pub struct InvalidId {
    kind: &'static str,
}

/// Defines an opaque, non-blank string identifier.
///
/// Surrounding whitespace is trimmed; anything else is kept verbatim since
/// upstream datasets use numeric codes, alphanumeric stop codes and free-text
/// school names interchangeably.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parse an identifier, rejecting blank input.
            pub fn new(s: impl AsRef<str>) -> Result<Self, InvalidId> {
                let trimmed = s.as_ref().trim();
                if trimmed.is_empty() {
                    return Err(InvalidId { kind: $kind });
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Code of an origin zone, e.g. an SA1 statistical area code.
    ZoneCode,
    "zone code"
);

string_id!(
    /// Identifier of a school-special stop.
    StopId,
    "stop id"
);

string_id!(
    /// Identifier of a school. The upstream datasets key schools by name.
    SchoolId,
    "school id"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_whitespace() {
        let code = ZoneCode::new("  80101100101 ").unwrap();
        assert_eq!(code.as_str(), "80101100101");
    }

    #[test]
    fn rejects_blank() {
        assert!(ZoneCode::new("").is_err());
        assert!(StopId::new("   ").is_err());
        let err = SchoolId::new("\t").unwrap_err();
        assert_eq!(err.to_string(), "invalid school id: identifier cannot be blank");
    }

    #[test]
    fn display_and_debug() {
        let stop = StopId::new("4021").unwrap();
        assert_eq!(format!("{stop}"), "4021");
        assert_eq!(format!("{stop:?}"), "StopId(4021)");
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = StopId::new("A1").unwrap();
        let b = StopId::new("B0").unwrap();
        assert!(a < b);
    }

    #[test]
    fn serializes_as_plain_string() {
        let school = SchoolId::new("Lyneham High School").unwrap();
        assert_eq!(
            serde_json::to_string(&school).unwrap(),
            "\"Lyneham High School\""
        );
    }
}
