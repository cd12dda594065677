//! User try-on image kinds.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown [`ImageKind`].
#[derive(thiserror::Error, Debug, Clone)]
#[error("unknown image kind: {0}")]
pub struct ImageKindError(pub String);

/// The kind of a stored user photo.
///
/// A user keeps at most one photo of each kind; uploading a new one replaces
/// the previous photo of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    /// Head-to-toe photo, preferred for dresses and full outfits.
    #[default]
    FullBody,
    /// Waist-up photo, sufficient for tops.
    HalfBody,
}

impl ImageKind {
    /// The string form stored in the database and used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FullBody => "full_body",
            Self::HalfBody => "half_body",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ImageKind {
    type Err = ImageKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full_body" => Ok(Self::FullBody),
            "half_body" => Ok(Self::HalfBody),
            other => Err(ImageKindError(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_strings() {
        for kind in [ImageKind::FullBody, ImageKind::HalfBody] {
            assert_eq!(kind.as_str().parse::<ImageKind>().expect("parse"), kind);
        }
        assert!("selfie".parse::<ImageKind>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&ImageKind::FullBody).expect("serialize");
        assert_eq!(json, r#""full_body""#);
    }
}
