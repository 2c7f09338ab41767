use thiserror::Error;

/// Malformed or unsupported authentication context in a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{raw} is not a valid VoT")]
    InvalidVot { raw: String },
    #[error("{raw} contains unsupported component {component}")]
    UnsupportedComponent { raw: String, component: String },
    #[error("{raw} contains conflicting {category} components")]
    ConflictingComponents { raw: String, category: &'static str },
    #[error("{raw} contains no supported ACR values")]
    UnknownAcrValues { raw: String },
    #[error("invalid vtr parameter: {reason}")]
    InvalidVtr { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("unsupported component: {raw_code}")]
    UnsupportedComponent { raw_code: String },
    #[error("{issuer} is not authorized to request {requested}")]
    Unauthorized {
        issuer: String,
        requested: &'static str,
    },
}

impl Error {
    /// Offending raw request value, when the error came from parsing.
    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Parse(
                ParseError::InvalidVot { raw }
                | ParseError::UnsupportedComponent { raw, .. }
                | ParseError::ConflictingComponents { raw, .. }
                | ParseError::UnknownAcrValues { raw },
            ) => Some(raw),
            Self::UnsupportedComponent { raw_code } => Some(raw_code),
            Self::Parse(ParseError::InvalidVtr { .. }) | Self::Unauthorized { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_render_offending_input() {
        let err = ParseError::InvalidVot {
            raw: "C1..C2".to_string(),
        };
        assert_eq!(err.to_string(), "C1..C2 is not a valid VoT");

        let err = ParseError::UnsupportedComponent {
            raw: "C1.D3".to_string(),
            component: "D3".to_string(),
        };
        assert_eq!(err.to_string(), "C1.D3 contains unsupported component D3");
    }

    #[test]
    fn raw_is_exposed_for_parse_errors_only() {
        let err = Error::from(ParseError::UnknownAcrValues {
            raw: "unknown-acr-value".to_string(),
        });
        assert_eq!(err.raw(), Some("unknown-acr-value"));

        let err = Error::Unauthorized {
            issuer: "urn:gov:gsa:openidconnect:sp:test".to_string(),
            requested: "ialmax",
        };
        assert_eq!(err.raw(), None);
    }
}
