//! Connection status reported by camera channels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of one camera channel, as reported by its client.
///
/// Clients report plain strings; anything unrecognised becomes
/// [`Unknown`](Self::Unknown). [`Cleared`](Self::Cleared) is the empty status
/// and means "nothing to show".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum Status {
    Unconfigured,
    Initializing,
    Login,
    Ready,
    Connected,
    Pending,
    Disconnected,
    #[default]
    Cleared,
    Unknown,
}
impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Initializing => "initializing",
            Self::Login => "login",
            Self::Ready => "ready",
            Self::Connected => "connected",
            Self::Pending => "pending",
            Self::Disconnected => "disconnected",
            Self::Cleared => "",
            Self::Unknown => "unknown",
        }
    }

    /// Status icon for this value; `None` clears the icon.
    pub fn indicator(&self) -> Option<Indicator> {
        let (fill, shape) = match self {
            Self::Cleared => return None,
            Self::Unconfigured | Self::Disconnected | Self::Unknown => (Fill::Red, Shape::Ring),
            Self::Initializing | Self::Login => (Fill::Yellow, Shape::Dot),
            Self::Ready | Self::Connected => (Fill::Green, Shape::Dot),
            Self::Pending => (Fill::Green, Shape::Ring),
        };
        Some(Indicator { fill, shape, text: self.as_str().to_string() })
    }
}
impl From<&str> for Status {
    fn from(value: &str) -> Self {
        match value {
            "unconfigured" => Self::Unconfigured,
            "initializing" => Self::Initializing,
            "login" => Self::Login,
            "ready" => Self::Ready,
            "connected" => Self::Connected,
            "pending" => Self::Pending,
            "disconnected" => Self::Disconnected,
            "" => Self::Cleared,
            _ => Self::Unknown,
        }
    }
}
impl From<String> for Status {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}
impl From<Status> for &'static str {
    fn from(status: Status) -> Self {
        status.as_str()
    }
}
impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two status streams a session publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Cgi,
    Ftp,
}
impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cgi => "cgi_status",
            Self::Ftp => "ftp_status",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Fill {
    Red,
    Yellow,
    Green,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Ring,
    Dot,
}

/// Status icon shown next to a device in the host UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Indicator {
    pub fill: Fill,
    pub shape: Shape,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Status::Unconfigured, Fill::Red, Shape::Ring)]
    #[case(Status::Initializing, Fill::Yellow, Shape::Dot)]
    #[case(Status::Login, Fill::Yellow, Shape::Dot)]
    #[case(Status::Ready, Fill::Green, Shape::Dot)]
    #[case(Status::Connected, Fill::Green, Shape::Dot)]
    #[case(Status::Pending, Fill::Green, Shape::Ring)]
    #[case(Status::Disconnected, Fill::Red, Shape::Ring)]
    #[case(Status::Unknown, Fill::Red, Shape::Ring)]
    fn test_indicator(#[case] status: Status, #[case] fill: Fill, #[case] shape: Shape) {
        let indicator = status.indicator().unwrap();
        assert_eq!((indicator.fill, indicator.shape), (fill, shape));
        assert_eq!(indicator.text, status.as_str());
    }

    #[test]
    fn test_cleared_has_no_indicator() {
        assert_eq!(Status::Cleared.indicator(), None);
    }

    #[rstest]
    #[case("ready", Status::Ready)]
    #[case("", Status::Cleared)]
    #[case("rebooting", Status::Unknown)]
    fn test_parse(#[case] raw: &str, #[case] expected: Status) {
        assert_eq!(Status::from(raw), expected);
    }

    #[test]
    fn test_serde_uses_wire_strings() {
        assert_eq!(serde_json::to_string(&Status::Cleared).unwrap(), "\"\"");
        assert_eq!(serde_json::to_string(&Status::Pending).unwrap(), "\"pending\"");
        let parsed: Status = serde_json::from_str("\"weird\"").unwrap();
        assert_eq!(parsed, Status::Unknown);
    }
}
