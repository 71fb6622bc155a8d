//! Certificate request options
//!
//! `SshOptions` is the caller-requested shape of a certificate before any
//! token-derived policy has been applied. `TimeDuration` is the transport
//! type for validity endpoints: either an absolute RFC3339 timestamp or a
//! signed duration relative to server now (`"90m"`, `"-1h"`, `"24h"`).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// The two kinds of OpenSSH certificates the authority issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SshCertType {
    /// A certificate presented by a user to a host
    User,
    /// A certificate presented by a host to its clients
    Host,
}

impl fmt::Display for SshCertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SshCertType::User => write!(f, "user"),
            SshCertType::Host => write!(f, "host"),
        }
    }
}

impl FromStr for SshCertType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(SshCertType::User),
            "host" => Ok(SshCertType::Host),
            _ => Err(CoreError::Policy(format!("unknown certType {s}"))),
        }
    }
}

impl From<SshCertType> for ssh_key::certificate::CertType {
    fn from(t: SshCertType) -> Self {
        match t {
            SshCertType::User => ssh_key::certificate::CertType::User,
            SshCertType::Host => ssh_key::certificate::CertType::Host,
        }
    }
}

/// A validity endpoint: unset, absolute, or relative to server now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeDuration {
    /// No value supplied; the signer falls back to policy defaults
    #[default]
    Unset,
    /// An absolute point in time
    Time(DateTime<Utc>),
    /// A signed offset from server now
    Duration(Duration),
}

impl TimeDuration {
    /// Whether no value was supplied
    pub fn is_unset(&self) -> bool {
        matches!(self, TimeDuration::Unset)
    }

    /// Resolve against the given notion of now. `Unset` resolves to `None`.
    pub fn resolve(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeDuration::Unset => None,
            TimeDuration::Time(t) => Some(*t),
            TimeDuration::Duration(d) => Some(now + *d),
        }
    }
}

impl FromStr for TimeDuration {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(TimeDuration::Unset);
        }
        if let Ok(t) = DateTime::parse_from_rfc3339(s) {
            return Ok(TimeDuration::Time(t.with_timezone(&Utc)));
        }
        parse_relative_duration(s).map(TimeDuration::Duration)
    }
}

impl fmt::Display for TimeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeDuration::Unset => Ok(()),
            TimeDuration::Time(t) => write!(f, "{}", t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            TimeDuration::Duration(d) => write!(f, "{}s", d.num_seconds()),
        }
    }
}

impl Serialize for TimeDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimeDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse a signed relative duration such as `"90m"`, `"-1h30m"`, or `"2d"`.
///
/// Units are `d`, `h`, `m`, `s`. The sign, if present, applies to the
/// whole value.
pub fn parse_relative_duration(s: &str) -> Result<Duration, CoreError> {
    let err = || CoreError::InvalidTime(format!("cannot parse {s:?} as a time or duration"));

    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if rest.is_empty() {
        return Err(err());
    }

    let mut total: i64 = 0;
    let mut digits = String::new();
    for c in rest.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let value: i64 = digits.parse().map_err(|_| err())?;
        digits.clear();
        let unit = match c {
            'd' => 86_400,
            'h' => 3_600,
            'm' => 60,
            's' => 1,
            _ => return Err(err()),
        };
        total += value * unit;
    }
    if !digits.is_empty() {
        // A trailing bare number has no unit.
        return Err(err());
    }
    if negative {
        total = -total;
    }
    Ok(Duration::seconds(total))
}

/// The caller-requested shape of an SSH certificate
#[derive(Debug, Clone, Default)]
pub struct SshOptions {
    /// Requested certificate type; `None` defers to token policy
    pub cert_type: Option<SshCertType>,
    /// Requested key ID; empty defers to token policy
    pub key_id: String,
    /// Requested principals, in order
    pub principals: Vec<String>,
    /// Start of the requested validity window
    pub valid_after: TimeDuration,
    /// End of the requested validity window
    pub valid_before: TimeDuration,
}
