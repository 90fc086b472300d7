//! Protocol syntaxes and their wire tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Data type of a scalar or column.
///
/// `Integer` and `Bits` are display aliases of `Integer32` and `OctetString`,
/// `Unsigned32` of `Gauge32`; they share a tag and are not distinct variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Syntax {
    Integer32,
    OctetString,
    Null,
    ObjectIdentifier,
    IpAddress,
    Counter32,
    Gauge32,
    TimeTicks,
    Opaque,
    Counter64,
}

impl Syntax {
    pub const ALL: [Syntax; 10] = [
        Syntax::Integer32,
        Syntax::OctetString,
        Syntax::Null,
        Syntax::ObjectIdentifier,
        Syntax::IpAddress,
        Syntax::Counter32,
        Syntax::Gauge32,
        Syntax::TimeTicks,
        Syntax::Opaque,
        Syntax::Counter64,
    ];

    /// The protocol's numeric tag for this syntax.
    pub fn tag(&self) -> u8 {
        match self {
            Syntax::Integer32 => 2,
            Syntax::OctetString => 4,
            Syntax::Null => 5,
            Syntax::ObjectIdentifier => 6,
            Syntax::IpAddress => 64,
            Syntax::Counter32 => 65,
            Syntax::Gauge32 => 66,
            Syntax::TimeTicks => 67,
            Syntax::Opaque => 68,
            Syntax::Counter64 => 70,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Syntax> {
        Syntax::ALL.iter().copied().find(|s| s.tag() == tag)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Syntax::Integer32 => "Integer32",
            Syntax::OctetString => "OctetString",
            Syntax::Null => "Null",
            Syntax::ObjectIdentifier => "ObjectIdentifier",
            Syntax::IpAddress => "IpAddress",
            Syntax::Counter32 => "Counter32",
            Syntax::Gauge32 => "Gauge32",
            Syntax::TimeTicks => "TimeTicks",
            Syntax::Opaque => "Opaque",
            Syntax::Counter64 => "Counter64",
        }
    }

    /// True for syntaxes whose values are numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Syntax::Integer32
                | Syntax::Counter32
                | Syntax::Gauge32
                | Syntax::TimeTicks
                | Syntax::Counter64
        )
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Syntax {
    type Err = String;

    /// Case-insensitive; accepts the alias names as well.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && *c != ' ')
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "integer32" | "integer" => Ok(Syntax::Integer32),
            "octetstring" | "bits" => Ok(Syntax::OctetString),
            "null" => Ok(Syntax::Null),
            "objectidentifier" | "oid" => Ok(Syntax::ObjectIdentifier),
            "ipaddress" => Ok(Syntax::IpAddress),
            "counter32" => Ok(Syntax::Counter32),
            "gauge32" | "unsigned32" | "unsignedinteger32" => Ok(Syntax::Gauge32),
            "timeticks" => Ok(Syntax::TimeTicks),
            "opaque" => Ok(Syntax::Opaque),
            "counter64" => Ok(Syntax::Counter64),
            _ => Err(format!("unknown syntax '{}'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_match_protocol() {
        assert_eq!(Syntax::Integer32.tag(), 2);
        assert_eq!(Syntax::OctetString.tag(), 4);
        assert_eq!(Syntax::Null.tag(), 5);
        assert_eq!(Syntax::ObjectIdentifier.tag(), 6);
        assert_eq!(Syntax::IpAddress.tag(), 64);
        assert_eq!(Syntax::Counter32.tag(), 65);
        assert_eq!(Syntax::Gauge32.tag(), 66);
        assert_eq!(Syntax::TimeTicks.tag(), 67);
        assert_eq!(Syntax::Opaque.tag(), 68);
        assert_eq!(Syntax::Counter64.tag(), 70);
    }

    #[test]
    fn tags_are_unique() {
        for s in Syntax::ALL {
            assert_eq!(Syntax::from_tag(s.tag()), Some(s));
        }
        assert_eq!(Syntax::from_tag(3), None);
    }

    #[test]
    fn parse_aliases() {
        assert_eq!("Unsigned32".parse::<Syntax>().unwrap(), Syntax::Gauge32);
        assert_eq!("INTEGER".parse::<Syntax>().unwrap(), Syntax::Integer32);
        assert_eq!("bits".parse::<Syntax>().unwrap(), Syntax::OctetString);
        assert_eq!("octet_string".parse::<Syntax>().unwrap(), Syntax::OctetString);
        assert!("float".parse::<Syntax>().is_err());
    }

    #[test]
    fn serde_snake_case() {
        let json = serde_json::to_string(&Syntax::TimeTicks).unwrap();
        assert_eq!(json, "\"time_ticks\"");
        let back: Syntax = serde_json::from_str("\"ip_address\"").unwrap();
        assert_eq!(back, Syntax::IpAddress);
    }
}
