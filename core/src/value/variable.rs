//! Typed protocol values.

use std::fmt;
use std::net::Ipv4Addr;

use super::syntax::Syntax;
use crate::namespace::ObjectId;

/// A value in protocol form, tagged with its syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variable {
    Integer32(i32),
    OctetString(Vec<u8>),
    Null,
    ObjectIdentifier(ObjectId),
    IpAddress(Ipv4Addr),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Opaque(Vec<u8>),
    Counter64(u64),
}

impl Variable {
    pub fn syntax(&self) -> Syntax {
        match self {
            Variable::Integer32(_) => Syntax::Integer32,
            Variable::OctetString(_) => Syntax::OctetString,
            Variable::Null => Syntax::Null,
            Variable::ObjectIdentifier(_) => Syntax::ObjectIdentifier,
            Variable::IpAddress(_) => Syntax::IpAddress,
            Variable::Counter32(_) => Syntax::Counter32,
            Variable::Gauge32(_) => Syntax::Gauge32,
            Variable::TimeTicks(_) => Syntax::TimeTicks,
            Variable::Opaque(_) => Syntax::Opaque,
            Variable::Counter64(_) => Syntax::Counter64,
        }
    }

    /// Convenience for text octet strings.
    pub fn text(s: &str) -> Variable {
        Variable::OctetString(s.as_bytes().to_vec())
    }

    /// Integer view of numeric variables.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Variable::Integer32(v) => Some(i64::from(*v)),
            Variable::Counter32(v) | Variable::Gauge32(v) | Variable::TimeTicks(v) => {
                Some(i64::from(*v))
            }
            Variable::Counter64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Integer32(v) => write!(f, "{}", v),
            Variable::Counter32(v) | Variable::Gauge32(v) | Variable::TimeTicks(v) => {
                write!(f, "{}", v)
            }
            Variable::Counter64(v) => write!(f, "{}", v),
            Variable::OctetString(bytes) | Variable::Opaque(bytes) => {
                match std::str::from_utf8(bytes) {
                    Ok(s) => f.write_str(s),
                    Err(_) => {
                        let hex: Vec<String> = bytes.iter().map(|b| format!("{:02x}", b)).collect();
                        f.write_str(&hex.join(":"))
                    }
                }
            }
            Variable::Null => f.write_str("null"),
            Variable::ObjectIdentifier(id) => write!(f, "{}", id),
            Variable::IpAddress(ip) => write!(f, "{}", ip),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_of_each_variant() {
        assert_eq!(Variable::Integer32(1).syntax(), Syntax::Integer32);
        assert_eq!(Variable::text("a").syntax(), Syntax::OctetString);
        assert_eq!(Variable::Gauge32(3).syntax(), Syntax::Gauge32);
        assert_eq!(Variable::Counter64(3).syntax(), Syntax::Counter64);
    }

    #[test]
    fn display_binary_octets_as_hex() {
        let v = Variable::OctetString(vec![0xff, 0x00, 0x10]);
        assert_eq!(v.to_string(), "ff:00:10");
        assert_eq!(Variable::text("hello").to_string(), "hello");
    }

    #[test]
    fn as_i64_numeric_only() {
        assert_eq!(Variable::TimeTicks(42).as_i64(), Some(42));
        assert_eq!(Variable::Counter64(u64::MAX).as_i64(), None);
        assert_eq!(Variable::text("1").as_i64(), None);
    }
}
