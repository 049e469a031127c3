//! Object Identifier value type.

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::error::{Error, OidErrorKind};

/// Maximum number of sub-identifiers a single OID may carry on the wire
/// (RFC 2741 encodes `n_subid` in a single byte).
pub const MAX_SUBIDS: usize = 128;

/// The `1.3.6.1` prefix eligible for single-byte compression (RFC 2741 §5.1).
const INTERNET_PREFIX: [u32; 4] = [1, 3, 6, 1];

/// Inline storage for the common case (most MIB OIDs are well under 16 arcs).
type Arcs = SmallVec<[u32; 16]>;

/// An AgentX Object Identifier: an ordered sequence of unsigned 32-bit
/// sub-identifiers.
///
/// `Oid` is a plain value type - cheap to clone, compare, and hash. Ordering
/// is component-wise lexicographic, matching RFC 2741's definition of
/// "lexicographically greater."
#[derive(Clone, Eq, Hash, Default)]
pub struct Oid {
    arcs: Arcs,
}

impl Oid {
    /// Construct an OID from a slice of sub-identifiers.
    pub fn new(arcs: &[u32]) -> Self {
        Self {
            arcs: Arcs::from_slice(arcs),
        }
    }

    /// The empty OID (zero sub-identifiers). Used as the null OID in AgentX.
    pub fn empty() -> Self {
        Self { arcs: Arcs::new() }
    }

    /// The sub-identifiers as a slice.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Number of sub-identifiers.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// True if this OID has no sub-identifiers.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// True if `self` is equal to or a descendant of `prefix`.
    pub fn starts_with(&self, prefix: &Oid) -> bool {
        self.arcs.len() >= prefix.arcs.len() && self.arcs[..prefix.arcs.len()] == prefix.arcs[..]
    }

    /// Return the sub-identifiers after `prefix`, or `None` if `self` does
    /// not start with `prefix`.
    pub fn strip_prefix(&self, prefix: &Oid) -> Option<&[u32]> {
        if self.starts_with(prefix) {
            Some(&self.arcs[prefix.arcs.len()..])
        } else {
            None
        }
    }

    /// Append sub-identifiers, producing a new OID.
    pub fn child(&self, suffix: &[u32]) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.extend_from_slice(suffix);
        Oid { arcs }
    }

    /// True if this OID begins with the `1.3.6.1` internet prefix and has
    /// at least five sub-identifiers, making it eligible for the wire
    /// codec's single-byte prefix compression.
    pub fn internet_compressible(&self) -> bool {
        self.arcs.len() >= 5 && self.arcs[..4] == INTERNET_PREFIX && self.arcs[4] <= u8::MAX as u32
    }

    /// Parse dotted-decimal notation, e.g. `"1.3.6.1.2.1.1.1.0"`. A leading
    /// `.` is accepted and ignored.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let s = s.strip_prefix('.').unwrap_or(s);
        if s.is_empty() {
            return Ok(Oid::empty());
        }
        let mut arcs = Arcs::new();
        for part in s.split('.') {
            let arc: u32 = part
                .parse()
                .map_err(|_| Error::invalid_oid_with_input(OidErrorKind::InvalidArc, s))?;
            arcs.push(arc);
        }
        if arcs.len() > MAX_SUBIDS {
            return Err(Error::invalid_oid_with_input(
                OidErrorKind::TooManyArcs {
                    count: arcs.len(),
                    max: MAX_SUBIDS,
                },
                s,
            ));
        }
        Ok(Oid { arcs })
    }
}

impl FromStr for Oid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Oid::parse(s)
    }
}

impl PartialEq for Oid {
    fn eq(&self, other: &Self) -> bool {
        self.arcs == other.arcs
    }
}

impl PartialOrd for Oid {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Oid {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.arcs.cmp(&other.arcs)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arc) in self.arcs.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", arc)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self)
    }
}

impl From<&[u32]> for Oid {
    fn from(arcs: &[u32]) -> Self {
        Oid::new(arcs)
    }
}

impl<const N: usize> From<[u32; N]> for Oid {
    fn from(arcs: [u32; N]) -> Self {
        Oid::new(&arcs)
    }
}

impl FromIterator<u32> for Oid {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        Oid {
            arcs: iter.into_iter().collect(),
        }
    }
}

/// Build an [`Oid`] from a literal list of sub-identifiers.
///
/// ```rust
/// use agentx_subagent::oid;
/// let sys_descr = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
/// assert_eq!(sys_descr.len(), 9);
/// ```
#[macro_export]
macro_rules! oid {
    ($($arc:expr),* $(,)?) => {
        $crate::oid::Oid::new(&[$($arc),*])
    };
}
