//! Structured dependency relations.
//!
//! A dependency is either a plain name, a versioned relation
//! (`name op epoch:version-release`), or a combination (`A & B`, `A | B`,
//! an architecture restriction, or a namespace call resolved by the host).
//! Deps are interned in the pool and referenced by [`DepId`] everywhere.

use std::fmt;

use crate::internal::id::{ArchId, DepId, EvrId, NameId};

/// The comparison part of a versioned relation, as a `<`, `=`, `>` bit
/// triple. Combinations like `>=` are the union of the single bits.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct RelOp(u8);

impl RelOp {
    pub const GT: RelOp = RelOp(1);
    pub const EQ: RelOp = RelOp(2);
    pub const LT: RelOp = RelOp(4);
    pub const GE: RelOp = RelOp(1 | 2);
    pub const LE: RelOp = RelOp(4 | 2);
    pub const NE: RelOp = RelOp(1 | 4);
    pub const ANY: RelOp = RelOp(1 | 2 | 4);

    pub(crate) fn has_gt(self) -> bool {
        self.0 & 1 != 0
    }

    pub(crate) fn has_eq(self) -> bool {
        self.0 & 2 != 0
    }

    pub(crate) fn has_lt(self) -> bool {
        self.0 & 4 != 0
    }

    /// Parses the textual operator used by the testcase format.
    pub fn parse(s: &str) -> Option<RelOp> {
        match s {
            ">" => Some(RelOp::GT),
            "=" | "==" => Some(RelOp::EQ),
            "<" => Some(RelOp::LT),
            ">=" | "=>" => Some(RelOp::GE),
            "<=" | "=<" => Some(RelOp::LE),
            "<>" | "!=" => Some(RelOp::NE),
            _ => None,
        }
    }

    /// Returns whether an ordering outcome of `evrcmp(candidate, wanted)`
    /// satisfies this operator.
    pub fn matches(self, ord: std::cmp::Ordering) -> bool {
        match ord {
            std::cmp::Ordering::Less => self.has_lt(),
            std::cmp::Ordering::Equal => self.has_eq(),
            std::cmp::Ordering::Greater => self.has_gt(),
        }
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RelOp::GT => ">",
            RelOp::EQ => "=",
            RelOp::LT => "<",
            RelOp::GE => ">=",
            RelOp::LE => "<=",
            RelOp::NE => "<>",
            _ => "<=>",
        };
        f.write_str(s)
    }
}

/// An interned dependency relation.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Dep {
    /// A bare name; matches any version of the name and any explicit
    /// provider of it.
    Name(NameId),
    /// `name op evr`
    Rel {
        name: NameId,
        op: RelOp,
        evr: EvrId,
    },
    /// Both sides must be provided by the same candidate.
    And(DepId, DepId),
    /// Either side qualifies a candidate.
    Or(DepId, DepId),
    /// The inner dep, restricted to candidates of the given architecture.
    Arch(DepId, ArchId),
    /// `ns(arg)`, resolved through the pool's namespace handler.
    Namespace { ns: NameId, arg: EvrId },
}

impl Dep {
    /// The name a relation keys on in the whatprovides index, if it has one.
    pub(crate) fn name(&self) -> Option<NameId> {
        match *self {
            Dep::Name(name) | Dep::Rel { name, .. } => Some(name),
            _ => None,
        }
    }
}
