use crate::internal::arena::ArenaId;

macro_rules! typed_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[repr(transparent)]
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
        pub struct $name(u32);

        impl ArenaId for $name {
            fn from_usize(x: usize) -> Self {
                debug_assert!(x < u32::MAX as usize);
                Self(x as u32)
            }

            fn to_usize(self) -> usize {
                self.0 as usize
            }
        }
    };
}

typed_id!(
    /// The id of an interned package name
    NameId
);
typed_id!(
    /// The id of an interned epoch:version-release string
    EvrId
);
typed_id!(
    /// The id of an interned architecture name
    ArchId
);
typed_id!(
    /// The id of an interned vendor string
    VendorId
);
typed_id!(
    /// The id of an interned dependency relation
    DepId
);
typed_id!(
    /// The id of a repository registered with the pool
    RepoId
);
typed_id!(
    /// The id of a learnt literal list, kept out of the rule record so the
    /// record itself stays small
    LearntId
);

/// The id of a solvable. Id 0 is reserved for the system pseudo-solvable,
/// which represents the environment and is always installed.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct SolvableId(u32);

impl SolvableId {
    pub(crate) fn system() -> Self {
        Self(0)
    }

    pub(crate) fn is_system(self) -> bool {
        self.0 == 0
    }
}

impl ArenaId for SolvableId {
    fn from_usize(x: usize) -> Self {
        debug_assert!(x < u32::MAX as usize);
        Self(x as u32)
    }

    fn to_usize(self) -> usize {
        self.0 as usize
    }
}

/// The id of a rule in the solver's rule store. `RuleId::null()` terminates
/// the watch chains threaded through the rules.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct RuleId(u32);

impl RuleId {
    pub(crate) fn new(index: usize) -> Self {
        debug_assert_ne!(index, u32::MAX as usize);
        Self(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn null() -> Self {
        Self(u32::MAX)
    }

    pub(crate) fn is_null(self) -> bool {
        self.0 == u32::MAX
    }
}
