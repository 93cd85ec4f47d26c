//! Pool and solver flags.
//!
//! Flags are exposed both as typed enums (for programmatic use) and by their
//! stable wire names (for the testcase adapter). All default to off except
//! `allownamechange`.

/// Flags configuring dependency matching at the pool level.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PoolFlag {
    /// Promote a missing epoch on the dependency side to the provider's
    /// epoch before comparing.
    PromoteEpoch,
    /// Turn a self-conflict into "not installable" instead of dropping it.
    ForbidSelfConflicts,
    /// Obsoletes match against provides, not just names.
    ObsoleteUsesProvides,
    /// Implicit same-name obsoletes match against provides.
    ImplicitObsoleteUsesProvides,
    /// Accepted for testcase compatibility; colors are not modeled.
    ObsoleteUsesColors,
    /// Installed packages never obsolete anything.
    NoInstalledObsoletes,
    /// Accepted for testcase compatibility; dist epochs are not modeled.
    HaveDistEpoch,
}

/// The pool flag state.
#[derive(Clone, Default, Debug)]
pub struct PoolFlags {
    pub promote_epoch: bool,
    pub forbid_self_conflicts: bool,
    pub obsolete_uses_provides: bool,
    pub implicit_obsolete_uses_provides: bool,
    pub obsolete_uses_colors: bool,
    pub no_installed_obsoletes: bool,
    pub have_dist_epoch: bool,
}

impl PoolFlags {
    pub(crate) fn field(&mut self, flag: PoolFlag) -> &mut bool {
        match flag {
            PoolFlag::PromoteEpoch => &mut self.promote_epoch,
            PoolFlag::ForbidSelfConflicts => &mut self.forbid_self_conflicts,
            PoolFlag::ObsoleteUsesProvides => &mut self.obsolete_uses_provides,
            PoolFlag::ImplicitObsoleteUsesProvides => &mut self.implicit_obsolete_uses_provides,
            PoolFlag::ObsoleteUsesColors => &mut self.obsolete_uses_colors,
            PoolFlag::NoInstalledObsoletes => &mut self.no_installed_obsoletes,
            PoolFlag::HaveDistEpoch => &mut self.have_dist_epoch,
        }
    }

    pub fn get(&self, flag: PoolFlag) -> bool {
        match flag {
            PoolFlag::PromoteEpoch => self.promote_epoch,
            PoolFlag::ForbidSelfConflicts => self.forbid_self_conflicts,
            PoolFlag::ObsoleteUsesProvides => self.obsolete_uses_provides,
            PoolFlag::ImplicitObsoleteUsesProvides => self.implicit_obsolete_uses_provides,
            PoolFlag::ObsoleteUsesColors => self.obsolete_uses_colors,
            PoolFlag::NoInstalledObsoletes => self.no_installed_obsoletes,
            PoolFlag::HaveDistEpoch => self.have_dist_epoch,
        }
    }
}

impl PoolFlag {
    pub const ALL: &'static [PoolFlag] = &[
        PoolFlag::PromoteEpoch,
        PoolFlag::ForbidSelfConflicts,
        PoolFlag::ObsoleteUsesProvides,
        PoolFlag::ImplicitObsoleteUsesProvides,
        PoolFlag::ObsoleteUsesColors,
        PoolFlag::NoInstalledObsoletes,
        PoolFlag::HaveDistEpoch,
    ];

    /// The stable wire name used by the testcase format.
    pub fn name(self) -> &'static str {
        match self {
            PoolFlag::PromoteEpoch => "promoteepoch",
            PoolFlag::ForbidSelfConflicts => "forbidselfconflicts",
            PoolFlag::ObsoleteUsesProvides => "obsoleteusesprovides",
            PoolFlag::ImplicitObsoleteUsesProvides => "implicitobsoleteusesprovides",
            PoolFlag::ObsoleteUsesColors => "obsoleteusescolors",
            PoolFlag::NoInstalledObsoletes => "noinstalledobsoletes",
            PoolFlag::HaveDistEpoch => "havedistepoch",
        }
    }

    pub fn from_name(name: &str) -> Option<PoolFlag> {
        PoolFlag::ALL.iter().copied().find(|f| f.name() == name)
    }
}

/// Flags configuring a single solver run.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SolverFlag {
    AllowDowngrade,
    AllowNameChange,
    AllowArchChange,
    AllowVendorChange,
    AllowUninstall,
    NoUpdateProvide,
    SplitProvides,
    IgnoreRecommended,
    AddAlreadyRecommended,
    NoInfarchCheck,
    KeepExplicitObsoletes,
    BestObeyPolicy,
    NoAutoTarget,
}

/// The solver flag state. `allow_namechange` defaults to on, everything else
/// to off.
#[derive(Clone, Debug)]
pub struct SolverFlags {
    pub allow_downgrade: bool,
    pub allow_namechange: bool,
    pub allow_archchange: bool,
    pub allow_vendorchange: bool,
    pub allow_uninstall: bool,
    pub no_update_provide: bool,
    pub split_provides: bool,
    pub ignore_recommended: bool,
    pub add_already_recommended: bool,
    pub no_infarch_check: bool,
    pub keep_explicit_obsoletes: bool,
    pub best_obey_policy: bool,
    pub no_auto_target: bool,
}

impl Default for SolverFlags {
    fn default() -> Self {
        Self {
            allow_downgrade: false,
            allow_namechange: true,
            allow_archchange: false,
            allow_vendorchange: false,
            allow_uninstall: false,
            no_update_provide: false,
            split_provides: false,
            ignore_recommended: false,
            add_already_recommended: false,
            no_infarch_check: false,
            keep_explicit_obsoletes: false,
            best_obey_policy: false,
            no_auto_target: false,
        }
    }
}

impl SolverFlags {
    pub(crate) fn field(&mut self, flag: SolverFlag) -> &mut bool {
        match flag {
            SolverFlag::AllowDowngrade => &mut self.allow_downgrade,
            SolverFlag::AllowNameChange => &mut self.allow_namechange,
            SolverFlag::AllowArchChange => &mut self.allow_archchange,
            SolverFlag::AllowVendorChange => &mut self.allow_vendorchange,
            SolverFlag::AllowUninstall => &mut self.allow_uninstall,
            SolverFlag::NoUpdateProvide => &mut self.no_update_provide,
            SolverFlag::SplitProvides => &mut self.split_provides,
            SolverFlag::IgnoreRecommended => &mut self.ignore_recommended,
            SolverFlag::AddAlreadyRecommended => &mut self.add_already_recommended,
            SolverFlag::NoInfarchCheck => &mut self.no_infarch_check,
            SolverFlag::KeepExplicitObsoletes => &mut self.keep_explicit_obsoletes,
            SolverFlag::BestObeyPolicy => &mut self.best_obey_policy,
            SolverFlag::NoAutoTarget => &mut self.no_auto_target,
        }
    }

    pub fn get(&self, flag: SolverFlag) -> bool {
        match flag {
            SolverFlag::AllowDowngrade => self.allow_downgrade,
            SolverFlag::AllowNameChange => self.allow_namechange,
            SolverFlag::AllowArchChange => self.allow_archchange,
            SolverFlag::AllowVendorChange => self.allow_vendorchange,
            SolverFlag::AllowUninstall => self.allow_uninstall,
            SolverFlag::NoUpdateProvide => self.no_update_provide,
            SolverFlag::SplitProvides => self.split_provides,
            SolverFlag::IgnoreRecommended => self.ignore_recommended,
            SolverFlag::AddAlreadyRecommended => self.add_already_recommended,
            SolverFlag::NoInfarchCheck => self.no_infarch_check,
            SolverFlag::KeepExplicitObsoletes => self.keep_explicit_obsoletes,
            SolverFlag::BestObeyPolicy => self.best_obey_policy,
            SolverFlag::NoAutoTarget => self.no_auto_target,
        }
    }
}

impl SolverFlag {
    pub const ALL: &'static [SolverFlag] = &[
        SolverFlag::AllowDowngrade,
        SolverFlag::AllowNameChange,
        SolverFlag::AllowArchChange,
        SolverFlag::AllowVendorChange,
        SolverFlag::AllowUninstall,
        SolverFlag::NoUpdateProvide,
        SolverFlag::SplitProvides,
        SolverFlag::IgnoreRecommended,
        SolverFlag::AddAlreadyRecommended,
        SolverFlag::NoInfarchCheck,
        SolverFlag::KeepExplicitObsoletes,
        SolverFlag::BestObeyPolicy,
        SolverFlag::NoAutoTarget,
    ];

    /// The default value of the flag (only `allownamechange` is on).
    pub fn default_value(self) -> bool {
        matches!(self, SolverFlag::AllowNameChange)
    }

    /// The stable wire name used by the testcase format.
    pub fn name(self) -> &'static str {
        match self {
            SolverFlag::AllowDowngrade => "allowdowngrade",
            SolverFlag::AllowNameChange => "allownamechange",
            SolverFlag::AllowArchChange => "allowarchchange",
            SolverFlag::AllowVendorChange => "allowvendorchange",
            SolverFlag::AllowUninstall => "allowuninstall",
            SolverFlag::NoUpdateProvide => "noupdateprovide",
            SolverFlag::SplitProvides => "splitprovides",
            SolverFlag::IgnoreRecommended => "ignorerecommended",
            SolverFlag::AddAlreadyRecommended => "addalreadyrecommended",
            SolverFlag::NoInfarchCheck => "noinfarchcheck",
            SolverFlag::KeepExplicitObsoletes => "keepexplicitobsoletes",
            SolverFlag::BestObeyPolicy => "bestobeypolicy",
            SolverFlag::NoAutoTarget => "noautotarget",
        }
    }

    pub fn from_name(name: &str) -> Option<SolverFlag> {
        SolverFlag::ALL.iter().copied().find(|f| f.name() == name)
    }
}
