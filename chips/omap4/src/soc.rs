// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! SoC revision identification.

/// Silicon revisions the PRM code distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SocRevision {
    Omap4430,
    Omap4460,
    Omap4470,
    Omap5430Es1_0,
    Omap5432Es1_0,
    Omap5430Es2_0,
    Omap5432Es2_0,
}

impl SocRevision {
    pub fn is_omap44xx(&self) -> bool {
        matches!(
            self,
            SocRevision::Omap4430 | SocRevision::Omap4460 | SocRevision::Omap4470
        )
    }

    pub fn is_omap443x(&self) -> bool {
        *self == SocRevision::Omap4430
    }

    pub fn is_omap54xx(&self) -> bool {
        !self.is_omap44xx()
    }

    /// Errata i612: the I/O wakeup clock is not recycled on a global warm
    /// reset, so the I/O daisy chain must be reconfigured at PM init.
    ///
    /// Impacts OMAP4430 all revisions and OMAP543x ES1.0.
    pub fn has_errata_i612(&self) -> bool {
        matches!(
            self,
            SocRevision::Omap4430 | SocRevision::Omap5430Es1_0 | SocRevision::Omap5432Es1_0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::SocRevision;

    #[test]
    fn families() {
        assert!(SocRevision::Omap4460.is_omap44xx());
        assert!(!SocRevision::Omap4460.is_omap443x());
        assert!(SocRevision::Omap5432Es2_0.is_omap54xx());
    }

    #[test]
    fn errata_i612() {
        assert!(SocRevision::Omap4430.has_errata_i612());
        assert!(SocRevision::Omap5430Es1_0.has_errata_i612());
        assert!(!SocRevision::Omap4470.has_errata_i612());
        assert!(!SocRevision::Omap5430Es2_0.has_errata_i612());
    }
}
