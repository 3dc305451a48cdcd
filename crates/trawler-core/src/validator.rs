//! Self-healing of implausible site anchors.
//!
//! Persisted site descriptors have been seen to rot: a gather anchor left
//! over from another site, hundreds of tiles from its deposit anchor. The
//! validator replaces such an anchor with the site's known-good fallback
//! and logs the correction. It runs once at startup and again whenever a
//! live measurement looks wrong.

use tracing::warn;
use trawler_types::Tile;

use crate::condition::Condition;
use crate::config::SiteConfig;

/// Result of one validation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// Nothing looked wrong.
    Plausible,
    /// The gather anchor was replaced.
    Corrected(Condition),
    /// Something looked wrong but no fallback is known.
    Unresolved {
        /// The implausible distance.
        distance: f64,
    },
}

/// Detects and corrects implausible anchor distances.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidator {
    /// Anchor distance beyond which a layout is implausible.
    threshold: f64,

    /// Gather anchor already reported as unresolvable.
    unresolved: Option<Tile>,
}

impl ConfigValidator {
    /// Create a validator with the given implausibility threshold.
    pub const fn new(threshold: f64) -> Self {
        Self {
            threshold,
            unresolved: None,
        }
    }

    /// Check the distance between the gather and deposit anchors.
    ///
    /// Running this twice is a no-op the second time: after a correction
    /// the anchors are plausible, and an anchor that cannot be corrected is
    /// only warned about once.
    pub fn validate(&mut self, site: &mut SiteConfig) -> Validation {
        let distance = site.gather_anchor.distance_to(site.deposit_anchor);
        if distance <= self.threshold {
            return Validation::Plausible;
        }
        self.correct(site, distance)
    }

    /// Re-check using a live position.
    ///
    /// Triggers only when the avatar is far from the gather anchor while
    /// standing within the deposit anchor's layout, which a real site never
    /// produces.
    pub fn revalidate(&mut self, site: &mut SiteConfig, position: Tile) -> Validation {
        let to_gather = position.distance_to(site.gather_anchor);
        let to_deposit = position.distance_to(site.deposit_anchor);
        if to_gather <= self.threshold || to_deposit > self.threshold {
            return Validation::Plausible;
        }
        self.correct(site, to_gather)
    }

    fn correct(&mut self, site: &mut SiteConfig, distance: f64) -> Validation {
        let fallback = site
            .known_good_gather_anchor
            .filter(|fallback| *fallback != site.gather_anchor);
        let Some(fallback) = fallback else {
            if self.unresolved != Some(site.gather_anchor) {
                self.unresolved = Some(site.gather_anchor);
                warn!(
                    site = %site.name,
                    gather = %site.gather_anchor,
                    deposit = %site.deposit_anchor,
                    distance,
                    threshold = self.threshold,
                    "Implausible gather anchor and no known-good fallback"
                );
            }
            return Validation::Unresolved { distance };
        };

        let from = site.gather_anchor;
        site.gather_anchor = fallback;
        let condition = Condition::ConfigImplausible {
            site: site.name.clone(),
            from,
            to: fallback,
            distance,
        };
        warn!(
            site = %site.name,
            from = %from,
            to = %fallback,
            distance,
            "Corrected implausible gather anchor"
        );
        Validation::Corrected(condition)
    }
}
