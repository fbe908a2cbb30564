//! Hit-testing boundary
//!
//! The world never knows where facades are on screen. A [`HitTester`]
//! supplied by the host answers "what is under this pointer" and the world
//! picks the winner.

use std::cmp::Ordering;

use veneer_core::FacadeId;

use crate::input::RawPointerEvent;

/// One intersection reported by a hit tester
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub facade: FacadeId,
    /// Distance from the viewer; closer wins
    pub distance: f32,
    /// Tie-break for equal distances; lower wins. Missing counts as zero.
    pub distance_bias: Option<f32>,
}

impl Hit {
    pub fn new(facade: FacadeId, distance: f32) -> Self {
        Self {
            facade,
            distance,
            distance_bias: None,
        }
    }

    pub fn with_bias(mut self, bias: f32) -> Self {
        self.distance_bias = Some(bias);
        self
    }

    fn order(&self, other: &Hit) -> Ordering {
        self.distance.total_cmp(&other.distance).then_with(|| {
            self.distance_bias
                .unwrap_or(0.0)
                .total_cmp(&other.distance_bias.unwrap_or(0.0))
        })
    }
}

/// Spatial query provided by the host
///
/// `filter` tells the tester which facades are currently eligible; testers
/// may use it to skip work, and the world filters again regardless.
pub trait HitTester {
    fn hit_test(&self, event: &RawPointerEvent, filter: &dyn Fn(FacadeId) -> bool) -> Vec<Hit>;
}

impl<F> HitTester for F
where
    F: Fn(&RawPointerEvent, &dyn Fn(FacadeId) -> bool) -> Vec<Hit>,
{
    fn hit_test(&self, event: &RawPointerEvent, filter: &dyn Fn(FacadeId) -> bool) -> Vec<Hit> {
        self(event, filter)
    }
}

/// Closest hit, ties broken by lower distance bias
pub fn closest_hit(hits: impl IntoIterator<Item = Hit>) -> Option<Hit> {
    hits.into_iter().min_by(|a, b| a.order(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids() -> (FacadeId, FacadeId) {
        let mut map: SlotMap<FacadeId, ()> = SlotMap::with_key();
        (map.insert(()), map.insert(()))
    }

    #[test]
    fn test_closest_distance_wins() {
        let (a, b) = ids();
        let hit = closest_hit([Hit::new(a, 5.0), Hit::new(b, 2.0)]).unwrap();
        assert_eq!(hit.facade, b);
    }

    #[test]
    fn test_bias_breaks_ties() {
        let (container, child) = ids();
        let hit = closest_hit([
            Hit::new(container, 3.0).with_bias(1.0),
            Hit::new(child, 3.0).with_bias(-1.0),
        ])
        .unwrap();
        assert_eq!(hit.facade, child);
    }

    #[test]
    fn test_missing_bias_counts_as_zero() {
        let (a, b) = ids();
        let hit = closest_hit([Hit::new(a, 1.0).with_bias(0.5), Hit::new(b, 1.0)]).unwrap();
        assert_eq!(hit.facade, b);
    }

    #[test]
    fn test_no_hits() {
        assert!(closest_hit(Vec::new()).is_none());
    }
}
