//! Thread avoidance planning
//!
//! Given segments the free thread must not cross or pass too close to,
//! [`AvoidancePlanner::thread_avoid`] rotates the ring so the thread clears
//! as many of them as possible and returns the ones it still conflicts
//! with. [`AvoidancePlanner::avoid_and_print`] alternates avoidance with
//! printing whatever just became safe until nothing is left.
//!
//! Every choice is deterministic: candidate directions are ranked by how
//! many segments they still conflict with, then by how far the ring has to
//! turn, then by the order in which they were generated.

use std::collections::BTreeMap;

use threadkit_core::geometry::utils::{too_close, visibility};
use threadkit_core::{
    Angle, Error, HalfLine, PlanningContext, PlanningError, Point, Result, Segment, SegmentId,
    SegmentSet,
};
use threadkit_settings::GeneralSettings;
use tracing::{debug, info, warn};

use crate::printer::Printer;
use crate::steps::Steps;

/// Avoidance planner settings
#[derive(Debug, Clone, Copy)]
pub struct AvoidancePlanner {
    /// Minimum clearance between the thread and segment endpoints
    pub avoid_by: f64,
    /// Bound on avoid/print rounds in [`AvoidancePlanner::avoid_and_print`]
    pub max_iterations: usize,
}

impl Default for AvoidancePlanner {
    fn default() -> Self {
        Self::from_settings(&GeneralSettings::default())
    }
}

impl AvoidancePlanner {
    /// Planner from configuration
    pub fn from_settings(settings: &GeneralSettings) -> Self {
        Self {
            avoid_by: settings.avoid_by,
            max_iterations: settings.max_avoid_iterations,
        }
    }

    /// Rotate the thread away from the segments in `avoid`.
    ///
    /// Returns the subset of `avoid` the new thread path still crosses or
    /// passes within `avoid_by` of. An empty set means everything in
    /// `avoid` is now safe to print.
    pub fn thread_avoid(
        &self,
        printer: &mut Printer,
        segments: &[Segment],
        avoid: &SegmentSet,
    ) -> Result<SegmentSet> {
        let avoid_segs: BTreeMap<SegmentId, &Segment> = avoid
            .iter()
            .filter_map(|id| segments.get(*id).map(|s| (*id, s)))
            .collect();
        if avoid_segs.is_empty() {
            return Ok(SegmentSet::new());
        }
        let anchor = printer.anchor;

        if let Some(seg) = self.single_at_anchor(&avoid_segs, &anchor) {
            let path = perpendicular_path(&anchor, seg, printer.thread_path.angle());
            debug!("Anchor {} on single segment {}; thread to {}", anchor, seg, path);
            printer.set_thread_path(path)?;
            return Ok(SegmentSet::new());
        }

        let path = printer.thread_path.clone();
        let isecs = path.intersecting(avoid_segs.iter().map(|(id, s)| (*id, *s)));

        if isecs.is_empty() {
            let flagged = self.near_misses(&path, &anchor, &avoid_segs);
            if flagged.is_empty() {
                debug!("Thread {} already clears {} segments", path, avoid_segs.len());
                return Ok(SegmentSet::new());
            }
            if flagged.len() < avoid_segs.len() {
                debug!("{} segments too close to thread {}", flagged.len(), path);
                return Ok(flagged);
            }
        } else {
            let mut extended = isecs;
            extended.extend(self.near_misses(&path, &anchor, &avoid_segs));
            if extended.len() < avoid_segs.len() {
                debug!(
                    "Thread {} conflicts with {} of {} segments",
                    path,
                    extended.len(),
                    avoid_segs.len()
                );
                return Ok(extended);
            }
        }

        self.visibility_search(printer, &avoid_segs)
    }

    /// The only segment in the set, if the anchor sits on it or within
    /// `avoid_by` of one of its endpoints
    fn single_at_anchor<'a>(
        &self,
        avoid: &BTreeMap<SegmentId, &'a Segment>,
        anchor: &Point,
    ) -> Option<&'a Segment> {
        if avoid.len() != 1 {
            return None;
        }
        let seg = *avoid.values().next()?;
        let near = seg.contains(anchor)
            || anchor.distance_2d(seg.start()) <= self.avoid_by
            || anchor.distance_2d(seg.end()) <= self.avoid_by;
        near.then_some(seg)
    }

    /// Segments with an endpoint within `avoid_by` of `path`, ignoring
    /// endpoints so close to the anchor that no rotation could help
    fn near_misses(
        &self,
        path: &HalfLine,
        anchor: &Point,
        avoid: &BTreeMap<SegmentId, &Segment>,
    ) -> SegmentSet {
        avoid
            .iter()
            .filter(|(_, seg)| {
                [seg.start(), seg.end()].into_iter().any(|ep| {
                    ep != anchor
                        && anchor.distance_2d(ep) > self.avoid_by
                        && too_close(path, ep, self.avoid_by)
                })
            })
            .map(|(id, _)| *id)
            .collect()
    }

    fn visibility_search(
        &self,
        printer: &mut Printer,
        avoid_segs: &BTreeMap<SegmentId, &Segment>,
    ) -> Result<SegmentSet> {
        let anchor = printer.anchor;
        let candidates = visibility(&anchor, avoid_segs, self.avoid_by)?;

        if avoid_segs.len() == 1 && candidates.iter().all(|c| c.residual.len() == 1) {
            warn!(
                "Giving up on avoiding single segment {} from anchor {}",
                avoid_segs.values().next().map_or(String::new(), |s| s.to_string()),
                anchor
            );
            return Ok(SegmentSet::new());
        }

        let context = || {
            Box::new(PlanningContext {
                segments: avoid_segs.values().map(|s| (*s).clone()).collect(),
                anchor,
                thread_path: printer.thread_path.clone(),
            })
        };

        let Some(fewest) = candidates.first().map(|c| c.residual.len()) else {
            return Err(PlanningError::NoImprovement { context: context() }.into());
        };
        let current = printer.thread_path.angle();
        let best = candidates
            .iter()
            .take_while(|c| c.residual.len() == fewest)
            .min_by(|a, b| {
                let da = angular_distance(current, &anchor, &a.point);
                let db = angular_distance(current, &anchor, &b.point);
                da.total_cmp(&db)
            });
        let Some(best) = best else {
            return Err(PlanningError::NoImprovement { context: context() }.into());
        };
        if best.residual.len() >= avoid_segs.len() {
            return Err(PlanningError::NoImprovement { context: context() }.into());
        }

        debug!(
            "Visibility: rotate toward {} leaving {} of {} segments",
            best.point,
            best.residual.len(),
            avoid_segs.len()
        );
        let residual = best.residual.clone();
        printer.rotate_thread_to(best.point)?;
        Ok(residual)
    }

    /// Alternate avoidance and printing until every segment in `avoid` has
    /// been printed.
    ///
    /// Each round adds an "avoid" step (marked invalid if the thread did not
    /// move) and a "print" step for the segments that became safe. Returns the
    /// number of rounds taken.
    pub fn avoid_and_print(
        &self,
        steps: &mut Steps,
        avoid: SegmentSet,
        label: &str,
    ) -> Result<usize> {
        let unprinted = steps.unprinted();
        let mut avoid: SegmentSet = avoid.intersection(&unprinted).copied().collect();
        let mut rounds = 0;

        while !avoid.is_empty() {
            if rounds == self.max_iterations {
                return Err(exhausted(rounds, steps.printer(), steps.segments(), &avoid));
            }
            rounds += 1;

            let name = format!("Move thread to avoid {} segments{}", avoid.len(), label);
            let isecs = steps.run_step(name, |s| {
                let before = s.printer().thread_path.clone();
                let (printer, segments) = s.planning_parts();
                let isecs = self.thread_avoid(printer, segments, &avoid)?;
                if s.printer().thread_path == before {
                    s.mark_invalid()?;
                }
                Ok(isecs)
            })?;

            let safe: SegmentSet = avoid.difference(&isecs).copied().collect();
            if !safe.is_empty() {
                let name = format!("Print {} segments thread doesn't intersect{}", safe.len(), label);
                steps.run_step(name, |s| s.add(safe.iter().copied()))?;
            }
            avoid = isecs;
        }

        if rounds > 0 {
            info!("Layer {}: avoid and print{} took {} rounds", steps.layer().number, label, rounds);
        }
        Ok(rounds)
    }

    /// Rotate the thread until it clears every one of `segments`, without
    /// printing anything in between. Returns the number of rounds taken.
    pub fn avoid_all(&self, printer: &mut Printer, segments: &[Segment]) -> Result<usize> {
        let mut avoid: SegmentSet = (0..segments.len()).collect();
        let mut rounds = 0;
        while !avoid.is_empty() {
            if rounds == self.max_iterations {
                return Err(exhausted(rounds, printer, segments, &avoid));
            }
            rounds += 1;
            avoid = self.thread_avoid(printer, segments, &avoid)?;
        }
        Ok(rounds)
    }
}

fn exhausted(
    iterations: usize,
    printer: &Printer,
    segments: &[Segment],
    avoid: &SegmentSet,
) -> Error {
    PlanningError::Exhausted {
        iterations,
        context: Box::new(PlanningContext {
            segments: avoid
                .iter()
                .filter_map(|id| segments.get(*id).cloned())
                .collect(),
            anchor: printer.anchor,
            thread_path: printer.thread_path.clone(),
        }),
    }
    .into()
}

/// Magnitude of the rotation from `current` to the direction of `point`
/// seen from `anchor`, in radians
fn angular_distance(current: Angle, anchor: &Point, point: &Point) -> f64 {
    current.diff(point.angle_from(anchor)).abs().radians()
}

/// Path from `anchor` perpendicular to `seg`, on whichever side needs the
/// smaller rotation from `current`
fn perpendicular_path(anchor: &Point, seg: &Segment, current: Angle) -> HalfLine {
    let along = seg.angle();
    let quarter = Angle::from_degrees(90.0);
    let left = (along + quarter).normalized();
    let right = (along - quarter).normalized();
    let angle = if current.diff(right).abs().radians() < current.diff(left).abs().radians() {
        right
    } else {
        left
    };
    HalfLine::from_angle(*anchor, angle)
}
