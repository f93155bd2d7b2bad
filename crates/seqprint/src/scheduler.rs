//! The sub-global scheduler: bed assignment, placement and print
//! ordering.
//!
//! Objects are taken in caller order in groups of `object_group_size`
//! (stretched over glued chains). Each group gets one solver session in
//! which the bed's already-committed objects appear as constants. The
//! session first shrinks a plate-centered bed bounding box while the
//! weak formula stays satisfiable, then verifies the candidate model in
//! exact rational arithmetic and lazily adds strong edge-crossing
//! constraints for exactly the violated pairs. A group that cannot be
//! placed closes the bed; its objects move to a fresh one.

use log::{debug, info};
use seqprint_geometry::rational::{
    point_strictly_inside_convex, point_strictly_inside_polygon, scale_up_position,
    segments_properly_cross_at, RationalPoint,
};
use seqprint_geometry::{Point, Rational};
use seqprint_solver::constraints::{self, ObjectModel, Placement};
use seqprint_solver::{solver_context, CheckOutcome, Session};

use crate::config::SolverConfiguration;
use crate::error::{Result, ScheduleError};
use crate::preprocess::SolvableObject;
use crate::types::{ScheduledObject, ScheduledPlate};
use crate::SLICER_SCALE_FACTOR;

/// One object committed to the current bed, at solver scale.
#[derive(Debug, Clone)]
struct Committed {
    index: usize,
    x: Rational,
    y: Rational,
    t: Rational,
}

/// Schedule preprocessed objects onto as many beds as needed.
///
/// `progress` receives a non-decreasing percentage in `0..=100`,
/// invoked between solver queries.
pub fn schedule_objects(
    config: &SolverConfiguration,
    objects: &[SolvableObject],
    progress: &mut dyn FnMut(i32),
) -> Result<Vec<ScheduledPlate>> {
    config.validate()?;
    if objects.is_empty() {
        progress(100);
        return Ok(Vec::new());
    }

    progress(0);
    let total = objects.len();
    let mut plates = Vec::new();
    let mut remaining: Vec<usize> = (0..total).collect();
    let mut committed_before = 0usize;

    while !remaining.is_empty() {
        let (bed, rest) = pack_plate(config, objects, &remaining, &mut |on_bed| {
            progress((((committed_before + on_bed) * 99) / total) as i32);
        })?;
        info!(
            "bed {}: {} objects placed, {} remaining",
            plates.len(),
            bed.len(),
            rest.len()
        );
        committed_before += bed.len();
        plates.push(plate_from(objects, bed));
        remaining = rest;
    }

    progress(100);
    Ok(plates)
}

/// Sort a bed by temporal value (caller order breaks ties) and scale
/// the positions back up to slicer units.
fn plate_from(objects: &[SolvableObject], mut bed: Vec<Committed>) -> ScheduledPlate {
    bed.sort_by(|a, b| a.t.cmp(&b.t).then(a.index.cmp(&b.index)));
    ScheduledPlate {
        scheduled_objects: bed
            .iter()
            .map(|committed| {
                let (x, y) = scale_up_position(&committed.x, &committed.y, SLICER_SCALE_FACTOR);
                ScheduledObject::new(objects[committed.index].id, x, y)
            })
            .collect(),
    }
}

/// Fill one bed from the head of `queue`. Returns the committed bed
/// (never empty) and the indices that move to the next bed.
fn pack_plate(
    config: &SolverConfiguration,
    objects: &[SolvableObject],
    queue: &[usize],
    on_commit: &mut dyn FnMut(usize),
) -> Result<(Vec<Committed>, Vec<usize>)> {
    let mut bed: Vec<Committed> = Vec::new();
    let mut cursor = 0usize;

    while cursor < queue.len() {
        if bed.len() >= config.fixed_object_grouping_limit {
            break;
        }
        let group = compose_group(config, objects, &queue[cursor..], bed.len());

        match solve_group(config, objects, &bed, &group)? {
            GroupOutcome::Placed(positions) => {
                commit(&mut bed, &group, positions);
                cursor += group.len();
                on_commit(bed.len());
            }
            GroupOutcome::Infeasible { timed_out: true } => {
                // A timeout is never degraded silently.
                return Err(fatal_for(objects, group[0], true));
            }
            GroupOutcome::Infeasible { timed_out: false } => {
                // Retry the group's first object alone: a glued chain
                // or a full group may not fit where a single object
                // still does. The chain's ordering survives a split
                // because the committed neighbor keeps its glue
                // constraint against the next query.
                let retried = if group.len() > 1 {
                    solve_group(config, objects, &bed, &group[..1])?
                } else {
                    GroupOutcome::Infeasible { timed_out: false }
                };
                match retried {
                    GroupOutcome::Placed(positions) => {
                        commit(&mut bed, &group[..1], positions);
                        cursor += 1;
                        on_commit(bed.len());
                    }
                    GroupOutcome::Infeasible { timed_out } => {
                        if timed_out || bed.is_empty() {
                            return Err(fatal_for(objects, group[0], timed_out));
                        }
                        // Close this bed; the group gets a fresh one.
                        break;
                    }
                }
            }
        }
    }

    Ok((bed, queue[cursor..].to_vec()))
}

fn commit(bed: &mut Vec<Committed>, group: &[usize], positions: Vec<(Rational, Rational, Rational)>) {
    for (offset, (x, y, t)) in positions.into_iter().enumerate() {
        bed.push(Committed {
            index: group[offset],
            x,
            y,
            t,
        });
    }
}

fn fatal_for(objects: &[SolvableObject], index: usize, timed_out: bool) -> ScheduleError {
    let id = objects[index].id;
    if timed_out {
        ScheduleError::SolverTimeout { id }
    } else {
        ScheduleError::ObjectTooLarge { id }
    }
}

/// Take up to `object_group_size` queue entries (respecting the
/// remaining grouping budget), then stretch the tail over any glued
/// chain so a chain never splits across queries or beds.
fn compose_group(
    config: &SolverConfiguration,
    objects: &[SolvableObject],
    queue_tail: &[usize],
    bed_len: usize,
) -> Vec<usize> {
    let budget = config
        .fixed_object_grouping_limit
        .saturating_sub(bed_len)
        .max(1);
    let mut take = config
        .object_group_size
        .min(queue_tail.len())
        .min(budget)
        .max(1);
    while take < queue_tail.len() && objects[queue_tail[take - 1]].glued_to_next {
        take += 1;
    }
    queue_tail[..take].to_vec()
}

enum GroupOutcome {
    /// Solver-scale `(x, y, t)` per group member, in group order.
    Placed(Vec<(Rational, Rational, Rational)>),
    /// The group cannot join this bed.
    Infeasible { timed_out: bool },
}

enum RefineOutcome {
    Placed(Vec<(Rational, Rational, Rational)>),
    Failed { timed_out: bool },
}

fn solve_group(
    config: &SolverConfiguration,
    objects: &[SolvableObject],
    bed: &[Committed],
    group: &[usize],
) -> Result<GroupOutcome> {
    let ctx = solver_context(&config.optimization_timeout);
    let session = Session::new(&ctx);

    let indices: Vec<usize> = bed
        .iter()
        .map(|committed| committed.index)
        .chain(group.iter().copied())
        .collect();
    let models: Vec<ObjectModel<'_>> = indices
        .iter()
        .map(|&index| ObjectModel {
            footprint: &objects[index].footprint,
            zones: &objects[index].zones,
            glued_to_next: objects[index].glued_to_next,
        })
        .collect();
    let placements: Vec<Placement<'_>> = bed
        .iter()
        .map(|committed| Placement::fixed(&session, &committed.x, &committed.y, &committed.t))
        .chain(
            (0..group.len()).map(|offset| Placement::free(&session, bed.len() + offset)),
        )
        .collect();

    constraints::assert_weak_non_overlap(&session, &models, &placements);
    constraints::assert_temporal_ordering(&session, &models, &placements, config.temporal_spread);

    // Permanent plate containment for the undecided objects.
    let plate = &config.plate_bounding_box;
    for (slot, placement) in placements.iter().enumerate() {
        if !placement.free {
            continue;
        }
        let bbox = models[slot].footprint.bounding_box();
        session.assert(&constraints::footprint_inside_box(
            &session,
            &bbox,
            &placement.x,
            &placement.y,
            plate.min,
            plate.max,
        ));
        if let Some(plate_polygon) = &config.plate_bounding_polygon {
            session.assert(&constraints::footprint_corners_inside_convex(
                &session,
                &bbox,
                &placement.x,
                &placement.y,
                plate_polygon,
            ));
        }
    }

    // Shrink the plate-centered bed box while the weak formula stays
    // satisfiable; the smallest satisfiable size wins.
    let max_size = plate.x_size().max(plate.y_size());
    let mut best_size: Option<i64> = None;
    let mut size = max_size;
    loop {
        let outcome = {
            let _frame = session.frame();
            assert_bed_box(config, &session, &models, &placements, size);
            session.check()
        };
        match outcome {
            CheckOutcome::Sat => {
                best_size = Some(size);
                let next = size - config.bounding_box_size_optimization_step;
                if next < config.minimum_bounding_box_size {
                    break;
                }
                size = next;
            }
            CheckOutcome::Unsat => {
                if best_size.is_none() {
                    return Ok(GroupOutcome::Infeasible { timed_out: false });
                }
                break;
            }
            CheckOutcome::Unknown => {
                if best_size.is_none() {
                    return Ok(GroupOutcome::Infeasible { timed_out: true });
                }
                break;
            }
        }
    }
    let mut size = match best_size {
        Some(size) => size,
        None => return Ok(GroupOutcome::Infeasible { timed_out: false }),
    };

    // Refine at the chosen size; if the strong constraints kill it,
    // fall back to larger boxes before giving up on the bed.
    loop {
        let refined = {
            let _frame = session.frame();
            assert_bed_box(config, &session, &models, &placements, size);
            refine_in_frame(config, &session, &models, &placements, bed)?
        };
        match refined {
            RefineOutcome::Placed(positions) => {
                debug!(
                    "group of {} placed at bed box size {size}",
                    group.len()
                );
                return Ok(GroupOutcome::Placed(positions));
            }
            RefineOutcome::Failed { timed_out } => {
                if size >= max_size {
                    return Ok(GroupOutcome::Infeasible { timed_out });
                }
                size = (size + config.bounding_box_size_optimization_step).min(max_size);
                debug!("refinement failed, widening bed box to {size}");
            }
        }
    }
}

/// Constrain every undecided footprint into a `size × size` box
/// centered on the plate (clamped to the plate).
fn assert_bed_box<'ctx>(
    config: &SolverConfiguration,
    session: &Session<'ctx>,
    models: &[ObjectModel<'_>],
    placements: &[Placement<'ctx>],
    size: i64,
) {
    let plate = &config.plate_bounding_box;
    let center = plate.center();
    let half = size / 2;
    let lo = Point::new(
        plate.min.x.max(center.x - half),
        plate.min.y.max(center.y - half),
    );
    let hi = Point::new(
        plate.max.x.min(center.x + half),
        plate.max.y.min(center.y + half),
    );
    for (slot, placement) in placements.iter().enumerate() {
        if !placement.free {
            continue;
        }
        let bbox = models[slot].footprint.bounding_box();
        session.assert(&constraints::footprint_inside_box(
            session,
            &bbox,
            &placement.x,
            &placement.y,
            lo,
            hi,
        ));
    }
}

/// The weak-to-strong refinement loop inside one assumption frame.
fn refine_in_frame<'ctx>(
    config: &SolverConfiguration,
    session: &Session<'ctx>,
    models: &[ObjectModel<'_>],
    placements: &[Placement<'ctx>],
    bed: &[Committed],
) -> Result<RefineOutcome> {
    match session.check() {
        CheckOutcome::Sat => {}
        CheckOutcome::Unsat => return Ok(RefineOutcome::Failed { timed_out: false }),
        CheckOutcome::Unknown => return Ok(RefineOutcome::Failed { timed_out: true }),
    }

    for round in 0..=config.max_refines {
        let positions = extract_positions(session, placements, bed)?;
        let violations = find_violations(models, placements, &positions);
        if violations.is_empty() {
            let free = positions.into_iter().skip(bed.len()).collect();
            return Ok(RefineOutcome::Placed(free));
        }
        if round == config.max_refines {
            debug!("refinement exhausted after {round} rounds");
            return Ok(RefineOutcome::Failed { timed_out: false });
        }
        debug!("round {round}: {} violated pairs", violations.len());
        for violation in violations {
            match violation {
                Violation::Footprints(i, j) => {
                    constraints::assert_footprints_non_crossing(session, models, placements, i, j);
                }
                Violation::Zone { earlier, later } => {
                    constraints::assert_zone_edges_non_crossing(
                        session, models, placements, earlier, later,
                    );
                }
            }
        }
        match session.check() {
            CheckOutcome::Sat => {}
            CheckOutcome::Unsat => return Ok(RefineOutcome::Failed { timed_out: false }),
            CheckOutcome::Unknown => return Ok(RefineOutcome::Failed { timed_out: true }),
        }
    }
    Ok(RefineOutcome::Failed { timed_out: false })
}

/// Solver-scale `(x, y, t)` for every model slot: committed values for
/// the fixed ones, model values for the free ones.
fn extract_positions<'ctx>(
    session: &Session<'ctx>,
    placements: &[Placement<'ctx>],
    bed: &[Committed],
) -> Result<Vec<(Rational, Rational, Rational)>> {
    let mut positions = Vec::with_capacity(placements.len());
    for (slot, placement) in placements.iter().enumerate() {
        if placement.free {
            positions.push((
                session.model_value(&placement.x)?,
                session.model_value(&placement.y)?,
                session.model_value(&placement.t)?,
            ));
        } else {
            let committed = &bed[slot];
            positions.push((
                committed.x.clone(),
                committed.y.clone(),
                committed.t.clone(),
            ));
        }
    }
    Ok(positions)
}

enum Violation {
    /// Two footprints overlap in the candidate model.
    Footprints(usize, usize),
    /// The later object's footprint touches the earlier one's zone.
    Zone { earlier: usize, later: usize },
}

/// Exact-rational verification of a weak candidate model.
fn find_violations(
    models: &[ObjectModel<'_>],
    placements: &[Placement<'_>],
    positions: &[(Rational, Rational, Rational)],
) -> Vec<Violation> {
    let mut violations = Vec::new();
    for i in 0..models.len() {
        for j in i + 1..models.len() {
            if !placements[i].free && !placements[j].free {
                continue;
            }
            if footprints_overlap(models, positions, i, j) {
                violations.push(Violation::Footprints(i, j));
            }
            let (earlier, later) = if positions[i].2 < positions[j].2 {
                (i, j)
            } else {
                (j, i)
            };
            if zone_violated(models, positions, earlier, later) {
                violations.push(Violation::Zone { earlier, later });
            }
        }
    }
    violations
}

fn footprints_overlap(
    models: &[ObjectModel<'_>],
    positions: &[(Rational, Rational, Rational)],
    i: usize,
    j: usize,
) -> bool {
    let (ix, iy, _) = &positions[i];
    let (jx, jy, _) = &positions[j];
    let p = models[i].footprint;
    let q = models[j].footprint;

    if p.points
        .iter()
        .any(|&v| point_strictly_inside_polygon(q, jx, jy, &RationalPoint::placed(v, ix, iy)))
    {
        return true;
    }
    if q.points
        .iter()
        .any(|&v| point_strictly_inside_polygon(p, ix, iy, &RationalPoint::placed(v, jx, jy)))
    {
        return true;
    }
    p.edges().any(|(a1, a2)| {
        q.edges()
            .any(|(b1, b2)| segments_properly_cross_at(a1, a2, ix, iy, b1, b2, jx, jy))
    })
}

fn zone_violated(
    models: &[ObjectModel<'_>],
    positions: &[(Rational, Rational, Rational)],
    earlier: usize,
    later: usize,
) -> bool {
    let (ex, ey, _) = &positions[earlier];
    let (lx, ly, _) = &positions[later];
    let footprint = models[later].footprint;

    for zone in models[earlier].zones {
        if footprint
            .points
            .iter()
            .any(|&v| point_strictly_inside_convex(zone, ex, ey, &RationalPoint::placed(v, lx, ly)))
        {
            return true;
        }
        // A zone piece swallowed whole by the footprint has no vertex
        // of the footprint inside it and no edge crossings.
        if zone
            .points
            .iter()
            .any(|&v| point_strictly_inside_polygon(footprint, lx, ly, &RationalPoint::placed(v, ex, ey)))
        {
            return true;
        }
        if zone.edges().any(|(a1, a2)| {
            footprint
                .edges()
                .any(|(b1, b2)| segments_properly_cross_at(a1, a2, ex, ey, b1, b2, lx, ly))
        }) {
            return true;
        }
    }
    false
}
