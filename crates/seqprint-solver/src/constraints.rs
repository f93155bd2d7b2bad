//! Constraint builders for sequential-print placement.
//!
//! Conventions: all polygons are counter-clockwise in solver-scale
//! integer coordinates; every object is translated by its `(x, y)`
//! placement expression; `t` expressions order objects in time on one
//! bed.
//!
//! Each half-plane and orientation test compares a constant edge
//! direction against a translated point, so every predicate here is
//! linear in the decision variables and the whole formula stays inside
//! the degree-2 real arithmetic budget of the backend.

use seqprint_geometry::{BoundingBox, Point, Polygon, Rational};
use z3::ast::{Ast, Bool, Real};

use crate::session::Session;

/// Per-object inputs to the constraint builders.
pub struct ObjectModel<'a> {
    /// Decimated footprint at solver scale, counter-clockwise.
    pub footprint: &'a Polygon,
    /// Unreachable-zone pieces at solver scale, counter-clockwise convex.
    pub zones: &'a [Polygon],
    /// The next caller-order object must print right after this one.
    pub glued_to_next: bool,
}

/// Placement expressions for one object. Fixed objects get constant
/// expressions, undecided ones get decision variables; the builders do
/// not distinguish.
pub struct Placement<'ctx> {
    /// X translation of the footprint, in solver units.
    pub x: Real<'ctx>,
    /// Y translation of the footprint, in solver units.
    pub y: Real<'ctx>,
    /// Temporal order key on the current bed.
    pub t: Real<'ctx>,
    /// Whether this placement is still undecided.
    pub free: bool,
}

impl<'ctx> Placement<'ctx> {
    /// Fresh decision variables for an undecided object.
    pub fn free(session: &Session<'ctx>, index: usize) -> Self {
        Self {
            x: session.real_var(&format!("x{index}")),
            y: session.real_var(&format!("y{index}")),
            t: session.real_var(&format!("t{index}")),
            free: true,
        }
    }

    /// Constant placement for an already-committed object.
    pub fn fixed(session: &Session<'ctx>, x: &Rational, y: &Rational, t: &Rational) -> Self {
        Self {
            x: session.real_const(x),
            y: session.real_const(y),
            t: session.real_const(t),
            free: false,
        }
    }
}

fn and_all<'ctx>(session: &Session<'ctx>, clauses: &[Bool<'ctx>]) -> Bool<'ctx> {
    if clauses.is_empty() {
        return Bool::from_bool(session.ctx(), true);
    }
    let refs: Vec<&Bool<'ctx>> = clauses.iter().collect();
    Bool::and(session.ctx(), &refs)
}

fn or_any<'ctx>(session: &Session<'ctx>, clauses: &[Bool<'ctx>]) -> Bool<'ctx> {
    if clauses.is_empty() {
        return Bool::from_bool(session.ctx(), false);
    }
    let refs: Vec<&Bool<'ctx>> = clauses.iter().collect();
    Bool::or(session.ctx(), &refs)
}

/// `c + Σ coeff·var` as a real expression.
fn linear<'ctx>(
    session: &Session<'ctx>,
    constant: i64,
    terms: &[(i64, &Real<'ctx>)],
) -> Real<'ctx> {
    let mut parts: Vec<Real<'ctx>> = Vec::with_capacity(terms.len() + 1);
    if constant != 0 {
        parts.push(session.int_const(constant));
    }
    for &(coeff, var) in terms {
        if coeff == 0 {
            continue;
        }
        if coeff == 1 {
            parts.push(var.clone());
        } else {
            parts.push(Real::mul(session.ctx(), &[&session.int_const(coeff), var]));
        }
    }
    if parts.is_empty() {
        return session.int_const(0);
    }
    let refs: Vec<&Real<'ctx>> = parts.iter().collect();
    Real::add(session.ctx(), &refs)
}

/// Point `(px, py)` on the interior side of the directed edge `a → b` of
/// a counter-clockwise polygon: `cross(b − a, p − a) ≥ 0`.
pub fn point_inside_half_plane<'ctx>(
    session: &Session<'ctx>,
    a: Point,
    b: Point,
    px: &Real<'ctx>,
    py: &Real<'ctx>,
) -> Bool<'ctx> {
    // cross = dx·(py − a.y) − dy·(px − a.x)
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let constant = dy * a.x - dx * a.y;
    let cross = linear(session, constant, &[(dx, py), (-dy, px)]);
    cross.ge(&session.int_const(0))
}

/// Point `(px, py)` strictly outside the convex polygon `q` translated
/// by `(qx, qy)`: some edge sees the point strictly on its outer side.
/// Strictness matters: a vertex allowed onto the boundary can coexist
/// with real area overlap that neither the weak formula nor the
/// refinement detector would see.
pub fn point_outside_convex_polygon<'ctx>(
    session: &Session<'ctx>,
    q: &Polygon,
    qx: &Real<'ctx>,
    qy: &Real<'ctx>,
    px: &Real<'ctx>,
    py: &Real<'ctx>,
) -> Bool<'ctx> {
    let outside: Vec<Bool<'ctx>> = q
        .edges()
        .map(|(a, b)| {
            // cross(b − a, p − (a + q_pos)) < 0 puts the point
            // strictly on the outer side of this edge.
            let dx = b.x - a.x;
            let dy = b.y - a.y;
            let constant = dy * a.x - dx * a.y;
            let cross = linear(
                session,
                constant,
                &[(dx, py), (-dy, px), (-dx, qy), (dy, qx)],
            );
            cross.lt(&session.int_const(0))
        })
        .collect();
    or_any(session, &outside)
}

/// Weak non-overlap between polygon `p` at `(px, py)` and polygon `q` at
/// `(qx, qy)`: every vertex of `p` is outside `q`. One direction only;
/// call twice for the symmetric weak predicate.
pub fn polygon_outside_polygon<'ctx>(
    session: &Session<'ctx>,
    p: &Polygon,
    px: &Real<'ctx>,
    py: &Real<'ctx>,
    q: &Polygon,
    qx: &Real<'ctx>,
    qy: &Real<'ctx>,
) -> Bool<'ctx> {
    let vertices: Vec<Bool<'ctx>> = p
        .points
        .iter()
        .map(|&v| {
            let vx = linear(session, v.x, &[(1, px)]);
            let vy = linear(session, v.y, &[(1, py)]);
            point_outside_convex_polygon(session, q, qx, qy, &vx, &vy)
        })
        .collect();
    and_all(session, &vertices)
}

/// Edge `a1 → a2` translated by `(ax, ay)` does not properly cross edge
/// `b1 → b2` translated by `(bx, by)`: one of the segments has both
/// endpoints on a single closed side of the other's supporting line.
#[allow(clippy::too_many_arguments)]
pub fn edges_non_crossing<'ctx>(
    session: &Session<'ctx>,
    a1: Point,
    a2: Point,
    ax: &Real<'ctx>,
    ay: &Real<'ctx>,
    b1: Point,
    b2: Point,
    bx: &Real<'ctx>,
    by: &Real<'ctx>,
) -> Bool<'ctx> {
    let zero = session.int_const(0);

    // Orientation of translated point r against the translated line
    // la → lb; the line's direction vector is constant.
    let orient = |la: Point,
                  lb: Point,
                  lx: &Real<'ctx>,
                  ly: &Real<'ctx>,
                  r: Point,
                  rx: &Real<'ctx>,
                  ry: &Real<'ctx>|
     -> Real<'ctx> {
        let dx = lb.x - la.x;
        let dy = lb.y - la.y;
        let constant = dx * (r.y - la.y) - dy * (r.x - la.x);
        linear(
            session,
            constant,
            &[(dx, ry), (-dx, ly), (-dy, rx), (dy, lx)],
        )
    };

    let o1 = orient(a1, a2, ax, ay, b1, bx, by);
    let o2 = orient(a1, a2, ax, ay, b2, bx, by);
    let o3 = orient(b1, b2, bx, by, a1, ax, ay);
    let o4 = orient(b1, b2, bx, by, a2, ax, ay);

    let both_left = Bool::and(session.ctx(), &[&o1.ge(&zero), &o2.ge(&zero)]);
    let both_right = Bool::and(session.ctx(), &[&o1.le(&zero), &o2.le(&zero)]);
    let both_above = Bool::and(session.ctx(), &[&o3.ge(&zero), &o4.ge(&zero)]);
    let both_below = Bool::and(session.ctx(), &[&o3.le(&zero), &o4.le(&zero)]);
    Bool::or(
        session.ctx(),
        &[&both_left, &both_right, &both_above, &both_below],
    )
}

/// No edge of `p` properly crosses any edge of `q`. Conjoined with the
/// symmetric [`polygon_outside_polygon`] calls this yields strong
/// non-overlap.
pub fn polygons_edges_non_crossing<'ctx>(
    session: &Session<'ctx>,
    p: &Polygon,
    px: &Real<'ctx>,
    py: &Real<'ctx>,
    q: &Polygon,
    qx: &Real<'ctx>,
    qy: &Real<'ctx>,
) -> Bool<'ctx> {
    let mut clauses: Vec<Bool<'ctx>> = Vec::with_capacity(p.len() * q.len());
    for (a1, a2) in p.edges() {
        for (b1, b2) in q.edges() {
            clauses.push(edges_non_crossing(session, a1, a2, px, py, b1, b2, qx, qy));
        }
    }
    and_all(session, &clauses)
}

/// Axis-aligned decision box centered at the origin: `|x| ≤ half ∧
/// |y| ≤ half`.
pub fn decision_box<'ctx>(
    session: &Session<'ctx>,
    x: &Real<'ctx>,
    y: &Real<'ctx>,
    half: i64,
) -> Bool<'ctx> {
    let hi = session.int_const(half);
    let lo = session.int_const(-half);
    Bool::and(
        session.ctx(),
        &[&x.ge(&lo), &x.le(&hi), &y.ge(&lo), &y.le(&hi)],
    )
}

/// Keep the translated footprint bounding box inside `[lo, hi]`.
///
/// The caller computes `lo`/`hi` from the plate and the current bed
/// bounding-box size, so the same predicate serves both the permanent
/// plate containment and the retractable shrinking assumption.
pub fn footprint_inside_box<'ctx>(
    session: &Session<'ctx>,
    footprint_bbox: &BoundingBox,
    x: &Real<'ctx>,
    y: &Real<'ctx>,
    lo: Point,
    hi: Point,
) -> Bool<'ctx> {
    let x_min = linear(session, footprint_bbox.min.x, &[(1, x)]);
    let x_max = linear(session, footprint_bbox.max.x, &[(1, x)]);
    let y_min = linear(session, footprint_bbox.min.y, &[(1, y)]);
    let y_max = linear(session, footprint_bbox.max.y, &[(1, y)]);
    Bool::and(
        session.ctx(),
        &[
            &x_min.ge(&session.int_const(lo.x)),
            &x_max.le(&session.int_const(hi.x)),
            &y_min.ge(&session.int_const(lo.y)),
            &y_max.le(&session.int_const(hi.y)),
        ],
    )
}

/// All four corners of the translated footprint bounding box inside a
/// convex plate polygon.
pub fn footprint_corners_inside_convex<'ctx>(
    session: &Session<'ctx>,
    footprint_bbox: &BoundingBox,
    x: &Real<'ctx>,
    y: &Real<'ctx>,
    plate: &Polygon,
) -> Bool<'ctx> {
    let corners = [
        footprint_bbox.min,
        Point::new(footprint_bbox.max.x, footprint_bbox.min.y),
        footprint_bbox.max,
        Point::new(footprint_bbox.min.x, footprint_bbox.max.y),
    ];
    let mut clauses: Vec<Bool<'ctx>> = Vec::with_capacity(corners.len() * plate.len());
    for corner in corners {
        let cx = linear(session, corner.x, &[(1, x)]);
        let cy = linear(session, corner.y, &[(1, y)]);
        for (a, b) in plate.edges() {
            clauses.push(point_inside_half_plane(session, a, b, &cx, &cy));
        }
    }
    and_all(session, &clauses)
}

/// Assert weak pairwise non-overlap over all object pairs with at least
/// one undecided member.
pub fn assert_weak_non_overlap<'ctx>(
    session: &Session<'ctx>,
    objects: &[ObjectModel<'_>],
    placements: &[Placement<'ctx>],
) {
    for i in 0..objects.len() {
        for j in i + 1..objects.len() {
            if !placements[i].free && !placements[j].free {
                continue;
            }
            let forward = polygon_outside_polygon(
                session,
                objects[i].footprint,
                &placements[i].x,
                &placements[i].y,
                objects[j].footprint,
                &placements[j].x,
                &placements[j].y,
            );
            let backward = polygon_outside_polygon(
                session,
                objects[j].footprint,
                &placements[j].x,
                &placements[j].y,
                objects[i].footprint,
                &placements[i].x,
                &placements[i].y,
            );
            session.assert(&forward);
            session.assert(&backward);
        }
    }
}

/// The conditional unreachable-zone clause for one ordered pair: if
/// `earlier` prints before `later`, every vertex of `later`'s footprint
/// stays outside every zone piece of `earlier`.
fn zone_clause<'ctx>(
    session: &Session<'ctx>,
    objects: &[ObjectModel<'_>],
    placements: &[Placement<'ctx>],
    earlier: usize,
    later: usize,
) -> Bool<'ctx> {
    let mut outside: Vec<Bool<'ctx>> = Vec::new();
    for zone in objects[earlier].zones {
        for &v in &objects[later].footprint.points {
            let vx = linear(session, v.x, &[(1, &placements[later].x)]);
            let vy = linear(session, v.y, &[(1, &placements[later].y)]);
            outside.push(point_outside_convex_polygon(
                session,
                zone,
                &placements[earlier].x,
                &placements[earlier].y,
                &vx,
                &vy,
            ));
        }
    }
    and_all(session, &outside)
}

/// Assert temporal separation and order-conditional zone avoidance for
/// every object pair, plus the glued-pair equalities.
pub fn assert_temporal_ordering<'ctx>(
    session: &Session<'ctx>,
    objects: &[ObjectModel<'_>],
    placements: &[Placement<'ctx>],
    temporal_spread: i64,
) {
    let spread = session.int_const(temporal_spread.max(1));
    let one = session.int_const(1);

    for i in 0..objects.len() {
        for j in i + 1..objects.len() {
            if !placements[i].free && !placements[j].free {
                continue;
            }
            let ti = &placements[i].t;
            let tj = &placements[j].t;

            if j == i + 1 && objects[i].glued_to_next {
                // Glued chain: the next object prints immediately after.
                let ti_plus_one = Real::add(session.ctx(), &[ti, &one]);
                session.assert(&tj._eq(&ti_plus_one));
            } else {
                let i_first = Real::sub(session.ctx(), &[tj, ti]).ge(&spread);
                let j_first = Real::sub(session.ctx(), &[ti, tj]).ge(&spread);
                session.assert(&Bool::or(session.ctx(), &[&i_first, &j_first]));
            }

            let i_before_j = ti.lt(tj);
            let j_before_i = tj.lt(ti);
            session.assert(&i_before_j.implies(&zone_clause(session, objects, placements, i, j)));
            session.assert(&j_before_i.implies(&zone_clause(session, objects, placements, j, i)));
        }
    }
}

/// Strong-overlap refinement for one footprint pair: forbid every edge
/// crossing between the two footprints.
pub fn assert_footprints_non_crossing<'ctx>(
    session: &Session<'ctx>,
    objects: &[ObjectModel<'_>],
    placements: &[Placement<'ctx>],
    i: usize,
    j: usize,
) {
    let clause = polygons_edges_non_crossing(
        session,
        objects[i].footprint,
        &placements[i].x,
        &placements[i].y,
        objects[j].footprint,
        &placements[j].x,
        &placements[j].y,
    );
    session.assert(&clause);
}

/// Zone refinement for one ordered pair: when `earlier` prints first, no
/// edge of any of its zone pieces may cross an edge of `later`'s
/// footprint.
pub fn assert_zone_edges_non_crossing<'ctx>(
    session: &Session<'ctx>,
    objects: &[ObjectModel<'_>],
    placements: &[Placement<'ctx>],
    earlier: usize,
    later: usize,
) {
    let mut clauses: Vec<Bool<'ctx>> = Vec::new();
    for zone in objects[earlier].zones {
        clauses.push(polygons_edges_non_crossing(
            session,
            zone,
            &placements[earlier].x,
            &placements[earlier].y,
            objects[later].footprint,
            &placements[later].x,
            &placements[later].y,
        ));
    }
    let all = and_all(session, &clauses);
    let ordered = placements[earlier].t.lt(&placements[later].t);
    session.assert(&ordered.implies(&all));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{solver_context, CheckOutcome};
    use seqprint_geometry::rational::rational_from_int;

    fn square(half: i64) -> Polygon {
        Polygon::from_pairs(&[(-half, -half), (half, -half), (half, half), (-half, half)])
    }

    fn fixed_origin<'ctx>(session: &Session<'ctx>) -> Placement<'ctx> {
        Placement::fixed(
            session,
            &rational_from_int(0),
            &rational_from_int(0),
            &rational_from_int(0),
        )
    }

    #[test]
    fn test_point_outside_convex_polygon() {
        let ctx = solver_context("");
        let session = Session::new(&ctx);
        let q = square(10);
        let qx = session.int_const(0);
        let qy = session.int_const(0);

        // A point pinned strictly inside the square cannot satisfy the
        // outside predicate.
        let px = session.real_var("px");
        let py = session.real_var("py");
        session.assert(&px._eq(&session.int_const(3)));
        session.assert(&py._eq(&session.int_const(-2)));
        session.assert(&point_outside_convex_polygon(
            &session, &q, &qx, &qy, &px, &py,
        ));
        assert_eq!(session.check(), CheckOutcome::Unsat);
    }

    #[test]
    fn test_weak_non_overlap_separates_squares() {
        let ctx = solver_context("");
        let session = Session::new(&ctx);
        let footprint = square(10);
        let objects = [
            ObjectModel {
                footprint: &footprint,
                zones: &[],
                glued_to_next: false,
            },
            ObjectModel {
                footprint: &footprint,
                zones: &[],
                glued_to_next: false,
            },
        ];
        let placements = [fixed_origin(&session), Placement::free(&session, 1)];
        assert_weak_non_overlap(&session, &objects, &placements);
        // Keep the free square nearby so the model stays small.
        session.assert(&decision_box(
            &session,
            &placements[1].x,
            &placements[1].y,
            100,
        ));
        assert_eq!(session.check(), CheckOutcome::Sat);
        let x = session.model_value(&placements[1].x).unwrap();
        let y = session.model_value(&placements[1].y).unwrap();
        // Congruent 20-unit squares must be separated by 20 along some
        // axis, or a vertex would land inside the other square.
        let twenty = rational_from_int(20);
        let neg_twenty = rational_from_int(-20);
        assert!(x >= twenty || x <= neg_twenty || y >= twenty || y <= neg_twenty);
    }

    #[test]
    fn test_pinned_overlap_is_unsat() {
        let ctx = solver_context("");
        let session = Session::new(&ctx);
        let footprint = square(10);
        let objects = [
            ObjectModel {
                footprint: &footprint,
                zones: &[],
                glued_to_next: false,
            },
            ObjectModel {
                footprint: &footprint,
                zones: &[],
                glued_to_next: false,
            },
        ];
        let placements = [fixed_origin(&session), Placement::free(&session, 1)];
        assert_weak_non_overlap(&session, &objects, &placements);
        session.assert(&placements[1].x._eq(&session.int_const(5)));
        session.assert(&placements[1].y._eq(&session.int_const(5)));
        assert_eq!(session.check(), CheckOutcome::Unsat);
    }

    #[test]
    fn test_glued_pair_orders_consecutively() {
        let ctx = solver_context("");
        let session = Session::new(&ctx);
        let footprint = square(10);
        let objects = [
            ObjectModel {
                footprint: &footprint,
                zones: &[],
                glued_to_next: true,
            },
            ObjectModel {
                footprint: &footprint,
                zones: &[],
                glued_to_next: false,
            },
        ];
        let placements = [Placement::free(&session, 0), Placement::free(&session, 1)];
        assert_temporal_ordering(&session, &objects, &placements, 1);
        assert_eq!(session.check(), CheckOutcome::Sat);
        let t0 = session.model_value(&placements[0].t).unwrap();
        let t1 = session.model_value(&placements[1].t).unwrap();
        assert_eq!(t1 - t0, rational_from_int(1));
    }

    #[test]
    fn test_zone_constraint_pushes_later_object_out() {
        let ctx = solver_context("");
        let session = Session::new(&ctx);
        let footprint = square(10);
        // The earlier object's zone swallows everything within 50 units.
        let zone = [square(50)];
        let objects = [
            ObjectModel {
                footprint: &footprint,
                zones: &zone,
                glued_to_next: false,
            },
            ObjectModel {
                footprint: &footprint,
                zones: &[],
                glued_to_next: false,
            },
        ];
        let placements = [fixed_origin(&session), Placement::free(&session, 1)];
        assert_weak_non_overlap(&session, &objects, &placements);
        assert_temporal_ordering(&session, &objects, &placements, 1);
        // Force the free object after the fixed one and nearby: every
        // nearby vertex is inside the zone, so this must be unsat.
        session.assert(&placements[1].t.gt(&placements[0].t));
        session.assert(&decision_box(
            &session,
            &placements[1].x,
            &placements[1].y,
            30,
        ));
        assert_eq!(session.check(), CheckOutcome::Unsat);
    }

    #[test]
    fn test_edges_non_crossing_blocks_pass_through() {
        let ctx = solver_context("");
        let session = Session::new(&ctx);
        // A long thin horizontal bar and a tall thin vertical bar can
        // satisfy vertex-outside-polygon while crossing; the edge
        // predicate must reject the crossing configuration.
        let horizontal = Polygon::from_pairs(&[(-40, -2), (40, -2), (40, 2), (-40, 2)]);
        let vertical = Polygon::from_pairs(&[(-2, -40), (2, -40), (2, 40), (-2, 40)]);
        let objects = [
            ObjectModel {
                footprint: &horizontal,
                zones: &[],
                glued_to_next: false,
            },
            ObjectModel {
                footprint: &vertical,
                zones: &[],
                glued_to_next: false,
            },
        ];
        let placements = [fixed_origin(&session), Placement::free(&session, 1)];
        assert_weak_non_overlap(&session, &objects, &placements);
        session.assert(&placements[1].x._eq(&session.int_const(0)));
        session.assert(&placements[1].y._eq(&session.int_const(0)));
        // The weak formula admits the cross configuration.
        assert_eq!(session.check(), CheckOutcome::Sat);
        // Strong refinement rules it out.
        assert_footprints_non_crossing(&session, &objects, &placements, 0, 1);
        assert_eq!(session.check(), CheckOutcome::Unsat);
    }

    #[test]
    fn test_footprint_inside_box() {
        let ctx = solver_context("");
        let session = Session::new(&ctx);
        let footprint = square(10);
        let bbox = footprint.bounding_box();
        let x = session.real_var("x");
        let y = session.real_var("y");
        session.assert(&footprint_inside_box(
            &session,
            &bbox,
            &x,
            &y,
            Point::new(0, 0),
            Point::new(100, 100),
        ));
        session.assert(&x.le(&session.int_const(5)));
        // x + min(-10) >= 0 forces x >= 10, contradicting x <= 5.
        assert_eq!(session.check(), CheckOutcome::Unsat);
    }
}
