// Quadrant-symmetric spline snake: a closed exponential-B-spline outer
// contour plus four natural-cubic-spline spokes meeting at a shared center.
//
// All node coordinates live in a single arena indexed by derived ranges:
// outer contour 0..4*M0, spoke k at 4*M0 + k*(M0-1).., pouch center at
// 8*M0-4, disc center at 8*M0-3. The sampled skin is recomputed in full
// after every node mutation, so the model is consistent between calls.

use nalgebra::Vector2;
use std::f64::consts::PI;

use crate::errors::{Result, WingMorphError};
use crate::geometry::{self, Point};
use crate::spline::{
    all_pole_iir_filter, exponential_bspline4, interpolation_pole, PlanarCubicSpline,
};
use crate::structure::StructureGeometry;

/// Number of uniform samples the outer input polygon is densified to before
/// the quadrant arcs are extracted
const DENSE_CONTOUR_SAMPLES: usize = 1024;

/// Sampling parameters of the snake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnakeParameters {
    /// Control points per quadrant segment (>= 3)
    pub m0: usize,
    /// Samples per unit knot spacing
    pub r: usize,
    /// Support of the exponential B-spline basis
    pub support: usize,
    /// Total sample budget the sampling rate was derived from
    pub sampling_budget: usize,
}

impl SnakeParameters {
    /// Derives the sampling rate from the external sampling budget
    pub fn derive(m0: usize, sampling_budget: usize) -> Result<SnakeParameters> {
        if m0 < 3 {
            return Err(WingMorphError::Parameter(
                "number of control points per segment must be >= 3".to_string(),
            ));
        }
        let r = (((sampling_budget as f64 - 1.0) / (2.0 * m0 as f64)).ceil() as usize).max(1);
        Ok(SnakeParameters {
            m0,
            r,
            support: 4,
            sampling_budget,
        })
    }

    /// Total number of outer control points
    pub fn m(&self) -> usize {
        4 * self.m0
    }

    /// Number of outer skin samples
    pub fn mr(&self) -> usize {
        self.m() * self.r
    }

    /// Number of samples under the basis support
    pub fn nr(&self) -> usize {
        self.support * self.r
    }

    /// Angular knot step of the closed contour
    pub fn omega(&self) -> f64 {
        2.0 * PI / self.m() as f64
    }

    /// Total node count of the arena
    pub fn node_count(&self) -> usize {
        8 * self.m0 - 2
    }
}

/// Terminal status reported by the external optimizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalStatus {
    pub cancelled: bool,
    pub converged: bool,
}

/// One drawable polyline of the snake decomposition
#[derive(Debug, Clone)]
pub struct ScaleCurve {
    pub points: Vec<Point>,
    pub closed: bool,
}

/// Capability interface the external optimizer drives the snake through
pub trait DeformableModel {
    /// Live node vector in the fixed arena layout
    fn nodes(&self) -> &[Point];
    /// Unconditional overwrite of every node, followed by a skin recompute
    fn set_nodes(&mut self, nodes: &[Point]) -> Result<()>;
    /// Fitting energy; this model defines none
    fn energy(&self) -> f64 {
        0.0
    }
    /// Gradient of the fitting energy; this model defines none
    fn energy_gradient(&self) -> Vec<Vector2<f64>> {
        Vec::new()
    }
    /// Whether the model still accepts optimization
    fn is_alive(&self) -> bool;
    /// Terminal notification from the optimizer; no internal reaction required
    fn update_status(&mut self, cancelled: bool, converged: bool);
    /// Polyline-per-visual-element decomposition for rendering
    fn scales(&self) -> Vec<ScaleCurve>;
}

/// Parametric snake model of a quadrant-symmetric structure
#[derive(Debug, Clone)]
pub struct SplineSnakeModel {
    params: SnakeParameters,
    nodes: Vec<Point>,
    basis_lut: Vec<f64>,
    outer_skin: Vec<Point>,
    inner_skin: [Vec<Point>; 4],
    terminal: Option<TerminalStatus>,
}

impl SplineSnakeModel {
    /// Builds the snake from detected structure geometry.
    ///
    /// The outer polygon is resampled into four arcs of M0 points each,
    /// anchored at the contour points nearest to the rim endpoint of each
    /// boundary polyline; interior spoke nodes are distributed by arc length;
    /// outer knot coefficients are fitted with the periodic single-pole IIR
    /// prefilter and clamped to the image bounds.
    pub fn from_geometry(
        geometry: &StructureGeometry,
        m0: usize,
        sampling_budget: usize,
    ) -> Result<SplineSnakeModel> {
        geometry.check_complete()?;
        let params = SnakeParameters::derive(m0, sampling_budget)?;
        let m = params.m();

        let mut contour =
            geometry::resample_closed(&geometry.outer_contour_points(), DENSE_CONTOUR_SAMPLES);
        if geometry::polygon_orientation(&contour) < 0.0 {
            contour.reverse();
        }

        // rim joint of each boundary = contour point nearest its far endpoint
        let mut joints = [0usize; 4];
        for (i, joint) in joints.iter_mut().enumerate() {
            let boundary = geometry.boundary_points(i);
            let far = boundary[boundary.len() - 1];
            *joint = geometry::nearest_index(&contour, &far);
        }

        // sample M0 contour points per arc between consecutive joints
        let n_contour = contour.len();
        let mut sampled_outer = vec![Point::new(0.0, 0.0); m];
        for arc in 0..4 {
            let mut span = joints[(arc + 1) % 4] as isize - joints[arc] as isize;
            if span < 0 {
                span += n_contour as isize;
            }
            for j in 0..m0 {
                let offset = span as f64 * j as f64 / m0 as f64;
                let index = ((joints[arc] as f64 + offset).round() as usize) % n_contour;
                sampled_outer[arc * m0 + j] = contour[index];
            }
        }

        // knot coefficients interpolating the sampled arcs
        let pole = interpolation_pole(params.omega());
        let mut knots_x: Vec<f64> = sampled_outer.iter().map(|p| p.x).collect();
        let mut knots_y: Vec<f64> = sampled_outer.iter().map(|p| p.y).collect();
        all_pole_iir_filter(&mut knots_x, &[pole]);
        all_pole_iir_filter(&mut knots_y, &[pole]);
        let x_limit = geometry.image_width as f64 - 1.0;
        let y_limit = geometry.image_height as f64 - 1.0;

        let mut nodes = Vec::with_capacity(params.node_count());
        for i in 0..m {
            nodes.push(Point::new(
                knots_x[i].clamp(0.0, x_limit),
                knots_y[i].clamp(0.0, y_limit),
            ));
        }

        // interior spoke nodes by arc length, ordered rim to center
        for arc in 0..4 {
            let boundary = geometry.boundary_points(arc);
            let resampled = geometry::arc_length_resample(&boundary, m0 + 1);
            for i in (1..m0).rev() {
                nodes.push(resampled[i]);
            }
        }

        nodes.push(geometry.pouch_center_point());
        nodes.push(geometry.disc_center_point());

        let mut model = SplineSnakeModel::allocate(params, nodes);
        model.compute_skin();
        Ok(model)
    }

    /// Builds the snake from an explicit node vector in the arena layout.
    ///
    /// This is the optimizer-driven construction path; geometry is allocated
    /// to zero and then overwritten through `set_nodes`.
    pub fn from_nodes(
        m0: usize,
        sampling_budget: usize,
        nodes: &[Point],
    ) -> Result<SplineSnakeModel> {
        let params = SnakeParameters::derive(m0, sampling_budget)?;
        let zeros = vec![Point::new(0.0, 0.0); params.node_count()];
        let mut model = SplineSnakeModel::allocate(params, zeros);
        model.set_nodes(nodes)?;
        Ok(model)
    }

    fn allocate(params: SnakeParameters, nodes: Vec<Point>) -> SplineSnakeModel {
        debug_assert_eq!(nodes.len(), params.node_count());
        let omega = params.omega();
        let r = params.r as f64;
        let basis_lut: Vec<f64> = (0..params.nr())
            .map(|i| exponential_bspline4(i as f64 / r, omega))
            .collect();
        SplineSnakeModel {
            params,
            nodes,
            basis_lut,
            outer_skin: Vec::new(),
            inner_skin: [Vec::new(), Vec::new(), Vec::new(), Vec::new()],
            terminal: None,
        }
    }

    // --- arena index helpers -------------------------------------------------

    fn spoke_start(&self, spoke: usize) -> usize {
        4 * self.params.m0 + spoke * (self.params.m0 - 1)
    }

    fn pouch_center_index(&self) -> usize {
        8 * self.params.m0 - 4
    }

    fn disc_center_index(&self) -> usize {
        8 * self.params.m0 - 3
    }

    /// Outer contour control points
    pub fn outer_control_points(&self) -> &[Point] {
        &self.nodes[0..self.params.m()]
    }

    /// Interior control points of one spoke, ordered rim to center
    pub fn spoke_nodes(&self, spoke: usize) -> &[Point] {
        let start = self.spoke_start(spoke);
        &self.nodes[start..start + self.params.m0 - 1]
    }

    /// Shared center node of the four spokes
    pub fn pouch_center(&self) -> Point {
        self.nodes[self.pouch_center_index()]
    }

    /// Center node of the surrounding disc
    pub fn disc_center(&self) -> Point {
        self.nodes[self.disc_center_index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn control_points_per_segment(&self) -> usize {
        self.params.m0
    }

    pub fn parameters(&self) -> &SnakeParameters {
        &self.params
    }

    pub fn terminal_status(&self) -> Option<TerminalStatus> {
        self.terminal
    }

    // --- skin ----------------------------------------------------------------

    fn compute_skin(&mut self) {
        self.compute_outer_skin();
        self.compute_inner_skin();
    }

    /// Outer skin: MR circular samples of the exponential-B-spline sum over
    /// the outer control points, basis support truncated to NR samples
    fn compute_outer_skin(&mut self) {
        let m = self.params.m();
        let r = self.params.r;
        let mr = self.params.mr() as isize;
        let nr = self.params.nr();

        let mut skin = Vec::with_capacity(mr as usize);
        for i in 0..mr {
            let mut x = 0.0;
            let mut y = 0.0;
            for k in 0..m {
                let mut index = (i - (k * r) as isize) % mr;
                if index < 0 {
                    index += mr;
                }
                let index = index as usize;
                if index >= nr {
                    continue;
                }
                let w = self.basis_lut[index];
                x += self.nodes[k].x * w;
                y += self.nodes[k].y * w;
            }
            skin.push(Point::new(x, y));
        }
        self.outer_skin = skin;
    }

    /// Inner skin: natural cubic spline through each spoke's anchor chain
    /// (rim anchor, interior nodes, center), sampled at R per unit spacing
    fn compute_inner_skin(&mut self) {
        let m0 = self.params.m0;
        let r = self.params.r;
        for spoke in 0..4 {
            let mut anchors = Vec::with_capacity(m0 + 1);
            anchors.push(self.anchor_on_contour(spoke));
            anchors.extend_from_slice(self.spoke_nodes(spoke));
            anchors.push(self.pouch_center());

            let spline = PlanarCubicSpline::through(&anchors);
            let samples: Vec<Point> = (0..m0 * r)
                .map(|i| spline.point_at(i as f64 / r as f64))
                .collect();
            self.inner_skin[spoke] = samples;
        }
    }

    // --- queries ---------------------------------------------------------------

    /// Point on the outer skin where the given spoke attaches
    pub fn anchor_on_contour(&self, spoke: usize) -> Point {
        let index = ((spoke * self.params.m0 + 2) * self.params.r) % self.params.mr();
        self.outer_skin[index]
    }

    /// Raw (unresampled) exterior skin arc between two consecutive anchors;
    /// M0*R+1 points including both anchors
    pub fn exterior_arc(&self, arc: usize) -> Vec<Point> {
        let m0 = self.params.m0;
        let r = self.params.r;
        let mr = self.params.mr();
        let start = (arc * m0 + 2) * r;
        (start..=start + m0 * r)
            .map(|k| self.outer_skin[k % mr])
            .collect()
    }

    /// Closed polygon of one quadrant compartment: exterior arc, next spoke
    /// inward, center, this spoke outward
    pub fn compartment(&self, quadrant: usize) -> Vec<Point> {
        let m0 = self.params.m0;
        let r = self.params.r;

        let mut polygon = self.exterior_arc(quadrant);
        polygon.extend_from_slice(&self.inner_skin[(quadrant + 1) % 4]);
        polygon.push(self.pouch_center());
        polygon.extend(self.inner_skin[quadrant][0..m0 * r].iter().rev());
        polygon
    }

    /// Composite boundary curve: spoke `i` joined to spoke `i+2` through the
    /// center. `i` must be 0 or 1.
    pub fn boundary(&self, i: usize) -> Vec<Point> {
        assert!(i < 2, "composite boundaries are indexed 0 and 1");
        let mut curve = self.inner_skin[i].clone();
        curve.push(self.pouch_center());
        curve.extend(self.inner_skin[i + 2].iter().rev());
        curve
    }

    // --- mutation ----------------------------------------------------------------

    /// Moves the shared center node to the intersection of the diagonals
    /// through the innermost interior nodes of opposite spokes, keeping the
    /// four spokes from diverging at their junction.
    pub fn correct_intersection(&mut self) {
        let m0 = self.params.m0;
        let last = |spoke: usize| self.nodes[self.spoke_start(spoke) + m0 - 2];
        let intersection =
            geometry::line_intersection(&last(0), &last(2), &last(1), &last(3));
        if let Some(center) = intersection {
            let idx = self.pouch_center_index();
            self.nodes[idx] = center;
            self.compute_skin();
        }
    }

    /// Returns a new model with a different control-point density.
    ///
    /// Outer arcs and spoke chains are arc-length resampled; the anchors on
    /// the outer contour and the centers are preserved exactly.
    pub fn resample(&self, new_m0: usize) -> Result<SplineSnakeModel> {
        if new_m0 < 3 {
            return Err(WingMorphError::Parameter(
                "number of control points per segment must be >= 3".to_string(),
            ));
        }
        if new_m0 == self.params.m0 {
            return Ok(self.clone());
        }

        let m0 = self.params.m0;
        let m = self.params.m();
        let params = SnakeParameters::derive(new_m0, self.params.sampling_budget)?;
        let mut nodes = Vec::with_capacity(params.node_count());

        // outer control arcs as wrapped polylines of M0+1 points
        for arc in 0..4 {
            let polyline: Vec<Point> = (0..=m0)
                .map(|i| self.nodes[(arc * m0 + i) % m])
                .collect();
            let resampled = geometry::arc_length_resample(&polyline, new_m0 + 1);
            nodes.extend_from_slice(&resampled[0..new_m0]);
        }

        // spoke chains anchored at the contour and the center
        for spoke in 0..4 {
            let mut polyline = Vec::with_capacity(m0 + 1);
            polyline.push(self.anchor_on_contour(spoke));
            polyline.extend_from_slice(self.spoke_nodes(spoke));
            polyline.push(self.pouch_center());
            let resampled = geometry::arc_length_resample(&polyline, new_m0 + 1);
            nodes.extend_from_slice(&resampled[1..new_m0]);
        }

        nodes.push(self.pouch_center());
        nodes.push(self.disc_center());

        let mut model = SplineSnakeModel::allocate(params, nodes);
        model.compute_skin();
        Ok(model)
    }

    // --- rigid transforms -----------------------------------------------------

    fn apply<F: Fn(&Point) -> Point>(&mut self, f: F) {
        let moved: Vec<Point> = self.nodes.iter().map(|p| f(p)).collect();
        // unconditional overwrite, lengths match by construction
        let _ = self.set_nodes(&moved);
    }

    /// Translates every node by the given vector
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.apply(|p| Point::new(p.x + dx, p.y + dy));
    }

    /// Rotates every node around a center by an angle in radians
    pub fn rotate(&mut self, center: &Point, angle: f64) {
        let (sin, cos) = angle.sin_cos();
        let c = *center;
        self.apply(move |p| {
            Point::new(
                cos * (p.x - c.x) - sin * (p.y - c.y) + c.x,
                sin * (p.x - c.x) + cos * (p.y - c.y) + c.y,
            )
        });
    }

    /// Mirrors every node horizontally about the given center
    pub fn flip_horizontal(&mut self, center: &Point) {
        let cx = center.x;
        self.apply(move |p| Point::new(2.0 * cx - p.x, p.y));
    }

    /// Mirrors every node vertically about the given center
    pub fn flip_vertical(&mut self, center: &Point) {
        let cy = center.y;
        self.apply(move |p| Point::new(p.x, 2.0 * cy - p.y));
    }

    /// Center of gravity of the outer control polygon
    pub fn center_of_gravity(&self) -> Point {
        let m = self.params.m() as f64;
        let mut x = 0.0;
        let mut y = 0.0;
        for p in self.outer_control_points() {
            x += p.x;
            y += p.y;
        }
        Point::new(x / m, y / m)
    }

    /// Expands (or contracts, for negative amplitude) the outer control
    /// points radially from the contour's center of gravity; amplitude in
    /// pixels.
    pub fn expand(&mut self, amplitude: f64) {
        let cog = self.center_of_gravity();
        let m = self.params.m();
        for i in 0..m {
            let direction = self.nodes[i] - cog;
            let norm = direction.norm();
            if norm > 0.0 {
                self.nodes[i] += direction * (amplitude / norm);
            }
        }
        self.compute_skin();
    }
}

impl DeformableModel for SplineSnakeModel {
    fn nodes(&self) -> &[Point] {
        &self.nodes
    }

    fn set_nodes(&mut self, nodes: &[Point]) -> Result<()> {
        if nodes.len() != self.nodes.len() {
            return Err(WingMorphError::InvalidInput(format!(
                "expected {} nodes, got {}",
                self.nodes.len(),
                nodes.len()
            )));
        }
        self.nodes.copy_from_slice(nodes);
        self.compute_skin();
        Ok(())
    }

    fn is_alive(&self) -> bool {
        true
    }

    fn update_status(&mut self, cancelled: bool, converged: bool) {
        self.terminal = Some(TerminalStatus {
            cancelled,
            converged,
        });
    }

    fn scales(&self) -> Vec<ScaleCurve> {
        let mut scales = Vec::with_capacity(8);
        scales.push(ScaleCurve {
            points: self.outer_control_points().to_vec(),
            closed: true,
        });
        scales.push(ScaleCurve {
            points: self.outer_skin.clone(),
            closed: true,
        });
        scales.push(ScaleCurve {
            points: self.boundary(0),
            closed: false,
        });
        scales.push(ScaleCurve {
            points: self.boundary(1),
            closed: false,
        });
        for spoke in 0..4 {
            scales.push(ScaleCurve {
                points: self.inner_skin[spoke].clone(),
                closed: false,
            });
        }
        scales
    }
}

/// Strict model equality: same control-point density and bit-exact node
/// coordinates. Used for regression comparison against gold standards.
impl PartialEq for SplineSnakeModel {
    fn eq(&self, other: &SplineSnakeModel) -> bool {
        self.params.m0 == other.params.m0
            && self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .zip(&other.nodes)
                .all(|(a, b)| a.x.to_bits() == b.x.to_bits() && a.y.to_bits() == b.y.to_bits())
    }
}
