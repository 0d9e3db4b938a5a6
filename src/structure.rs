// Input contract with the external structure-assembly stage: an outer
// contour polygon, four inner boundary polylines running center-to-rim and
// two center points, exchanged as JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{Result, WingMorphError};
use crate::geometry::Point;

fn to_points(pairs: &[[f64; 2]]) -> Vec<Point> {
    pairs.iter().map(|p| Point::new(p[0], p[1])).collect()
}

fn to_pairs(points: &[Point]) -> Vec<[f64; 2]> {
    points.iter().map(|p| [p.x, p.y]).collect()
}

/// Raw structure geometry produced by the detection stage.
///
/// Boundary polylines are ordered from the shared center towards the outer
/// contour, so the far endpoint of each polyline is its rim joint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureGeometry {
    /// Closed outer contour polygon (orientation free)
    pub outer_contour: Vec<[f64; 2]>,
    /// Four inner boundary polylines, center to rim, >= 3 points each
    pub boundaries: [Vec<[f64; 2]>; 4],
    /// Shared center of the four boundaries
    pub pouch_center: [f64; 2],
    /// Center of the surrounding disc
    pub disc_center: [f64; 2],
    /// Dimensions of the source image, used to clamp spline knots
    pub image_width: usize,
    pub image_height: usize,
}

impl StructureGeometry {
    pub fn outer_contour_points(&self) -> Vec<Point> {
        to_points(&self.outer_contour)
    }

    pub fn boundary_points(&self, i: usize) -> Vec<Point> {
        to_points(&self.boundaries[i])
    }

    pub fn pouch_center_point(&self) -> Point {
        Point::new(self.pouch_center[0], self.pouch_center[1])
    }

    pub fn disc_center_point(&self) -> Point {
        Point::new(self.disc_center[0], self.disc_center[1])
    }

    /// Verifies that every element required to build a snake is present
    pub fn check_complete(&self) -> Result<()> {
        if self.outer_contour.len() < 3 {
            return Err(WingMorphError::StructureIncomplete(
                "outer contour missing or degenerate".to_string(),
            ));
        }
        for (i, boundary) in self.boundaries.iter().enumerate() {
            if boundary.len() < 3 {
                return Err(WingMorphError::StructureIncomplete(format!(
                    "boundary {} missing or has fewer than 3 points",
                    i
                )));
            }
        }
        if self.image_width == 0 || self.image_height == 0 {
            return Err(WingMorphError::StructureIncomplete(
                "image dimensions missing".to_string(),
            ));
        }
        Ok(())
    }

    /// Loads structure geometry from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<StructureGeometry> {
        let content = fs::read_to_string(path)?;
        let geometry: StructureGeometry = serde_json::from_str(&content)?;
        Ok(geometry)
    }

    /// Saves structure geometry to a JSON file
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// A named boundary curve handed to the grid mapper.
///
/// The reference endpoint (first point) anchors the role assignment of the
/// snake spokes during projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryCurve {
    pub name: String,
    points: Vec<[f64; 2]>,
}

impl BoundaryCurve {
    pub fn new(name: impl Into<String>, points: Vec<Point>) -> BoundaryCurve {
        BoundaryCurve {
            name: name.into(),
            points: to_pairs(&points),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> Vec<Point> {
        to_points(&self.points)
    }

    pub fn first_point(&self) -> Option<Point> {
        self.points.first().map(|p| Point::new(p[0], p[1]))
    }

    pub fn last_point(&self) -> Option<Point> {
        self.points.last().map(|p| Point::new(p[0], p[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_geometry() -> StructureGeometry {
        StructureGeometry {
            outer_contour: vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]],
            boundaries: [
                vec![[5.0, 5.0], [7.5, 5.0], [10.0, 5.0]],
                vec![[5.0, 5.0], [5.0, 7.5], [5.0, 10.0]],
                vec![[5.0, 5.0], [2.5, 5.0], [0.0, 5.0]],
                vec![[5.0, 5.0], [5.0, 2.5], [5.0, 0.0]],
            ],
            pouch_center: [5.0, 5.0],
            disc_center: [5.2, 4.8],
            image_width: 11,
            image_height: 11,
        }
    }

    #[test]
    fn complete_geometry_passes_check() {
        assert!(square_geometry().check_complete().is_ok());
    }

    #[test]
    fn short_boundary_is_incomplete() {
        let mut geometry = square_geometry();
        geometry.boundaries[2] = vec![[5.0, 5.0], [0.0, 5.0]];
        assert!(matches!(
            geometry.check_complete(),
            Err(WingMorphError::StructureIncomplete(_))
        ));
    }

    #[test]
    fn json_round_trip() {
        let geometry = square_geometry();
        let json = serde_json::to_string(&geometry).unwrap();
        let loaded: StructureGeometry = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.outer_contour, geometry.outer_contour);
        assert_eq!(loaded.pouch_center, geometry.pouch_center);
    }

    #[test]
    fn boundary_curve_endpoints() {
        let curve = BoundaryCurve::new(
            "equator",
            vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(2.0, 0.0)],
        );
        assert_eq!(curve.first_point().unwrap(), Point::new(0.0, 0.0));
        assert_eq!(curve.last_point().unwrap(), Point::new(2.0, 0.0));
        assert_eq!(curve.len(), 3);
    }
}
