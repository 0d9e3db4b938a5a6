// Square structured grid of 2D sample positions, the output of the
// projection stage. Rows and columns use the same point count, always odd
// (2n-1 for n samples per half axis), so the central row and column are the
// morphed equator and meridian.

use std::fs;
use std::fmt::Write as _;
use std::path::Path;

use crate::errors::{Result, WingMorphError};
use crate::geometry::Point;

/// Equator direction of the synthetic sphere-like grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SphereEquator {
    Horizontal,
    Vertical,
}

/// Structured grid with one quadrilateral cell per group of four neighboring
/// points; indexed `[row][column]`
#[derive(Debug, Clone)]
pub struct Grid {
    points: Vec<Vec<Point>>,
    side: usize,
}

impl Grid {
    /// Allocates a grid of `side` x `side` points at the origin
    pub fn new(side: usize) -> Grid {
        Grid {
            points: vec![vec![Point::new(0.0, 0.0); side]; side],
            side,
        }
    }

    /// Number of points per dimension
    pub fn side(&self) -> usize {
        self.side
    }

    pub fn point(&self, row: usize, column: usize) -> Point {
        self.points[row][column]
    }

    pub fn set_point(&mut self, row: usize, column: usize, p: Point) {
        self.points[row][column] = p;
    }

    /// Overwrites one full row
    pub fn set_row(&mut self, row: usize, line: &[Point]) {
        debug_assert_eq!(line.len(), self.side);
        self.points[row].copy_from_slice(line);
    }

    /// Overwrites one full column
    pub fn set_column(&mut self, column: usize, line: &[Point]) {
        debug_assert_eq!(line.len(), self.side);
        for (row, p) in line.iter().enumerate() {
            self.points[row][column] = *p;
        }
    }

    /// Writes the grid as text: one line per row, tab-separated x and y with
    /// six decimals per point
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut content = String::new();
        for row in &self.points {
            for (j, p) in row.iter().enumerate() {
                if j > 0 {
                    content.push('\t');
                }
                // writing to a String cannot fail
                let _ = write!(content, "{:.6}\t{:.6}", p.x, p.y);
            }
            content.push('\n');
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Reads a grid written by `write`. The side length is inferred from the
    /// line count; every line must carry exactly two tokens per point.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Grid> {
        let content = fs::read_to_string(path)?;
        let lines: Vec<&str> = content.lines().collect();
        let side = lines.len();
        if side == 0 {
            return Err(WingMorphError::GridFormat("empty grid file".to_string()));
        }

        let mut grid = Grid::new(side);
        for (i, line) in lines.iter().enumerate() {
            let tokens: Vec<&str> = line.split('\t').collect();
            if tokens.len() != 2 * side {
                return Err(WingMorphError::GridFormat(format!(
                    "line {} has {} values, expected {}",
                    i + 1,
                    tokens.len(),
                    2 * side
                )));
            }
            for j in 0..side {
                let x: f64 = tokens[2 * j].trim().parse().map_err(|_| {
                    WingMorphError::GridFormat(format!("invalid number on line {}", i + 1))
                })?;
                let y: f64 = tokens[2 * j + 1].trim().parse().map_err(|_| {
                    WingMorphError::GridFormat(format!("invalid number on line {}", i + 1))
                })?;
                grid.points[i][j] = Point::new(x, y);
            }
        }
        Ok(grid)
    }

    /// Synthetic grid wrapped around a sphere in its own index space, used
    /// as the target domain of circular expression maps. Rows (or columns)
    /// shrink elliptically towards the poles on the side orthogonal to the
    /// equator.
    pub fn sphere_like(side: usize, equator: SphereEquator) -> Grid {
        let mut grid = Grid::new(side);
        let center = ((side - 1) as f64 / 2.0).round();
        let h = center;

        for i in 0..side {
            for j in 0..side {
                let x = i as f64 - center;
                let y = j as f64 - center;
                let p = match equator {
                    SphereEquator::Vertical => {
                        let scaling = (1.0 - (x / h) * (x / h)).max(0.0).sqrt();
                        Point::new(i as f64, y * scaling + center)
                    }
                    SphereEquator::Horizontal => {
                        let scaling = (1.0 - (y / h) * (y / h)).max(0.0).sqrt();
                        Point::new(x * scaling + center, j as f64)
                    }
                };
                grid.points[i][j] = p;
            }
        }
        grid
    }
}

/// Grids are equal when every coordinate is equal
impl PartialEq for Grid {
    fn eq(&self, other: &Grid) -> bool {
        self.side == other.side && self.points == other.points
    }
}
