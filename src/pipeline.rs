use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::Config;
use crate::errors::Result;
use crate::grid::Grid;
use crate::image_io::{to_binary_raster, InputImage};
use crate::labeling::label_regions;
use crate::output::{write_interface_matrix_csv, write_region_stats_csv};
use crate::projection::generate_grid;
use crate::snake::SplineSnakeModel;
use crate::structure::{BoundaryCurve, StructureGeometry};

/// Label a segmented image and write its region morphometrics
pub fn process_image(input: InputImage, config: &Config) -> Result<()> {
    let raster = to_binary_raster(&input, config);
    let result = label_regions(&raster)?;
    info!(
        "{}: {} regions labeled",
        input.filename,
        result.raster.n_labels()
    );
    for stats in &result.stats {
        debug!(
            "region {}: area {} perimeter {} unbounded {}",
            stats.label, stats.area, stats.perimeter, stats.is_unbounded
        );
    }

    write_region_stats_csv(&result, &config.output_dir, &input.filename)?;
    write_interface_matrix_csv(&result, &config.output_dir, &input.filename)?;
    Ok(())
}

/// Build the snake model from a structure geometry file, project it onto
/// the flat spherical grid and write the grid as text. Returns the path of
/// the written grid file.
pub fn process_structure<P: AsRef<Path>>(path: P, config: &Config) -> Result<PathBuf> {
    let path = path.as_ref();
    let geometry = StructureGeometry::from_file(path)?;

    let mut snake = SplineSnakeModel::from_geometry(
        &geometry,
        config.control_points_per_segment,
        config.expression_num_points,
    )?;
    if config.correct_boundaries_intersection {
        snake.correct_intersection();
    }
    debug!(
        "snake built with {} nodes, sampling rate {}",
        snake.node_count(),
        snake.parameters().r
    );

    let boundary_a = BoundaryCurve::new("boundary-a", snake.boundary(0));
    let boundary_b = BoundaryCurve::new("boundary-b", snake.boundary(1));
    let grid = generate_grid(
        &snake,
        &boundary_a,
        &boundary_b,
        config.equator.into(),
        config.grid_num_points,
    )?;
    info!("projection grid of side {} generated", grid.side());

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("structure");
    let output_dir = Path::new(&config.output_dir).join("grids");
    std::fs::create_dir_all(&output_dir)?;
    let output_path = output_dir.join(format!("{}_grid.txt", stem));
    grid.write(&output_path)?;
    Ok(output_path)
}

/// Reloads a written grid, mostly for regression comparison of pipelines
pub fn load_grid<P: AsRef<Path>>(path: P) -> Result<Grid> {
    Grid::read(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::f64::consts::PI;

    fn structure_file(dir: &Path) -> PathBuf {
        let pouch = [55.0, 47.0];
        let outer: Vec<[f64; 2]> = (0..64)
            .map(|i| {
                let a = 2.0 * PI * i as f64 / 64.0;
                [50.0 + 40.0 * a.cos(), 50.0 + 40.0 * a.sin()]
            })
            .collect();
        let spoke = |rim: [f64; 2]| -> Vec<[f64; 2]> {
            (0..=4)
                .map(|i| {
                    let t = i as f64 / 4.0;
                    [
                        pouch[0] + t * (rim[0] - pouch[0]),
                        pouch[1] + t * (rim[1] - pouch[1]),
                    ]
                })
                .collect()
        };
        let geometry = StructureGeometry {
            outer_contour: outer,
            boundaries: [
                spoke([90.0, 50.0]),
                spoke([50.0, 90.0]),
                spoke([10.0, 50.0]),
                spoke([50.0, 10.0]),
            ],
            pouch_center: pouch,
            disc_center: [52.0, 48.0],
            image_width: 101,
            image_height: 101,
        };
        let path = dir.join("structure.json");
        geometry.write(&path).unwrap();
        path
    }

    #[test]
    fn structure_pipeline_writes_a_readable_grid() {
        let dir = env::temp_dir().join(format!("wingmorph_pipe_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let structure_path = structure_file(&dir);

        let mut config = Config::default();
        config.output_dir = dir.to_string_lossy().to_string();
        config.grid_num_points = 9;

        let grid_path = process_structure(&structure_path, &config).unwrap();
        let grid = load_grid(&grid_path).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(grid.side(), 2 * 9 - 1);
    }
}
