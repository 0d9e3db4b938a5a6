use std::fs;
use std::path::Path;

use csv::Writer;

use crate::errors::Result;
use crate::labeling::LabelingResult;

/// Write per-region morphometric features to CSV
pub fn write_region_stats_csv<P: AsRef<Path>>(
    result: &LabelingResult,
    output_dir: P,
    filename: &str,
) -> Result<()> {
    let output_path = output_dir
        .as_ref()
        .join("regions")
        .join(format!("{}.csv", filename));

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(&output_path)?;

    writer.write_record([
        "Label",
        "Area",
        "Perimeter",
        "BBox_X_Min",
        "BBox_Y_Min",
        "BBox_X_Max",
        "BBox_Y_Max",
        "Unbounded",
        "Background_Interface",
        "Ellipse_Center_X",
        "Ellipse_Center_Y",
        "Ellipse_Major",
        "Ellipse_Minor",
        "Ellipse_Angle",
    ])?;

    for stats in &result.stats {
        let (cx, cy, major, minor, angle) = match &stats.ellipse {
            Some(e) => (
                format!("{:.6}", e.center.x),
                format!("{:.6}", e.center.y),
                format!("{:.6}", e.major_axis),
                format!("{:.6}", e.minor_axis),
                format!("{:.6}", e.angle),
            ),
            None => (
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ),
        };
        writer.write_record([
            stats.label.to_string(),
            stats.area.to_string(),
            stats.perimeter.to_string(),
            stats.bounding_box.x_min.to_string(),
            stats.bounding_box.y_min.to_string(),
            stats.bounding_box.x_max.to_string(),
            stats.bounding_box.y_max.to_string(),
            (stats.is_unbounded as u8).to_string(),
            result.interface_length(stats.label, 0).to_string(),
            cx,
            cy,
            major,
            minor,
            angle,
        ])?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Write the full label interface matrix to CSV, background row included
pub fn write_interface_matrix_csv<P: AsRef<Path>>(
    result: &LabelingResult,
    output_dir: P,
    filename: &str,
) -> Result<()> {
    let output_path = output_dir
        .as_ref()
        .join("regions")
        .join(format!("{}_interfaces.csv", filename));

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(&output_path)?;
    let n = result.interface_lengths.len();

    let mut header = vec!["Label".to_string()];
    header.extend((0..n).map(|j| j.to_string()));
    writer.write_record(&header)?;

    for (i, row) in result.interface_lengths.iter().enumerate() {
        let mut record = vec![i.to_string()];
        record.extend(row.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}
