//! GRIB2 reader for Lambert conformal model output (HRRR, RRFS).
//!
//! A bounds-checked structural pass ([`inventory::validate`]) runs first; the `grib`
//! crate then parses the file, and each submessage it yields is both described
//! ([`FieldRecord`]) and, when selected, unpacked in the same step. Fields sharing a
//! name (the same parameter on several levels or layers) are stacked along a leading
//! `{name}_levels` dimension, ordered by their surface values.

pub mod inventory;
pub mod lambert;
pub mod naming;

use crate::dataset::error::DatasetError;
use crate::dataset::gridded::Dataset;
use crate::dataset::reader::DatasetReader;
use crate::dataset::{GridArray, LAT_NAME, LON_NAME, X_DIM, Y_DIM};
use inventory::{FieldRecord, GridInfo};
use lambert::LambertConformal;
use log::{debug, warn};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;

/// One named field in a GRIB2 file.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub name: String,
    pub record: FieldRecord,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Grib2Reader;

impl Grib2Reader {
    pub fn new() -> Self {
        Self
    }

    /// Every field in the file, in storage order, with its derived variable name.
    pub fn inventory(&self, path: &Path) -> Result<Vec<FieldEntry>, DatasetError> {
        let (entries, _) = walk(path, |_| Ok(false))?;
        Ok(entries)
    }

    /// Distinct variable names in the file, in order of first appearance.
    pub fn variable_names(&self, path: &Path) -> Result<Vec<String>, DatasetError> {
        let mut names: Vec<String> = Vec::new();
        for entry in self.inventory(path)? {
            if !names.contains(&entry.name) {
                names.push(entry.name);
            }
        }
        Ok(names)
    }

    fn read(&self, path: &Path, wanted: Option<&[String]>) -> Result<Dataset, DatasetError> {
        let mut grid: Option<LambertConformal> = None;
        let (entries, mut fields) = walk(path, |entry| {
            let record = &entry.record;
            let consistent = match (&record.grid, &grid) {
                (GridInfo::Unsupported(template), None) => {
                    return Err(DatasetError::UnsupportedGrid(*template))
                }
                (GridInfo::Lambert(_), None) => true,
                (GridInfo::Lambert(this), Some(first)) => this == first,
                (GridInfo::Unsupported(_), Some(_)) => false,
            };
            if !consistent {
                return Err(malformed(
                    path,
                    format!("field '{}' is on a different grid", entry.name),
                ));
            }
            if let GridInfo::Lambert(this) = &record.grid {
                if this.nx * this.ny != record.num_points as usize {
                    return Err(malformed(
                        path,
                        format!(
                            "field '{}' declares {} points on a {}x{} grid",
                            entry.name, record.num_points, this.nx, this.ny
                        ),
                    ));
                }
                if grid.is_none() {
                    grid = Some(this.clone());
                }
            }
            Ok(wanted.map_or(true, |names| names.contains(&entry.name)))
        })?;
        let grid = grid.ok_or_else(|| malformed(path, "file contains no GRIB2 fields"))?;

        if let Some(names) = wanted {
            for name in names {
                if !entries.iter().any(|entry| &entry.name == name) {
                    warn!("Variable '{}' is not present in '{}'", name, path.display());
                }
            }
        }

        let (lats, lons) = grid.latlons()?;
        let mut dataset = Dataset::new()
            .with_attr("source", path.display().to_string())
            .with_attr("grid", "lambert_conformal")
            .with_coordinate(LAT_NAME, plane(&grid, lats)?)?
            .with_coordinate(LON_NAME, plane(&grid, lons)?)?;

        let selected: Vec<bool> = fields.iter().map(Option::is_some).collect();
        for (name, mut indices) in group_by_name(&entries, &selected) {
            level_order(&entries, &mut indices);
            let array = if indices.len() == 1 {
                plane(&grid, take(path, &mut fields, indices[0])?)?
            } else {
                let mut values = Vec::with_capacity(indices.len() * grid.nx * grid.ny);
                for &index in &indices {
                    values.extend(take(path, &mut fields, index)?);
                }
                GridArray::new(
                    vec![format!("{name}_levels"), Y_DIM.to_string(), X_DIM.to_string()],
                    vec![indices.len(), grid.ny, grid.nx],
                    values,
                )?
            };
            dataset.insert_variable(name, array)?;
        }

        debug!(
            "Opened '{}' with {} of {} fields",
            path.display(),
            selected.iter().filter(|s| **s).count(),
            entries.len()
        );
        Ok(dataset)
    }
}

impl DatasetReader for Grib2Reader {
    fn open(&self, path: &Path) -> Result<Dataset, DatasetError> {
        self.read(path, None)
    }

    fn open_filtered(&self, path: &Path, variables: &[String]) -> Result<Dataset, DatasetError> {
        self.read(path, Some(variables))
    }
}

fn open_file(path: &Path) -> Result<BufReader<File>, DatasetError> {
    let file = File::open(path).map_err(|e| DatasetError::Open(path.to_path_buf(), e))?;
    Ok(BufReader::new(file))
}

fn malformed(path: &Path, message: impl ToString) -> DatasetError {
    DatasetError::Malformed {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// Describes every submessage in file order and unpacks the values of those
/// `decode` accepts. Metadata and values come from the same `grib` submessage.
fn walk(
    path: &Path,
    mut decode: impl FnMut(&FieldEntry) -> Result<bool, DatasetError>,
) -> Result<(Vec<FieldEntry>, Vec<Option<Vec<f32>>>), DatasetError> {
    let mut reader = open_file(path)?;
    let expected = inventory::validate(&mut reader).map_err(|e| malformed(path, e))?;
    reader
        .seek(SeekFrom::Start(0))
        .map_err(|e| DatasetError::Open(path.to_path_buf(), e))?;
    let grib2 = grib::from_reader(reader).map_err(|e| malformed(path, e))?;

    let decode_error = |index: usize, e: grib::GribError| DatasetError::Decode {
        path: path.to_path_buf(),
        index,
        message: e.to_string(),
    };

    let mut entries = Vec::with_capacity(expected);
    let mut fields = Vec::with_capacity(expected);
    for (index, (_, submessage)) in grib2.iter().enumerate() {
        let record =
            FieldRecord::from_submessage(index, &submessage).map_err(|e| malformed(path, e))?;
        let entry = FieldEntry {
            name: naming::variable_name(record.discipline, &record.grid, &record.product),
            record,
        };

        let values = if decode(&entry)? {
            let points = entry.record.num_points as usize;
            let decoder = grib::Grib2SubmessageDecoder::from(submessage)
                .map_err(|e| decode_error(index, e))?;
            let values: Vec<f32> = decoder
                .dispatch()
                .map_err(|e| decode_error(index, e))?
                .collect();
            if values.len() != points {
                return Err(DatasetError::Decode {
                    path: path.to_path_buf(),
                    index,
                    message: format!("expected {} values, got {}", points, values.len()),
                });
            }
            Some(values)
        } else {
            None
        };

        entries.push(entry);
        fields.push(values);
    }

    if entries.len() != expected {
        return Err(malformed(
            path,
            format!("found {} data sections but {} fields", expected, entries.len()),
        ));
    }
    Ok((entries, fields))
}

fn plane(grid: &LambertConformal, values: Vec<f32>) -> Result<GridArray, DatasetError> {
    GridArray::new(vec![Y_DIM, X_DIM], vec![grid.ny, grid.nx], values)
}

fn take(
    path: &Path,
    fields: &mut [Option<Vec<f32>>],
    index: usize,
) -> Result<Vec<f32>, DatasetError> {
    fields
        .get_mut(index)
        .and_then(Option::take)
        .ok_or_else(|| DatasetError::Decode {
            path: path.to_path_buf(),
            index,
            message: "field was not decoded".to_string(),
        })
}

/// Selected field indices grouped by name, in order of first appearance.
fn group_by_name(entries: &[FieldEntry], selected: &[bool]) -> Vec<(String, Vec<usize>)> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (index, entry) in entries.iter().enumerate() {
        if !selected[index] {
            continue;
        }
        match positions.get(entry.name.as_str()) {
            Some(&position) => groups[position].1.push(index),
            None => {
                positions.insert(&entry.name, groups.len());
                groups.push((entry.name.clone(), vec![index]));
            }
        }
    }
    groups
}

/// Orders stacked fields by (first surface, second surface) value.
fn level_order(entries: &[FieldEntry], indices: &mut [usize]) {
    indices.sort_by(|&a, &b| {
        let pa = &entries[a].record.product;
        let pb = &entries[b].record.product;
        pa.first_surface
            .value()
            .total_cmp(&pb.first_surface.value())
            .then(pa.second_surface.value().total_cmp(&pb.second_surface.value()))
    });
}
