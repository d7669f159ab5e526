//! Site map plans for the datasets of a run.
//!
//! Each data file `<stem>.csv` is expected to have sidecar metadata
//! `<stem>.toml` giving the site's coverage point:
//!
//! ```toml
//! lat = 9.15
//! lon = -79.85
//! ```
//!
//! The plan (projection, extent, labelled sites) is written as JSON for a
//! renderer; nothing is drawn here.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::SadError;

/// Degrees of padding around the outermost sites.
const MAP_PADDING_DEGREES: f64 = 10.0;

#[derive(Debug, Deserialize)]
struct SiteMetadata {
    lat: f64,
    lon: f64,
}

/// A research site and its label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Site {
    pub label: String,
    pub lat: f64,
    pub lon: f64,
}

/// Latitude/longitude bounds of a map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapExtent {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl MapExtent {
    pub const WHOLE_GLOBE: MapExtent = MapExtent {
        min_lat: -90.0,
        min_lon: -180.0,
        max_lat: 90.0,
        max_lon: 180.0,
    };

    /// Bounds of `sites` padded by `padding` degrees, clamped to the globe.
    pub fn around(sites: &[Site], padding: f64) -> Option<Self> {
        let first = sites.first()?;
        let mut extent = MapExtent {
            min_lat: first.lat,
            min_lon: first.lon,
            max_lat: first.lat,
            max_lon: first.lon,
        };
        for site in &sites[1..] {
            extent.min_lat = extent.min_lat.min(site.lat);
            extent.min_lon = extent.min_lon.min(site.lon);
            extent.max_lat = extent.max_lat.max(site.lat);
            extent.max_lon = extent.max_lon.max(site.lon);
        }
        Some(MapExtent {
            min_lat: (extent.min_lat - padding).max(-90.0),
            min_lon: (extent.min_lon - padding).max(-180.0),
            max_lat: (extent.max_lat + padding).min(90.0),
            max_lon: (extent.max_lon + padding).min(180.0),
        })
    }
}

/// Everything a renderer needs to draw the field-site map.
#[derive(Debug, Clone, Serialize)]
pub struct SiteMap {
    pub name: String,
    /// Equidistant cylindrical
    pub projection: String,
    pub extent: MapExtent,
    pub sites: Vec<Site>,
}

/// Four-character site label taken from a data file name.
pub fn site_label(data_path: &Path) -> String {
    data_path
        .file_stem()
        .map(|s| s.to_string_lossy().chars().take(4).collect())
        .unwrap_or_default()
}

/// `map_` followed by the sorted site labels joined by `_`.
pub fn map_name(data_paths: &[PathBuf]) -> String {
    let mut labels: Vec<String> = data_paths.iter().map(|p| site_label(p)).collect();
    labels.sort();
    format!("map_{}", labels.join("_"))
}

/// Read a site from the metadata file next to `data_path`.
pub fn read_site(data_path: &Path) -> Result<Site, SadError> {
    let meta_path = data_path.with_extension("toml");
    let content = std::fs::read_to_string(&meta_path).map_err(|e| {
        SadError::WorkflowError(format!(
            "cannot read site metadata {}: {e}",
            meta_path.display()
        ))
    })?;
    let meta: SiteMetadata = toml::from_str(&content)?;
    if !(-90.0..=90.0).contains(&meta.lat) || !(-180.0..=180.0).contains(&meta.lon) {
        return Err(SadError::ParseError(format!(
            "site metadata {} has coordinates out of range ({}, {})",
            meta_path.display(),
            meta.lat,
            meta.lon
        )));
    }
    Ok(Site {
        label: site_label(data_path),
        lat: meta.lat,
        lon: meta.lon,
    })
}

/// Build the map plan for a set of data files.
pub fn plan_site_map(
    data_paths: &[PathBuf],
    map_name: String,
    whole_globe: bool,
) -> Result<SiteMap, SadError> {
    let sites = data_paths
        .iter()
        .map(|p| read_site(p))
        .collect::<Result<Vec<_>, _>>()?;

    let extent = if whole_globe {
        MapExtent::WHOLE_GLOBE
    } else {
        MapExtent::around(&sites, MAP_PADDING_DEGREES)
            .ok_or_else(|| SadError::WorkflowError("no sites to map".to_string()))?
    };

    Ok(SiteMap {
        name: map_name,
        projection: "cyl".to_string(),
        extent,
        sites,
    })
}

/// Write `<output_dir>/<name>.json` unless a map for these sites already exists.
///
/// Returns `true` when a new plan was written.
pub fn make_map(
    data_paths: &[PathBuf],
    output_dir: &Path,
    name: Option<&str>,
    whole_globe: bool,
) -> Result<bool, SadError> {
    let name = name.map_or_else(|| map_name(data_paths), str::to_string);
    let path = output_dir.join(format!("{name}.json"));
    if path.is_file() {
        debug!(path = %path.display(), "site map already exists");
        return Ok(false);
    }

    let plan = plan_site_map(data_paths, name, whole_globe)?;
    std::fs::write(&path, serde_json::to_string_pretty(&plan)?)?;
    info!(path = %path.display(), sites = plan.sites.len(), "wrote site map plan");
    Ok(true)
}
