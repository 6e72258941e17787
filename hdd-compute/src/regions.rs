//! Named US regions and the spatial join between regions and grid cells.
//!
//! The region definition is a GeoJSON `FeatureCollection` of `Polygon` /
//! `MultiPolygon` features in geographic WGS84 coordinates, one feature per
//! region, the name held in a string property (`REG_NAME` by default).

use crate::grid::normalize_longitude;
use geo::{BoundingRect, Contains, Coord, Intersects, LineString, MultiPolygon, Point, Polygon, Rect};
use hdd_core::error::{HddError, Result};
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::rc::Rc;

/// Property holding the region name in the boundary file.
pub const DEFAULT_NAME_PROPERTY: &str = "REG_NAME";

/// Regions outside the grid's longitude domain.
pub const EXCLUDED_REGIONS: [&str; 2] = ["Alaska", "Pacific Islands"];

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    crs: Option<NamedCrs>,
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct NamedCrs {
    properties: CrsProperties,
}

#[derive(Deserialize)]
struct CrsProperties {
    name: String,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: serde_json::Map<String, serde_json::Value>,
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum Geometry {
    Polygon(Vec<Vec<Vec<f64>>>),
    MultiPolygon(Vec<Vec<Vec<Vec<f64>>>>),
}

fn ring(points: &[Vec<f64>]) -> Result<LineString<f64>> {
    points
        .iter()
        .map(|p| match p.as_slice() {
            [lon, lat, ..] => Ok(Coord {
                x: normalize_longitude(*lon),
                y: *lat,
            }),
            _ => Err(HddError::RegionDefinition(format!(
                "coordinate needs two values, got {p:?}"
            ))),
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::from)
}

fn polygon(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>> {
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| HddError::RegionDefinition("polygon without rings".to_string()))?;
    Ok(Polygon::new(
        ring(exterior)?,
        interiors.iter().map(|r| ring(r)).collect::<Result<Vec<_>>>()?,
    ))
}

impl Geometry {
    fn into_multi_polygon(self) -> Result<MultiPolygon<f64>> {
        match self {
            Geometry::Polygon(rings) => Ok(MultiPolygon(vec![polygon(&rings)?])),
            Geometry::MultiPolygon(parts) => parts
                .iter()
                .map(|rings| polygon(rings))
                .collect::<Result<Vec<_>>>()
                .map(MultiPolygon),
        }
    }
}

/// A named region boundary.
#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    bounds: Option<Rect<f64>>,
}

impl Region {
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        let bounds = geometry.bounding_rect();
        Region {
            name: name.into(),
            geometry,
            bounds,
        }
    }

    /// Strict containment: points on the boundary are outside.
    pub fn contains(&self, point: &Point<f64>) -> bool {
        self.bounds.is_some_and(|b| b.intersects(point)) && self.geometry.contains(point)
    }
}

/// The region definition, minus the excluded regions.
#[derive(Debug, Clone)]
pub struct RegionSet {
    regions: Vec<Region>,
    /// Hash of the definition resource; part of every cache key.
    version: u64,
}

impl RegionSet {
    pub fn new(regions: Vec<Region>, version: u64) -> Self {
        let regions = regions
            .into_iter()
            .filter(|r| !EXCLUDED_REGIONS.contains(&r.name.as_str()))
            .collect();
        RegionSet { regions, version }
    }

    /// Load the boundary file. Any failure is reported as
    /// [`HddError::RegionDefinition`].
    pub fn load(path: &Path, name_property: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            HddError::RegionDefinition(format!("cannot read {}: {e}", path.display()))
        })?;
        let set = RegionSet::from_geojson(&raw, name_property)?;
        log::info!(
            "loaded {} regions from {}",
            set.regions.len(),
            path.display()
        );
        Ok(set)
    }

    pub fn from_geojson(raw: &str, name_property: &str) -> Result<Self> {
        let collection: FeatureCollection = serde_json::from_str(raw)
            .map_err(|e| HddError::RegionDefinition(format!("not a feature collection: {e}")))?;
        if let Some(crs) = &collection.crs {
            let name = crs.properties.name.as_str();
            if !(name.contains("CRS84") || name.contains("4326")) {
                return Err(HddError::RegionDefinition(format!(
                    "boundaries must be geographic WGS84, found {name}"
                )));
            }
        }

        let mut regions = Vec::new();
        for feature in collection.features {
            let Some(geometry) = feature.geometry else {
                continue;
            };
            let name = feature
                .properties
                .get(name_property)
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    HddError::RegionDefinition(format!("feature without {name_property:?}"))
                })?;
            regions.push(Region::new(name, geometry.into_multi_polygon()?));
        }
        if regions.is_empty() {
            return Err(HddError::RegionDefinition("no regions defined".to_string()));
        }

        let mut hasher = DefaultHasher::new();
        raw.hash(&mut hasher);
        name_property.hash(&mut hasher);
        Ok(RegionSet::new(regions, hasher.finish()))
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// First region (in definition order) strictly containing the point.
    pub fn classify(&self, lon: f64, lat: f64) -> Option<&Region> {
        let point = Point::new(normalize_longitude(lon), lat);
        self.regions.iter().find(|r| r.contains(&point))
    }
}

/// Grid cells, as (latitude index, longitude index), grouped by region.
/// Regions without any cell are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionIndex {
    cells: BTreeMap<String, Vec<(usize, usize)>>,
}

impl RegionIndex {
    pub fn build(regions: &RegionSet, latitudes: &[f64], longitudes: &[f64]) -> Self {
        let mut cells: BTreeMap<String, Vec<(usize, usize)>> = BTreeMap::new();
        for (i, &lat) in latitudes.iter().enumerate() {
            for (j, &lon) in longitudes.iter().enumerate() {
                if let Some(region) = regions.classify(lon, lat) {
                    cells.entry(region.name.clone()).or_default().push((i, j));
                }
            }
        }
        RegionIndex { cells }
    }

    pub fn members(&self, region: &str) -> Option<&[(usize, usize)]> {
        self.cells.get(region).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[(usize, usize)])> {
        self.cells
            .iter()
            .map(|(name, cells)| (name.as_str(), cells.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Length and hash of every coordinate of one axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AxisKey {
    len: usize,
    digest: u64,
}

impl AxisKey {
    fn of(axis: &[f64]) -> Self {
        let mut hasher = DefaultHasher::new();
        for value in axis {
            value.to_bits().hash(&mut hasher);
        }
        AxisKey {
            len: axis.len(),
            digest: hasher.finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GridKey {
    version: u64,
    latitudes: AxisKey,
    longitudes: AxisKey,
}

/// Region indexes built once per (grid resolution, region definition version)
/// and shared by every computer using the same definition.
#[derive(Debug)]
pub struct RegionIndexCache {
    regions: RegionSet,
    entries: RefCell<HashMap<GridKey, Rc<RegionIndex>>>,
}

impl RegionIndexCache {
    pub fn new(regions: RegionSet) -> Self {
        RegionIndexCache {
            regions,
            entries: RefCell::new(HashMap::new()),
        }
    }

    pub fn regions(&self) -> &RegionSet {
        &self.regions
    }

    pub fn index_for(&self, latitudes: &[f64], longitudes: &[f64]) -> Rc<RegionIndex> {
        let key = GridKey {
            version: self.regions.version(),
            latitudes: AxisKey::of(latitudes),
            longitudes: AxisKey::of(longitudes),
        };
        if let Some(index) = self.entries.borrow().get(&key) {
            return Rc::clone(index);
        }
        let index = Rc::new(RegionIndex::build(&self.regions, latitudes, longitudes));
        log::info!(
            "built region index for {}x{} grid: {} regions",
            latitudes.len(),
            longitudes.len(),
            index.len()
        );
        self.entries.borrow_mut().insert(key, Rc::clone(&index));
        index
    }

    /// Number of cached grid resolutions.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
