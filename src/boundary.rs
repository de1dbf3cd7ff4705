//! Boundary loading: reads a country boundary dataset and filters it down to a
//! single named country.
//!
//! Two on-disk formats are understood, chosen by file extension: ESRI
//! shapefiles (`.shp`, attributes from the sibling `.dbf`) and GeoJSON
//! feature collections (`.geojson` / `.json`).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use geojson::GeoJson;
use serde::Serialize;
use shapefile::dbase::FieldValue;
use shapefile::{PolygonRing, Shape};
use tracing::{debug, info, warn};

use crate::error::LoadError;
use crate::geometry::{MultiPolygon, Polygon, Ring};

/// One administrative region and its outline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundaryRecord {
    pub name: String,
    pub geometry: MultiPolygon,
}

/// Region-keyed geometry table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryTable {
    rows: Vec<BoundaryRecord>,
}

impl BoundaryTable {
    /// A table with only the geometry column defined and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<BoundaryRecord>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[BoundaryRecord] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<BoundaryRecord> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn head(&self, n: usize) -> &[BoundaryRecord] {
        &self.rows[..n.min(self.rows.len())]
    }
}

/// Loads the boundary dataset at `path` and keeps the rows whose `name_field`
/// attribute equals `country`.
///
/// A `country` that matches nothing yields an empty table. A dataset where no
/// record carries `name_field` at all is a [`LoadError::MissingColumn`].
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_boundaries(
    path: &Path,
    name_field: &str,
    country: &str,
) -> Result<BoundaryTable, LoadError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let scan = match extension.as_str() {
        "shp" => read_shapefile(path, name_field, country)?,
        "geojson" | "json" => read_geojson(path, name_field, country)?,
        _ => return Err(LoadError::UnsupportedFormat(path.display().to_string())),
    };

    if scan.total > 0 && !scan.saw_field {
        return Err(LoadError::MissingColumn {
            column: name_field.to_string(),
            context: path.display().to_string(),
        });
    }

    info!(
        total = scan.total,
        matched = scan.rows.len(),
        country,
        "Boundary dataset loaded"
    );
    if scan.rows.len() > 1 {
        warn!(
            matched = scan.rows.len(),
            country,
            "Boundary filter matched more than one row; each is joined separately"
        );
    }

    Ok(BoundaryTable::from_rows(scan.rows))
}

/// Accumulated result of walking every record of a boundary source.
#[derive(Default)]
struct Scan {
    rows: Vec<BoundaryRecord>,
    total: usize,
    saw_field: bool,
}

impl Scan {
    fn offer(
        &mut self,
        name: Option<String>,
        country: &str,
        geometry: impl FnOnce() -> Option<MultiPolygon>,
    ) {
        self.total += 1;
        let Some(name) = name else {
            return;
        };
        self.saw_field = true;
        if name != country {
            return;
        }
        match geometry() {
            Some(geometry) => self.rows.push(BoundaryRecord { name, geometry }),
            None => warn!(name = %name, "Matching boundary row has no polygon geometry, skipping"),
        }
    }
}

fn read_shapefile(path: &Path, name_field: &str, country: &str) -> Result<Scan, LoadError> {
    let mut reader = shapefile::Reader::from_path(path)?;
    let mut scan = Scan::default();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;
        let name = record.get(name_field).map(field_text);
        scan.offer(name, country, || shape_geometry(shape));
    }

    debug!(records = scan.total, "Shapefile scanned");
    Ok(scan)
}

/// Text form of a dBase attribute. Null values and types with no sensible
/// text form become the empty string, which never names a country.
fn field_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Character(Some(text)) => text.trim_end_matches([' ', '\0']).to_string(),
        FieldValue::Memo(text) => text.clone(),
        FieldValue::Numeric(Some(n)) => n.to_string(),
        FieldValue::Integer(n) => n.to_string(),
        _ => String::new(),
    }
}

macro_rules! polygon_rings {
    ($polygon:expr) => {
        $polygon
            .rings()
            .iter()
            .map(|ring| {
                let points: Ring = ring.points().iter().map(|p| (p.x, p.y)).collect();
                (matches!(ring, PolygonRing::Outer(_)), points)
            })
            .collect::<Vec<_>>()
    };
}

fn shape_geometry(shape: Shape) -> Option<MultiPolygon> {
    let rings = match shape {
        Shape::Polygon(p) => polygon_rings!(p),
        Shape::PolygonM(p) => polygon_rings!(p),
        Shape::PolygonZ(p) => polygon_rings!(p),
        _ => return None,
    };
    Some(assemble_rings(rings))
}

/// Groups a flat ring list into polygons: each outer ring opens a new
/// polygon, and inner rings attach to the most recent one.
fn assemble_rings(rings: Vec<(bool, Ring)>) -> MultiPolygon {
    let mut polygons: Vec<Polygon> = Vec::new();
    for (outer, ring) in rings {
        match polygons.last_mut() {
            Some(last) if !outer => last.holes.push(ring),
            _ => polygons.push(Polygon::new(ring)),
        }
    }
    MultiPolygon(polygons)
}

fn read_geojson(path: &Path, name_field: &str, country: &str) -> Result<Scan, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let collection = match GeoJson::from_reader(BufReader::new(file)).map_err(geojson::Error::from)? {
        GeoJson::FeatureCollection(collection) => collection,
        _ => {
            return Err(LoadError::UnsupportedFormat(format!(
                "{} (not a FeatureCollection)",
                path.display()
            )));
        }
    };

    let mut scan = Scan::default();
    for feature in collection.features {
        let name = feature.property(name_field).map(|v| match v.as_str() {
            Some(s) => s.to_string(),
            None => v.to_string(),
        });
        scan.offer(name, country, || {
            feature.geometry.as_ref().and_then(|g| geojson_geometry(&g.value))
        });
    }

    debug!(features = scan.total, "GeoJSON scanned");
    Ok(scan)
}

fn geojson_ring(ring: &[Vec<f64>]) -> Ring {
    ring.iter()
        .filter(|p| p.len() >= 2)
        .map(|p| (p[0], p[1]))
        .collect()
}

fn geojson_polygon(rings: &[Vec<Vec<f64>>]) -> Option<Polygon> {
    let (exterior, holes) = rings.split_first()?;
    Some(Polygon {
        exterior: geojson_ring(exterior),
        holes: holes.iter().map(|r| geojson_ring(r)).collect(),
    })
}

fn geojson_geometry(value: &geojson::Value) -> Option<MultiPolygon> {
    match value {
        geojson::Value::Polygon(rings) => geojson_polygon(rings).map(|p| MultiPolygon(vec![p])),
        geojson::Value::MultiPolygon(polygons) => Some(MultiPolygon(
            polygons.iter().filter_map(|p| geojson_polygon(p)).collect(),
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    const COUNTRIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"ADMIN": "Indonesia"},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[95.0, -6.0], [141.0, -6.0], [141.0, 5.0], [95.0, 5.0], [95.0, -6.0]]],
                        [[[105.0, -9.0], [115.0, -9.0], [115.0, -7.0], [105.0, -9.0]]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": {"ADMIN": "Malaysia"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[100.0, 1.0], [104.0, 1.0], [104.0, 6.0], [100.0, 1.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": {"ADMIN": "Nowhere"},
                "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}
            }
        ]
    }"#;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = env::temp_dir().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_geojson_filters_to_target() {
        let path = write_temp("mobility_choropleth_boundary_filter.geojson", COUNTRIES);
        let table = load_boundaries(&path, "ADMIN", "Indonesia").unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].name, "Indonesia");
        assert_eq!(table.rows()[0].geometry.polygons().len(), 2);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_absent_target_yields_empty_table() {
        let path = write_temp("mobility_choropleth_boundary_absent.geojson", COUNTRIES);
        let table = load_boundaries(&path, "ADMIN", "Atlantis").unwrap();

        assert!(table.is_empty());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_non_polygon_match_is_skipped() {
        let path = write_temp("mobility_choropleth_boundary_point.geojson", COUNTRIES);
        let table = load_boundaries(&path, "ADMIN", "Nowhere").unwrap();

        assert!(table.is_empty());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_name_field_is_error() {
        let path = write_temp("mobility_choropleth_boundary_field.geojson", COUNTRIES);
        let result = load_boundaries(&path, "NAME_EN", "Indonesia");

        assert!(matches!(result, Err(LoadError::MissingColumn { .. })));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_is_error() {
        let path = env::temp_dir().join("mobility_choropleth_does_not_exist.shp");
        assert!(load_boundaries(&path, "ADMIN", "Indonesia").is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let path = PathBuf::from("countries.kml");
        assert!(matches!(
            load_boundaries(&path, "ADMIN", "Indonesia"),
            Err(LoadError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_assemble_rings_attaches_holes() {
        let outer = vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 0.0)];
        let hole = vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 1.0)];
        let second = vec![(10.0, 10.0), (11.0, 10.0), (11.0, 11.0), (10.0, 10.0)];

        let geom = assemble_rings(vec![(true, outer), (false, hole), (true, second)]);

        assert_eq!(geom.polygons().len(), 2);
        assert_eq!(geom.polygons()[0].holes.len(), 1);
        assert!(geom.polygons()[1].holes.is_empty());
    }

    fn write_countries_shapefile(path: &Path) {
        use shapefile::dbase::{FieldName, Record, TableWriterBuilder};
        use shapefile::{Point, Polygon as ShpPolygon, Writer};

        let ring = |coords: &[(f64, f64)]| coords.iter().map(|&(x, y)| Point::new(x, y)).collect::<Vec<_>>();
        let indonesia = ShpPolygon::with_rings(vec![
            PolygonRing::Outer(ring(&[(95.0, -6.0), (95.0, 5.0), (120.0, 5.0), (120.0, -6.0), (95.0, -6.0)])),
            PolygonRing::Inner(ring(&[(100.0, -2.0), (110.0, -2.0), (110.0, 2.0), (100.0, 2.0), (100.0, -2.0)])),
            PolygonRing::Outer(ring(&[(130.0, -9.0), (130.0, -1.0), (141.0, -1.0), (141.0, -9.0), (130.0, -9.0)])),
        ]);
        let malaysia = ShpPolygon::new(PolygonRing::Outer(ring(&[
            (100.0, 1.0),
            (100.0, 6.0),
            (104.0, 6.0),
            (104.0, 1.0),
            (100.0, 1.0),
        ])));

        let table = TableWriterBuilder::new().add_character_field(FieldName::try_from("ADMIN").unwrap(), 50);
        let mut writer = Writer::from_path(path, table).unwrap();
        for (shape, name) in [(&indonesia, "Indonesia"), (&malaysia, "Malaysia")] {
            let mut record = Record::default();
            record.insert("ADMIN".to_string(), FieldValue::Character(Some(name.to_string())));
            writer.write_shape_and_record(shape, &record).unwrap();
        }
    }

    #[test]
    fn test_load_shapefile() {
        let path = env::temp_dir().join("mobility_choropleth_countries.shp");
        write_countries_shapefile(&path);

        let table = load_boundaries(&path, "ADMIN", "Indonesia").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].name, "Indonesia");
        let polygons = table.rows()[0].geometry.polygons();
        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].holes.len(), 1);
        assert!(polygons[1].holes.is_empty());

        assert!(load_boundaries(&path, "ADMIN", "Atlantis").unwrap().is_empty());
        assert!(matches!(
            load_boundaries(&path, "NAME_EN", "Indonesia"),
            Err(LoadError::MissingColumn { .. })
        ));

        for ext in ["shp", "shx", "dbf"] {
            let _ = fs::remove_file(path.with_extension(ext));
        }
    }

    #[test]
    fn test_field_text_formats_inner_value() {
        assert_eq!(field_text(&FieldValue::Character(Some("Indonesia  ".into()))), "Indonesia");
        assert_eq!(field_text(&FieldValue::Numeric(Some(360.0))), "360");
        assert_eq!(field_text(&FieldValue::Integer(7)), "7");
        assert_eq!(field_text(&FieldValue::Character(None)), "");
        assert_eq!(field_text(&FieldValue::Logical(Some(true))), "");
    }

    #[test]
    fn test_head_is_clamped() {
        let table = BoundaryTable::from_rows(vec![BoundaryRecord {
            name: "Indonesia".into(),
            geometry: MultiPolygon::default(),
        }]);
        assert_eq!(table.head(5).len(), 1);
        assert!(BoundaryTable::empty().head(5).is_empty());
    }
}
