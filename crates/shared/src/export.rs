use std::io::{Cursor, Write};

use geo::{Coord, Geometry, LineString, Polygon, Winding};
use shapefile::dbase::{self, FieldValue, TableWriterBuilder};
use shapefile::{Multipoint, Point, PolygonRing, Polyline, ShapeWriter, Writer};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::models::Feature;

pub const ALL_FEATURES_FILE: &str = "my_shapefile.zip";
pub const OVERLAPPING_FEATURES_FILE: &str = "overlapping_shapefile.zip";

/// Folder inside the archive holding one shapefile per geometry family.
const LAYER_FOLDER: &str = "layers";
const NAME_FIELD: &str = "name";
const NAME_FIELD_LENGTH: u8 = 80;

const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137,298.257223563]],PRIMEM["Greenwich",0],UNIT["Degree",0.017453292519943295]]"#;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no features to export")]
    Empty,
    #[error("feature {index} cannot be written: {reason}")]
    Unsupported { index: usize, reason: String },
    #[error("shapefile encoding failed: {0}")]
    Shapefile(#[from] shapefile::Error),
    #[error("zip encoding failed: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Geometry families that map to one shapefile layer each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LayerKind {
    Point,
    MultiPoint,
    Polyline,
    Polygon,
}

impl LayerKind {
    pub fn file_stem(self) -> &'static str {
        match self {
            LayerKind::Point => "POINT",
            LayerKind::MultiPoint => "MULTIPOINT",
            LayerKind::Polyline => "POLYLINE",
            LayerKind::Polygon => "POLYGON",
        }
    }
}

/// Synthetic record name for the feature at `index` (0-based).
pub fn feature_name(index: usize) -> String {
    format!("Feature {}", index + 1)
}

enum EncodedShape {
    Point(Point),
    MultiPoint(Multipoint),
    Polyline(Polyline),
    Polygon(shapefile::Polygon),
}

impl EncodedShape {
    fn layer(&self) -> LayerKind {
        match self {
            EncodedShape::Point(_) => LayerKind::Point,
            EncodedShape::MultiPoint(_) => LayerKind::MultiPoint,
            EncodedShape::Polyline(_) => LayerKind::Polyline,
            EncodedShape::Polygon(_) => LayerKind::Polygon,
        }
    }
}

fn to_points(coords: impl IntoIterator<Item = Coord<f64>>) -> Vec<Point> {
    coords.into_iter().map(|c| Point::new(c.x, c.y)).collect()
}

fn polyline_part(line: &LineString<f64>, index: usize) -> Result<Vec<Point>, ExportError> {
    if line.0.len() < 2 {
        return Err(ExportError::Unsupported {
            index,
            reason: "line needs at least two vertices".into(),
        });
    }
    Ok(to_points(line.coords().copied()))
}

fn polygon_rings(polygon: &Polygon<f64>, index: usize) -> Result<Vec<PolygonRing<Point>>, ExportError> {
    if polygon.exterior().0.len() < 3 {
        return Err(ExportError::Unsupported {
            index,
            reason: "polygon needs at least three vertices".into(),
        });
    }
    // shapefile rings: outer clockwise, holes counter-clockwise
    let mut outer = polygon.exterior().clone();
    outer.make_cw_winding();
    let mut rings = vec![PolygonRing::Outer(to_points(outer.coords().copied()))];
    for hole in polygon.interiors() {
        let mut hole = hole.clone();
        hole.make_ccw_winding();
        rings.push(PolygonRing::Inner(to_points(hole.coords().copied())));
    }
    Ok(rings)
}

fn encode_geometry(geometry: &Geometry<f64>, index: usize) -> Result<EncodedShape, ExportError> {
    let shape = match geometry {
        Geometry::Point(p) => EncodedShape::Point(Point::new(p.x(), p.y())),
        Geometry::MultiPoint(mp) => {
            EncodedShape::MultiPoint(Multipoint::new(to_points(mp.iter().map(|p| p.0))))
        }
        Geometry::Line(line) => EncodedShape::Polyline(Polyline::new(to_points([line.start, line.end]))),
        Geometry::LineString(ls) => EncodedShape::Polyline(Polyline::new(polyline_part(ls, index)?)),
        Geometry::MultiLineString(mls) => {
            let parts = mls
                .iter()
                .map(|ls| polyline_part(ls, index))
                .collect::<Result<Vec<_>, _>>()?;
            EncodedShape::Polyline(Polyline::with_parts(parts))
        }
        Geometry::Polygon(poly) => {
            EncodedShape::Polygon(shapefile::Polygon::with_rings(polygon_rings(poly, index)?))
        }
        Geometry::MultiPolygon(mp) => {
            let mut rings = Vec::new();
            for poly in mp {
                rings.extend(polygon_rings(poly, index)?);
            }
            EncodedShape::Polygon(shapefile::Polygon::with_rings(rings))
        }
        Geometry::Rect(rect) => {
            EncodedShape::Polygon(shapefile::Polygon::with_rings(polygon_rings(&rect.to_polygon(), index)?))
        }
        Geometry::Triangle(tri) => {
            EncodedShape::Polygon(shapefile::Polygon::with_rings(polygon_rings(&tri.to_polygon(), index)?))
        }
        Geometry::GeometryCollection(_) => {
            return Err(ExportError::Unsupported {
                index,
                reason: "geometry collections have no shapefile equivalent".into(),
            })
        }
    };
    Ok(shape)
}

struct EncodedLayer {
    shp: Vec<u8>,
    shx: Vec<u8>,
    dbf: Vec<u8>,
}

fn write_layer(records: &[(String, EncodedShape)]) -> Result<EncodedLayer, ExportError> {
    let mut shp = Cursor::new(Vec::new());
    let mut shx = Cursor::new(Vec::new());
    let mut dbf = Cursor::new(Vec::new());
    {
        let field = dbase::FieldName::try_from(NAME_FIELD).map_err(|e| ExportError::Unsupported {
            index: 0,
            reason: format!("{e:?}"),
        })?;
        let table = TableWriterBuilder::new()
            .add_character_field(field, NAME_FIELD_LENGTH)
            .build_with_dest(&mut dbf);
        let shapes = ShapeWriter::with_shx(&mut shp, &mut shx);
        let mut writer = Writer::new(shapes, table);

        for (name, shape) in records {
            let mut record = dbase::Record::default();
            record.insert(NAME_FIELD.to_string(), FieldValue::Character(Some(name.clone())));
            match shape {
                EncodedShape::Point(s) => writer.write_shape_and_record(s, &record)?,
                EncodedShape::MultiPoint(s) => writer.write_shape_and_record(s, &record)?,
                EncodedShape::Polyline(s) => writer.write_shape_and_record(s, &record)?,
                EncodedShape::Polygon(s) => writer.write_shape_and_record(s, &record)?,
            }
        }
        // headers are patched with final sizes when the writer drops
    }
    Ok(EncodedLayer {
        shp: shp.into_inner(),
        shx: shx.into_inner(),
        dbf: dbf.into_inner(),
    })
}

/// Encode `features` as a zipped set of shapefiles, tagging record `i` as `Feature {i+1}`.
pub fn encode_shapefile_zip(features: &[Feature]) -> Result<Vec<u8>, ExportError> {
    if features.is_empty() {
        return Err(ExportError::Empty);
    }

    let mut layers: std::collections::BTreeMap<LayerKind, Vec<(String, EncodedShape)>> =
        Default::default();
    for (index, feature) in features.iter().enumerate() {
        let geometry = feature.geometry.as_ref().ok_or_else(|| ExportError::Unsupported {
            index,
            reason: "feature has no geometry".into(),
        })?;
        let shape = encode_geometry(geometry, index)?;
        layers.entry(shape.layer()).or_default().push((feature_name(index), shape));
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (kind, records) in &layers {
        let encoded = write_layer(records)?;
        let stem = format!("{LAYER_FOLDER}/{}", kind.file_stem());
        for (ext, bytes) in [
            ("shp", encoded.shp.as_slice()),
            ("shx", encoded.shx.as_slice()),
            ("dbf", encoded.dbf.as_slice()),
            ("prj", WGS84_PRJ.as_bytes()),
        ] {
            zip.start_file(format!("{stem}.{ext}"), options)?;
            zip.write_all(bytes)?;
        }
    }
    Ok(zip.finish()?.into_inner())
}
