use std::collections::VecDeque;
use std::io::{Cursor, Read};

use geo::Geometry;
use shapefile::dbase::{self, FieldValue};
use shapefile::{Shape, ShapeReader};

use crate::models::ImportedFeature;

const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";
/// Big-endian file code 9994 at the start of every `.shp`.
const SHP_MAGIC: [u8; 4] = [0x00, 0x00, 0x27, 0x0A];
/// First byte of a dBase III table.
const DBF_MAGIC: u8 = 0x03;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("not a zip, shp or dbf file")]
    UnrecognizedFormat,
    #[error("upload contains attributes but no .shp geometry")]
    MissingGeometry,
    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),
    #[error("attribute table error: {0}")]
    Dbase(#[from] dbase::Error),
    #[error("unsupported geometry: {0}")]
    Geometry(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Zip,
    Shp,
    Dbf,
}

pub fn sniff_format(bytes: &[u8]) -> Option<UploadFormat> {
    if bytes.starts_with(&ZIP_MAGIC) {
        Some(UploadFormat::Zip)
    } else if bytes.starts_with(&SHP_MAGIC) {
        Some(UploadFormat::Shp)
    } else if bytes.first() == Some(&DBF_MAGIC) {
        Some(UploadFormat::Dbf)
    } else {
        None
    }
}

struct RawLayer {
    shp: Vec<u8>,
    dbf: Option<Vec<u8>>,
}

type RawRecord = (Shape, Option<dbase::Record>);

/// Lazy stream of features decoded from an uploaded shapefile or zip.
///
/// Layers are parsed one at a time as the stream reaches them; geometry
/// conversion happens per item. `None` signals completion.
pub struct ShapefileSource {
    layers: VecDeque<RawLayer>,
    pending: VecDeque<RawRecord>,
    /// Error that ended the current layer, surfaced once `pending` drains.
    deferred: Option<ImportError>,
    failed: bool,
}

impl ShapefileSource {
    pub fn open(bytes: &[u8]) -> Result<Self, ImportError> {
        let layers = match sniff_format(bytes) {
            Some(UploadFormat::Zip) => zip_layers(bytes)?,
            Some(UploadFormat::Shp) => vec![RawLayer { shp: bytes.to_vec(), dbf: None }],
            Some(UploadFormat::Dbf) => return Err(ImportError::MissingGeometry),
            None => return Err(ImportError::UnrecognizedFormat),
        };
        if layers.is_empty() {
            return Err(ImportError::MissingGeometry);
        }
        Ok(ShapefileSource {
            layers: layers.into(),
            pending: VecDeque::new(),
            deferred: None,
            failed: false,
        })
    }
}

impl Iterator for ShapefileSource {
    type Item = Result<ImportedFeature, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        while self.pending.is_empty() {
            if let Some(e) = self.deferred.take() {
                self.failed = true;
                return Some(Err(e));
            }
            let layer = self.layers.pop_front()?;
            let decoded = decode_layer(layer);
            self.pending.extend(decoded.records);
            self.deferred = decoded.error;
        }
        let (shape, record) = self.pending.pop_front()?;
        let item = to_feature(shape, record);
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}

fn stem_and_ext(name: &str) -> Option<(&str, String)> {
    let (stem, ext) = name.rsplit_once('.')?;
    Some((stem, ext.to_ascii_lowercase()))
}

fn zip_layers(bytes: &[u8]) -> Result<Vec<RawLayer>, ImportError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut shp_entries = Vec::new();
    let mut dbf_entries = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        let Some((stem, ext)) = stem_and_ext(&name) else { continue };
        let stem = stem.to_string();
        match ext.as_str() {
            "shp" => {
                let mut buf = Vec::new();
                file.read_to_end(&mut buf)?;
                shp_entries.push((stem, buf));
            }
            "dbf" => {
                let mut buf = Vec::new();
                file.read_to_end(&mut buf)?;
                dbf_entries.push((stem, buf));
            }
            _ => {}
        }
    }

    Ok(shp_entries
        .into_iter()
        .map(|(stem, shp)| {
            let dbf = dbf_entries
                .iter()
                .position(|(s, _)| s.eq_ignore_ascii_case(&stem))
                .map(|i| dbf_entries.swap_remove(i).1);
            RawLayer { shp, dbf }
        })
        .collect())
}

/// Records read from one layer, up to the first failure.
struct DecodedLayer {
    records: Vec<RawRecord>,
    error: Option<ImportError>,
}

impl DecodedLayer {
    fn failed(error: impl Into<ImportError>) -> Self {
        DecodedLayer { records: Vec::new(), error: Some(error.into()) }
    }

    /// Keep every record before the first error, and the error itself.
    fn collect<E: Into<ImportError>>(items: impl Iterator<Item = Result<RawRecord, E>>) -> Self {
        let mut records = Vec::new();
        for item in items {
            match item {
                Ok(record) => records.push(record),
                Err(e) => return DecodedLayer { records, error: Some(e.into()) },
            }
        }
        DecodedLayer { records, error: None }
    }
}

fn decode_layer(layer: RawLayer) -> DecodedLayer {
    let mut shape_reader = match ShapeReader::new(Cursor::new(layer.shp)) {
        Ok(reader) => reader,
        Err(e) => return DecodedLayer::failed(e),
    };
    match layer.dbf {
        Some(dbf) => {
            let dbase_reader = match dbase::Reader::new(Cursor::new(dbf)) {
                Ok(reader) => reader,
                Err(e) => return DecodedLayer::failed(e),
            };
            let mut reader = shapefile::Reader::new(shape_reader, dbase_reader);
            DecodedLayer::collect(
                reader
                    .iter_shapes_and_records()
                    .map(|r| r.map(|(shape, record)| (shape, Some(record)))),
            )
        }
        None => DecodedLayer::collect(shape_reader.iter_shapes().map(|r| r.map(|shape| (shape, None)))),
    }
}

fn field_to_json(value: FieldValue) -> serde_json::Value {
    use serde_json::Value;
    match value {
        FieldValue::Character(s) => s.map(|s| Value::String(s.trim_end().to_string())).unwrap_or(Value::Null),
        FieldValue::Memo(s) => Value::String(s),
        FieldValue::Numeric(n) => n.map(Value::from).unwrap_or(Value::Null),
        FieldValue::Float(n) => n.map(|f| Value::from(f as f64)).unwrap_or(Value::Null),
        FieldValue::Double(n) => Value::from(n),
        FieldValue::Integer(n) => Value::from(n),
        FieldValue::Logical(b) => b.map(Value::Bool).unwrap_or(Value::Null),
        FieldValue::Currency(n) => Value::from(n),
        other => Value::String(format!("{other:?}")),
    }
}

fn to_feature(shape: Shape, record: Option<dbase::Record>) -> Result<ImportedFeature, ImportError> {
    let geometry = match shape {
        Shape::NullShape => None,
        other => Some(
            Geometry::<f64>::try_from(other).map_err(|e| ImportError::Geometry(e.to_string()))?,
        ),
    };
    let properties = record
        .map(|r| r.into_iter().map(|(k, v)| (k, field_to_json(v))).collect())
        .unwrap_or_default();
    Ok(ImportedFeature { geometry, properties })
}
