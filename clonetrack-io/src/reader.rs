//! CSV readers for detection-pair tables and raw plate detections.
//!
//! Column names are matched exactly; each field accepts the upstream name
//! and its aliases, first match wins. Cells that fail to parse become
//! `None` and never abort the read.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use clonetrack_core::{Detection, DetectionPairRow};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::debug;

use crate::{Error, Result};

const ORIGIN_TIME: &[&str] = &["Data_ts", "Data", "origin_time"];
const DESTINATION_TIME: &[&str] = &["DataDestino", "destination_time"];
const ORIGIN_LAT: &[&str] = &["latitude_1", "origin_lat"];
const ORIGIN_LON: &[&str] = &["longitude_1", "origin_lon"];
const DESTINATION_LAT: &[&str] = &["latitude_2", "destination_lat"];
const DESTINATION_LON: &[&str] = &["longitude_2", "destination_lon"];
const DISTANCE: &[&str] = &["Km", "distance_km"];
const ELAPSED: &[&str] = &["s", "elapsed_s"];
const SPEED: &[&str] = &["Km/h", "speed_kmh"];
const ORIGIN_STREET: &[&str] = &["Origem", "origin_street"];
const DESTINATION_STREET: &[&str] = &["Destino", "destination_street"];
const ORIGIN_NEIGHBORHOOD: &[&str] = &["bairro_origem", "origin_neighborhood"];
const DESTINATION_NEIGHBORHOOD: &[&str] = &["bairro_destino", "destination_neighborhood"];
const ORIGIN_LOCALITY: &[&str] = &["localidade_origem", "origin_locality"];
const DESTINATION_LOCALITY: &[&str] = &["localidade_destino", "destination_locality"];
const ORIGIN_SPEED: &[&str] = &["velocidade_origem", "origin_speed"];
const DESTINATION_SPEED: &[&str] = &["velocidade_destino", "destination_speed"];

const DETECTION_TIME: &[&str] = &["datahora", "data_hora", "DataHora", "timestamp"];
const PLATE: &[&str] = &["placa", "plate", "license_plate"];
const LATITUDE: &[&str] = &["latitude", "lat"];
const LONGITUDE: &[&str] = &["longitude", "lon", "lng"];
const STREET: &[&str] = &["logradouro", "street"];
const NEIGHBORHOOD: &[&str] = &["bairro", "neighborhood"];
const LOCALITY: &[&str] = &["localidade", "locality"];
const READER_SPEED: &[&str] = &["velocidade", "speed"];
const EQUIPMENT_CODE: &[&str] = &["codcet", "codigo_equipamento", "equipment_code"];

fn find(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    names
        .iter()
        .find_map(|name| headers.iter().position(|h| h == *name))
}

fn require(headers: &StringRecord, names: &[&str]) -> Result<usize> {
    find(headers, names).ok_or_else(|| Error::MissingColumn(names[0].to_string()))
}

fn text(record: &StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| record.get(i))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn number(record: &StringRecord, idx: Option<usize>) -> Option<f64> {
    idx.and_then(|i| record.get(i)).and_then(parse_number)
}

fn csv_reader<R: Read>(source: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(source)
}

/// Header positions of every known column.
#[derive(Debug, Clone)]
struct ColumnMap {
    origin_time: usize,
    destination_time: Option<usize>,
    origin_lat: usize,
    origin_lon: usize,
    destination_lat: usize,
    destination_lon: usize,
    distance: Option<usize>,
    elapsed: Option<usize>,
    speed: Option<usize>,
    origin_street: Option<usize>,
    destination_street: Option<usize>,
    origin_neighborhood: Option<usize>,
    destination_neighborhood: Option<usize>,
    origin_locality: Option<usize>,
    destination_locality: Option<usize>,
    origin_speed: Option<usize>,
    destination_speed: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let columns = Self {
            origin_time: require(headers, ORIGIN_TIME)?,
            destination_time: find(headers, DESTINATION_TIME),
            origin_lat: require(headers, ORIGIN_LAT)?,
            origin_lon: require(headers, ORIGIN_LON)?,
            destination_lat: require(headers, DESTINATION_LAT)?,
            destination_lon: require(headers, DESTINATION_LON)?,
            distance: find(headers, DISTANCE),
            elapsed: find(headers, ELAPSED),
            speed: find(headers, SPEED),
            origin_street: find(headers, ORIGIN_STREET),
            destination_street: find(headers, DESTINATION_STREET),
            origin_neighborhood: find(headers, ORIGIN_NEIGHBORHOOD),
            destination_neighborhood: find(headers, DESTINATION_NEIGHBORHOOD),
            origin_locality: find(headers, ORIGIN_LOCALITY),
            destination_locality: find(headers, DESTINATION_LOCALITY),
            origin_speed: find(headers, ORIGIN_SPEED),
            destination_speed: find(headers, DESTINATION_SPEED),
        };
        if columns.destination_time.is_none() {
            debug!("no destination time column; using the origin time for both sides");
        }
        Ok(columns)
    }

    fn row(&self, record: &StringRecord) -> DetectionPairRow {
        let origin_time = text(record, Some(self.origin_time)).unwrap_or_default();
        let destination_time = self
            .destination_time
            .map_or_else(|| Some(origin_time.clone()), |i| text(record, Some(i)))
            .unwrap_or_default();

        DetectionPairRow {
            origin_time,
            destination_time,
            origin_lat: number(record, Some(self.origin_lat)),
            origin_lon: number(record, Some(self.origin_lon)),
            destination_lat: number(record, Some(self.destination_lat)),
            destination_lon: number(record, Some(self.destination_lon)),
            distance_km: number(record, self.distance),
            elapsed_s: number(record, self.elapsed),
            speed_kmh: number(record, self.speed),
            origin_street: text(record, self.origin_street),
            destination_street: text(record, self.destination_street),
            origin_neighborhood: text(record, self.origin_neighborhood),
            destination_neighborhood: text(record, self.destination_neighborhood),
            origin_locality: text(record, self.origin_locality),
            destination_locality: text(record, self.destination_locality),
            origin_speed: number(record, self.origin_speed),
            destination_speed: number(record, self.destination_speed),
        }
    }
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Reader for CSV tables of suspicious detection pairs.
pub struct PairReader<R: Read> {
    inner: csv::Reader<R>,
    columns: ColumnMap,
}

impl PairReader<File> {
    /// Opens a CSV file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, its header cannot be
    /// read, or a required column is missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }
}

impl<R: Read> PairReader<R> {
    /// Wraps any byte source holding CSV with a header row.
    ///
    /// # Errors
    /// Returns an error if the header cannot be read or a required column is
    /// missing.
    pub fn from_reader(source: R) -> Result<Self> {
        let mut inner = csv_reader(source);
        let columns = ColumnMap::resolve(inner.headers()?)?;
        Ok(Self { inner, columns })
    }

    /// Reads every remaining row.
    ///
    /// # Errors
    /// Returns an error on malformed CSV (for example invalid UTF-8).
    pub fn read_all(&mut self) -> Result<Vec<DetectionPairRow>> {
        let mut rows = Vec::new();
        let mut record = StringRecord::new();
        while self.inner.read_record(&mut record)? {
            rows.push(self.columns.row(&record));
        }
        debug!("read {} detection pairs", rows.len());
        Ok(rows)
    }
}

/// Header positions of raw detection columns.
#[derive(Debug, Clone)]
struct DetectionColumns {
    time: usize,
    plate: Option<usize>,
    latitude: usize,
    longitude: usize,
    street: usize,
    neighborhood: Option<usize>,
    locality: Option<usize>,
    speed: Option<usize>,
    equipment_code: usize,
}

impl DetectionColumns {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        Ok(Self {
            time: require(headers, DETECTION_TIME)?,
            plate: find(headers, PLATE),
            latitude: require(headers, LATITUDE)?,
            longitude: require(headers, LONGITUDE)?,
            street: require(headers, STREET)?,
            neighborhood: find(headers, NEIGHBORHOOD),
            locality: find(headers, LOCALITY),
            speed: find(headers, READER_SPEED),
            equipment_code: require(headers, EQUIPMENT_CODE)?,
        })
    }

    fn detection(&self, record: &StringRecord) -> Detection {
        Detection {
            time: text(record, Some(self.time)).unwrap_or_default(),
            plate: text(record, self.plate),
            latitude: number(record, Some(self.latitude)),
            longitude: number(record, Some(self.longitude)),
            street: text(record, Some(self.street)),
            neighborhood: text(record, self.neighborhood),
            locality: text(record, self.locality),
            speed: number(record, self.speed),
            equipment_code: text(record, Some(self.equipment_code)),
        }
    }
}

/// Reader for CSV tables of raw plate detections, one row per reader hit.
///
/// Requires time, latitude, longitude, street and reader-code columns.
pub struct DetectionReader<R: Read> {
    inner: csv::Reader<R>,
    columns: DetectionColumns,
}

impl DetectionReader<File> {
    /// Opens a CSV file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, its header cannot be
    /// read, or a required column is missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }
}

impl<R: Read> DetectionReader<R> {
    /// Wraps any byte source holding CSV with a header row.
    ///
    /// # Errors
    /// Returns an error if the header cannot be read or a required column is
    /// missing.
    pub fn from_reader(source: R) -> Result<Self> {
        let mut inner = csv_reader(source);
        let columns = DetectionColumns::resolve(inner.headers()?)?;
        Ok(Self { inner, columns })
    }

    /// Reads every remaining row.
    ///
    /// # Errors
    /// Returns an error on malformed CSV.
    pub fn read_all(&mut self) -> Result<Vec<Detection>> {
        let mut detections = Vec::new();
        let mut record = StringRecord::new();
        while self.inner.read_record(&mut record)? {
            detections.push(self.columns.detection(&record));
        }
        debug!("read {} detections", detections.len());
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPSTREAM: &str = "\
Data_ts,DataDestino,latitude_1,longitude_1,latitude_2,longitude_2,Km,s,Km/h,Origem,Destino,bairro_origem,bairro_destino
2024-05-10 08:00:00,2024-05-10 08:10:00,-22.9,-43.2,-23.0,-43.5,33.5,600,201,AV BRASIL - SENTIDO CENTRO -,RUA A,PENHA,
2024-05-10 09:00:00,2024-05-10 09:10:00,abc,-43.2,-23.0,-43.5,,x,NaN,,,,
";

    #[test]
    fn test_reads_upstream_columns() {
        let rows = PairReader::from_reader(UPSTREAM.as_bytes())
            .unwrap()
            .read_all()
            .unwrap();
        assert_eq!(rows.len(), 2);

        let first = &rows[0];
        assert_eq!(first.origin_time, "2024-05-10 08:00:00");
        assert_eq!(first.destination_time, "2024-05-10 08:10:00");
        assert_eq!(first.origin_lat, Some(-22.9));
        assert_eq!(first.destination_lon, Some(-43.5));
        assert_eq!(first.distance_km, Some(33.5));
        assert_eq!(first.elapsed_s, Some(600.0));
        assert_eq!(first.speed_kmh, Some(201.0));
        assert_eq!(first.origin_street.as_deref(), Some("AV BRASIL - SENTIDO CENTRO -"));
        assert_eq!(first.origin_neighborhood.as_deref(), Some("PENHA"));
        assert!(first.destination_neighborhood.is_none());
        assert!(first.origin_locality.is_none());
    }

    #[test]
    fn test_unparseable_cells_become_none() {
        let rows = PairReader::from_reader(UPSTREAM.as_bytes())
            .unwrap()
            .read_all()
            .unwrap();
        let second = &rows[1];
        assert!(second.origin_lat.is_none());
        assert!(second.distance_km.is_none());
        assert!(second.elapsed_s.is_none());
        assert!(second.speed_kmh.is_none());
        assert!(second.origin_street.is_none());
    }

    #[test]
    fn test_english_aliases_and_missing_destination_time() {
        let csv = "origin_time,origin_lat,origin_lon,destination_lat,destination_lon\n\
                   2024-05-10T08:00:00Z,1.0,2.0,3.0,4.0\n";
        let rows = PairReader::from_reader(csv.as_bytes())
            .unwrap()
            .read_all()
            .unwrap();
        assert_eq!(rows[0].destination_time, "2024-05-10T08:00:00Z");
        assert_eq!(rows[0].destination_lon, Some(4.0));
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "Data_ts,latitude_1,longitude_1,latitude_2\n2024-05-10,1,2,3\n";
        let err = PairReader::from_reader(csv.as_bytes()).err().unwrap();
        assert!(matches!(err, Error::MissingColumn(ref c) if c == "longitude_2"));
    }

    const RAW: &str = "\
placa,datahora,latitude,longitude,logradouro,bairro,localidade,velocidade,codcet
ABC1D23,2024-05-10 08:00:00,-22.9,-43.2,AV BRASIL, CENTRO ,AV BRASIL X RUA A,58,1042
ABC1D23,2024-05-10 08:10:00,-23.0,bad,RUA B,,,,77
";

    #[test]
    fn test_reads_raw_detections() {
        let detections = DetectionReader::from_reader(RAW.as_bytes())
            .unwrap()
            .read_all()
            .unwrap();
        assert_eq!(detections.len(), 2);

        let first = &detections[0];
        assert_eq!(first.time, "2024-05-10 08:00:00");
        assert_eq!(first.plate.as_deref(), Some("ABC1D23"));
        assert_eq!(first.latitude, Some(-22.9));
        assert_eq!(first.neighborhood.as_deref(), Some("CENTRO"));
        assert_eq!(first.locality.as_deref(), Some("AV BRASIL X RUA A"));
        assert_eq!(first.speed, Some(58.0));
        assert_eq!(first.equipment_code.as_deref(), Some("1042"));

        let second = &detections[1];
        assert!(second.longitude.is_none());
        assert!(second.neighborhood.is_none());
        assert!(second.speed.is_none());
    }

    #[test]
    fn test_raw_detection_aliases() {
        let csv = "timestamp,lat,lng,street,codigo_equipamento\n\
                   2024-05-10T08:00:00Z,1.5,2.5,RUA A,9\n";
        let detections = DetectionReader::from_reader(csv.as_bytes())
            .unwrap()
            .read_all()
            .unwrap();
        assert_eq!(detections[0].longitude, Some(2.5));
        assert_eq!(detections[0].equipment_code.as_deref(), Some("9"));
        assert!(detections[0].plate.is_none());
    }

    #[test]
    fn test_raw_detection_requires_reader_code() {
        let csv = "datahora,latitude,longitude,logradouro\n2024-05-10,1,2,RUA A\n";
        let err = DetectionReader::from_reader(csv.as_bytes()).err().unwrap();
        assert!(matches!(err, Error::MissingColumn(ref c) if c == "codcet"));
    }

    #[test]
    fn test_short_records_tolerated() {
        let csv = "Data_ts,latitude_1,longitude_1,latitude_2,longitude_2,Origem\n\
                   2024-05-10 08:00:00,1,2\n";
        let rows = PairReader::from_reader(csv.as_bytes())
            .unwrap()
            .read_all()
            .unwrap();
        assert_eq!(rows[0].origin_lon, Some(2.0));
        assert!(rows[0].destination_lat.is_none());
        assert!(rows[0].origin_street.is_none());
    }
}
