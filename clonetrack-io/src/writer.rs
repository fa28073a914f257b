//! Writers for detected pairs and per-day results.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clonetrack_algorithms::{DayKey, DayTracks, Label};
use clonetrack_core::DetectionPairRow;
use csv::WriterBuilder;
use log::info;

use crate::Result;

/// Header of every track table.
pub const TRACK_HEADER: [&str; 6] = [
    "time",
    "location",
    "neighborhood",
    "direction",
    "latitude",
    "longitude",
];

/// Header of pair tables; [`crate::PairReader`] reads these names first.
pub const PAIR_HEADER: [&str; 17] = [
    "Data_ts",
    "DataDestino",
    "latitude_1",
    "longitude_1",
    "latitude_2",
    "longitude_2",
    "Km",
    "s",
    "Km/h",
    "Origem",
    "Destino",
    "bairro_origem",
    "bairro_destino",
    "localidade_origem",
    "localidade_destino",
    "velocidade_origem",
    "velocidade_destino",
];

fn number_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn text_cell(value: Option<&str>) -> &str {
    value.unwrap_or_default()
}

/// Writes suspicious detection pairs as a CSV table.
pub struct PairWriter<'a> {
    pairs: &'a [DetectionPairRow],
}

impl<'a> PairWriter<'a> {
    /// Creates a writer over a set of pairs.
    #[must_use]
    pub fn new(pairs: &'a [DetectionPairRow]) -> Self {
        Self { pairs }
    }

    /// Writes the table to any byte sink.
    ///
    /// # Errors
    /// Returns an error if the sink cannot be written.
    pub fn write_to<W: Write>(&self, sink: W) -> Result<()> {
        let mut csv = WriterBuilder::new().has_headers(false).from_writer(sink);
        csv.write_record(PAIR_HEADER)?;
        for pair in self.pairs {
            let record: [&str; 17] = [
                pair.origin_time.as_str(),
                pair.destination_time.as_str(),
                &number_cell(pair.origin_lat),
                &number_cell(pair.origin_lon),
                &number_cell(pair.destination_lat),
                &number_cell(pair.destination_lon),
                &number_cell(pair.distance_km),
                &number_cell(pair.elapsed_s),
                &number_cell(pair.speed_kmh),
                text_cell(pair.origin_street.as_deref()),
                text_cell(pair.destination_street.as_deref()),
                text_cell(pair.origin_neighborhood.as_deref()),
                text_cell(pair.destination_neighborhood.as_deref()),
                text_cell(pair.origin_locality.as_deref()),
                text_cell(pair.destination_locality.as_deref()),
                &number_cell(pair.origin_speed),
                &number_cell(pair.destination_speed),
            ];
            csv.write_record(record)?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Writes the table to `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_to(BufWriter::new(File::create(path.as_ref())?))?;
        info!("wrote {} pairs to {}", self.pairs.len(), path.as_ref().display());
        Ok(())
    }
}

/// Writes pipeline results to disk.
pub struct ResultWriter<'a> {
    results: &'a BTreeMap<DayKey, DayTracks>,
}

impl<'a> ResultWriter<'a> {
    /// Creates a writer over a set of per-day results.
    #[must_use]
    pub fn new(results: &'a BTreeMap<DayKey, DayTracks>) -> Self {
        Self { results }
    }

    /// Renders all days as one pretty-printed JSON object keyed by
    /// `DD/MM/YYYY`.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self.results)?)
    }

    /// Writes all days as JSON to `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(&mut writer, self.results)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        info!("wrote {} days to {}", self.results.len(), path.as_ref().display());
        Ok(())
    }

    /// Writes one CSV table per day and vehicle into `dir`, named
    /// `<YYYY-MM-DD>_vehicle<N>.csv`. Returns the paths written.
    ///
    /// # Errors
    /// Returns an error if the directory or a file cannot be written.
    pub fn write_track_tables<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let mut written = Vec::with_capacity(self.results.len() * 2);
        for (day, tracks) in self.results {
            for label in Label::ALL {
                let path = dir.join(format!(
                    "{}_vehicle{}.csv",
                    day.date().format("%Y-%m-%d"),
                    label.index()
                ));
                let mut csv = WriterBuilder::new()
                    .has_headers(false)
                    .from_path(&path)?;
                csv.write_record(TRACK_HEADER)?;
                for row in tracks.tracks.get(label) {
                    csv.serialize(row)?;
                }
                csv.flush()?;
                written.push(path);
            }
        }
        info!("wrote {} track tables to {}", written.len(), dir.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clonetrack_algorithms::{Method, TrackRow, VehicleTracks};
    use tempfile::tempdir;

    use crate::PairReader;

    fn sample() -> BTreeMap<DayKey, DayTracks> {
        let row = |time: &str, lat: f64| TrackRow {
            time: time.to_string(),
            location: "AV BRASIL - SENTIDO CENTRO -".to_string(),
            neighborhood: None,
            direction: "CENTRO".to_string(),
            latitude: lat,
            longitude: -43.2,
        };
        let mut results = BTreeMap::new();
        results.insert(
            DayKey(NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()),
            DayTracks {
                method: Method::TwoPairsChain,
                tracks: VehicleTracks {
                    vehicle0: vec![
                        row("2024-05-10 08:00:00", -22.9),
                        row("2024-05-10 08:20:00", -23.0),
                    ],
                    vehicle1: vec![],
                },
            },
        );
        results
    }

    #[test]
    fn test_json_layout() {
        let results = sample();
        let json = ResultWriter::new(&results).to_json_string().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let day = &value["10/05/2024"];
        assert_eq!(day["method"], "TwoPairsChain");
        assert_eq!(day["vehicle0"].as_array().unwrap().len(), 2);
        assert_eq!(day["vehicle0"][0]["time"], "2024-05-10 08:00:00");
        assert!(day["vehicle0"][0]["neighborhood"].is_null());
        assert_eq!(day["vehicle1"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_track_tables() {
        let results = sample();
        let dir = tempdir().unwrap();
        let paths = ResultWriter::new(&results)
            .write_track_tables(dir.path().join("tracks"))
            .unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("2024-05-10_vehicle0.csv"));
        assert!(paths[1].ends_with("2024-05-10_vehicle1.csv"));

        let v0 = fs::read_to_string(&paths[0]).unwrap();
        let lines: Vec<&str> = v0.lines().collect();
        assert_eq!(lines[0], "time,location,neighborhood,direction,latitude,longitude");
        assert_eq!(
            lines[1],
            "2024-05-10 08:00:00,AV BRASIL - SENTIDO CENTRO -,,CENTRO,-22.9,-43.2"
        );
        assert_eq!(lines.len(), 3);

        let v1 = fs::read_to_string(&paths[1]).unwrap();
        assert_eq!(v1.lines().count(), 1);
    }

    #[test]
    fn test_pair_table_reads_back() {
        let mut pair = DetectionPairRow::new(
            "2024-05-10T08:00:00-03:00",
            (-22.9, -43.2),
            "2024-05-10T08:10:00-03:00",
            (-23.0, -43.5),
        )
        .with_measurements(Some(33.5), Some(600.0), Some(201.0))
        .with_streets("AV BRASIL (1042)", "RUA A, LOJA 2 (77)")
        .with_neighborhoods("PENHA", "");
        pair.origin_speed = Some(58.0);

        let mut buf = Vec::new();
        PairWriter::new(std::slice::from_ref(&pair))
            .write_to(&mut buf)
            .unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("Data_ts,DataDestino,latitude_1,"));

        let rows = PairReader::from_reader(buf.as_slice())
            .unwrap()
            .read_all()
            .unwrap();
        assert_eq!(rows.len(), 1);
        let read = &rows[0];
        assert_eq!(read.origin_time, pair.origin_time);
        assert_eq!(read.elapsed_s, Some(600.0));
        assert_eq!(read.destination_street.as_deref(), Some("RUA A, LOJA 2 (77)"));
        assert_eq!(read.origin_neighborhood.as_deref(), Some("PENHA"));
        assert!(read.destination_neighborhood.is_none());
        assert_eq!(read.origin_speed, Some(58.0));
        assert!(read.destination_speed.is_none());
    }

    #[test]
    fn test_write_json_file() {
        let results = sample();
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");
        ResultWriter::new(&results).write_json(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"10/05/2024\""));
    }
}
