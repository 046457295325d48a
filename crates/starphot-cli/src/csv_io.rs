use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use starphot_core::error::StarphotError;
use starphot_core::session::{PhotometryResult, PositionRecord, ResultRow, SessionReport};
use starphot_core::source::ResultSink;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Write position records, coordinates rounded to two decimals.
pub fn write_positions(path: &Path, records: &[PositionRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for record in records {
        let mut record = record.clone();
        record.x_position = round2(record.x_position);
        record.y_position = round2(record.y_position);
        writer.serialize(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_positions(path: &Path) -> Result<Vec<PositionRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: PositionRecord =
            row.with_context(|| format!("Malformed position row in {}", path.display()))?;
        records.push(record);
    }
    Ok(records)
}

/// Writes each accepted result as one CSV row.
pub struct CsvResultSink {
    writer: csv::Writer<File>,
    star_name: String,
}

impl CsvResultSink {
    pub fn create(path: &Path, star_name: &str) -> Result<Self> {
        let writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Self {
            writer,
            star_name: star_name.to_string(),
        })
    }
}

fn sink_error(e: impl std::fmt::Display) -> StarphotError {
    StarphotError::Sink(e.to_string())
}

impl ResultSink for CsvResultSink {
    fn accept(&mut self, result: &PhotometryResult) -> starphot_core::error::Result<()> {
        self.writer
            .serialize(ResultRow::new(result, &self.star_name))
            .map_err(sink_error)
    }

    fn finish(&mut self, _report: &SessionReport) -> starphot_core::error::Result<()> {
        self.writer.flush().map_err(sink_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use starphot_core::frame::{PixelPlane, Position};
    use starphot_core::photometry::ApertureParams;
    use starphot_core::session::{NoOpReporter, RunOutcome, SessionConfig, WorkflowSession};
    use starphot_core::source::InMemorySource;

    fn record(index: usize, x: f64, y: f64) -> PositionRecord {
        PositionRecord {
            image_index: index,
            filename: format!("img_{index}.png"),
            star_name: "vega".into(),
            x_position: x,
            y_position: y,
            position_type: "pre-selected".into(),
            aperture_inner_radius: 9.0,
            aperture_inner_annulus: 12.0,
            aperture_outer_annulus: 17.0,
        }
    }

    #[test]
    fn test_positions_roundtrip_rounds_to_two_decimals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("positions.csv");
        write_positions(&path, &[record(0, 10.123, 20.456), record(2, 11.0, 21.999)]).unwrap();

        let back = read_positions(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].position(), Position::new(10.12, 20.46));
        assert_eq!(back[1].image_index, 2);
        assert_eq!(back[1].aperture(), ApertureParams::new(9.0, 12.0, 17.0));
    }

    fn star_plane(peak: f32) -> Array2<f32> {
        let mut data = Array2::from_elem((40, 40), 10.0);
        data[[20, 20]] += peak;
        data
    }

    #[test]
    fn test_result_sink_writes_mono_and_rgb_rows() {
        let mono = PixelPlane::mono(star_plane(500.0));
        let rgb = PixelPlane::rgb(star_plane(400.0), star_plane(200.0), star_plane(100.0)).unwrap();
        let source = InMemorySource::new(vec![mono, rgb]);
        let config = SessionConfig {
            star_name: "vega".into(),
            auto_tracking: false,
            ..SessionConfig::default()
        };
        let position = Some(Position::new(20.0, 20.0));
        let mut session =
            WorkflowSession::from_positions(config, 2, vec![position, position]).unwrap();
        session.start_batch().unwrap();
        assert_eq!(session.run(&source, &NoOpReporter).unwrap(), RunOutcome::Complete);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photometry.csv");
        let mut sink = CsvResultSink::create(&path, "vega").unwrap();
        let report = session.stop(&mut sink).unwrap();
        assert_eq!(report.measured, 2);
        drop(sink);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .unwrap_or_else(|| panic!("missing column {name}"))
        };
        assert_eq!(column("image_index"), 0);
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);

        let (mono_row, rgb_row) = (&rows[0], &rows[1]);
        assert_eq!(&mono_row[column("star_name")], "vega");
        assert_eq!(&mono_row[column("is_rgb")], "false");
        let value = |row: &csv::StringRecord, name: &str| -> f64 {
            row[column(name)].parse().unwrap()
        };
        let area = std::f64::consts::PI * 81.0;
        assert_eq!(value(mono_row, "gray_sky_per_pixel"), 10.0);
        let expected = value(mono_row, "gray_star_flux_raw") - 10.0 * area;
        assert!((value(mono_row, "gray_flux_corrected") - expected).abs() < 1e-6);
        for name in ["r_star_flux_raw", "g_flux_corrected", "b_sky_std", "lum_poisson_noise"] {
            assert!(mono_row[column(name)].is_empty(), "{name} should be empty");
        }

        assert_eq!(&rgb_row[column("image_index")], "1");
        assert_eq!(&rgb_row[column("is_rgb")], "true");
        assert!(rgb_row[column("gray_star_flux_raw")].is_empty());
        for name in ["r_star_flux_raw", "g_flux_corrected", "b_sky_std", "lum_poisson_noise"] {
            assert!(!rgb_row[column(name)].is_empty(), "{name} should be filled");
        }
        assert!(value(rgb_row, "r_star_flux_raw") > value(rgb_row, "b_star_flux_raw"));
    }

    #[test]
    fn test_read_positions_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_positions(&dir.path().join("absent.csv")).is_err());
    }
}
