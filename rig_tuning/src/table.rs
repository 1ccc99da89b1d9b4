//! Gain/phase result table.
//!
//! ```text
//! frequency_hz,gain,phase_deg
//! 0.1000,123.4567,-91.23
//! ```
//!
//! Frequency and gain are written with 4 decimals, phase with 2. The table
//! is written once, after the sweep completes.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::error::TuneError;

/// Header line of the table.
pub const HEADER: &str = "frequency_hz,gain,phase_deg";

/// One swept frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainPhasePoint {
    pub frequency_hz: f64,
    /// Fitted output amplitude [counts].
    pub gain: f64,
    pub phase_deg: f64,
}

impl GainPhasePoint {
    /// The point as it reads back from the table.
    pub fn rounded(&self) -> Self {
        Self {
            frequency_hz: round_to(self.frequency_hz, 4),
            gain: round_to(self.gain, 4),
            phase_deg: round_to(self.phase_deg, 2),
        }
    }
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (v * scale).round() / scale
}

/// Write header and rows.
pub fn write_table<W: Write>(mut w: W, points: &[GainPhasePoint]) -> Result<(), TuneError> {
    writeln!(w, "{HEADER}")?;
    for p in points {
        writeln!(w, "{:.4},{:.4},{:.2}", p.frequency_hz, p.gain, p.phase_deg)?;
    }
    w.flush()?;
    Ok(())
}

/// Write the table to `path`, replacing any previous file.
pub fn save_table(path: &Path, points: &[GainPhasePoint]) -> Result<(), TuneError> {
    write_table(BufWriter::new(File::create(path)?), points)?;
    info!("Wrote {} points to {}", points.len(), path.display());
    Ok(())
}

/// Parse a table; blank lines are skipped.
pub fn read_table<R: BufRead>(r: R) -> Result<Vec<GainPhasePoint>, TuneError> {
    let mut lines = r.lines();
    match lines.next().transpose()? {
        Some(h) if h.trim() == HEADER => {}
        Some(h) => {
            return Err(TuneError::Parse {
                line: 1,
                reason: format!("expected header {HEADER:?}, found {:?}", h.trim()),
            });
        }
        None => {
            return Err(TuneError::Parse {
                line: 1,
                reason: "empty table".to_string(),
            });
        }
    }

    let mut points = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line?;
        let line_no = i + 2;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let [f, g, p] = fields.as_slice() else {
            return Err(TuneError::Parse {
                line: line_no,
                reason: format!("expected 3 fields, found {}", fields.len()),
            });
        };
        let parse = |s: &str| {
            s.parse::<f64>().map_err(|e| TuneError::Parse {
                line: line_no,
                reason: format!("{s:?}: {e}"),
            })
        };
        points.push(GainPhasePoint {
            frequency_hz: parse(*f)?,
            gain: parse(*g)?,
            phase_deg: parse(*p)?,
        });
    }
    Ok(points)
}

/// Read the table at `path`.
pub fn load_table(path: &Path) -> Result<Vec<GainPhasePoint>, TuneError> {
    read_table(BufReader::new(File::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn points() -> Vec<GainPhasePoint> {
        vec![
            GainPhasePoint {
                frequency_hz: 0.1,
                gain: 2387.324_146,
                phase_deg: -90.871_2,
            },
            GainPhasePoint {
                frequency_hz: 1.456_348_477,
                gain: 158.209_87,
                phase_deg: -114.555_1,
            },
            GainPhasePoint {
                frequency_hz: 19.952_623_15,
                gain: 0.000_04,
                phase_deg: 171.004_9,
            },
        ]
    }

    #[test]
    fn writes_header_and_precision() {
        let mut buf = Vec::new();
        write_table(&mut buf, &points()[..1]).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "frequency_hz,gain,phase_deg\n0.1000,2387.3241,-90.87\n"
        );
    }

    #[test]
    fn file_round_trip_keeps_stated_precision() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frf.csv");
        save_table(&path, &points()).unwrap();
        let back = load_table(&path).unwrap();
        assert_eq!(back.len(), 3);
        for (orig, read) in points().iter().zip(&back) {
            let r = orig.rounded();
            assert!((read.frequency_hz - r.frequency_hz).abs() < 1e-9);
            assert!((read.gain - r.gain).abs() < 1e-9);
            assert!((read.phase_deg - r.phase_deg).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_bad_header_and_rows() {
        let err = read_table("freq,gain\n".as_bytes()).unwrap_err();
        assert!(matches!(err, TuneError::Parse { line: 1, .. }));

        let err = read_table(format!("{HEADER}\n1.0,2.0\n").as_bytes()).unwrap_err();
        assert!(matches!(err, TuneError::Parse { line: 2, .. }));

        let err = read_table(format!("{HEADER}\n1.0,2.0,3.0\n\n1.0,x,3.0\n").as_bytes()).unwrap_err();
        assert!(matches!(err, TuneError::Parse { line: 4, .. }));

        assert!(read_table("".as_bytes()).is_err());
    }

    #[test]
    fn empty_sweep_is_header_only() {
        let mut buf = Vec::new();
        write_table(&mut buf, &[]).unwrap();
        assert!(read_table(buf.as_slice()).unwrap().is_empty());
    }
}
