//! Whitespace-delimited text tables: the trajectory export format and the
//! force-data input format. Lines starting with `#` are comments.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::trajectory::{AuxChannel, Sample, Trajectory};

fn io_err(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn data_err(path: &Path, line: usize, reason: impl Into<String>) -> Error {
    Error::MalformedData {
        path: path.to_path_buf(),
        line,
        reason: reason.into(),
    }
}

/// Writes one row per sample as `t z v a` (or `t z v f`, depending on the
/// trajectory's aux channel) in scientific notation, preceded by a single
/// header comment naming the columns.
pub fn write_trajectory(path: impl AsRef<Path>, trajectory: &Trajectory) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| io_err(path, e))?;
    let mut out = BufWriter::new(file);
    let write = |out: &mut BufWriter<File>, s: String| {
        out.write_all(s.as_bytes()).map_err(|e| io_err(path, e))
    };

    write(
        &mut out,
        format!("# t z v {}\n", trajectory.channel().symbol()),
    )?;
    for sample in trajectory {
        write(
            &mut out,
            format!(
                "{:>14.6e} {:>14.6e} {:>14.6e} {:>14.6e}\n",
                sample.t, sample.z, sample.v, sample.aux
            ),
        )?;
    }
    out.flush().map_err(|e| io_err(path, e))
}

/// Reads a file produced by [`write_trajectory`]. The header comment is
/// optional; without one the fourth column is taken as acceleration.
pub fn read_trajectory(path: impl AsRef<Path>) -> Result<Trajectory> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| io_err(path, e))?;
    let reader = BufReader::new(file);

    let mut channel = AuxChannel::Acceleration;
    let mut samples = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| io_err(path, e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(comment) = trimmed.strip_prefix('#') {
            if comment.split_whitespace().last() == Some("f") {
                channel = AuxChannel::Force;
            }
            continue;
        }
        let row = parse_row(path, idx + 1, trimmed, 4)?;
        samples.push(Sample {
            t: row[0],
            z: row[1],
            v: row[2],
            aux: row[3],
        });
    }
    Trajectory::from_samples(channel, samples)
}

/// Loads a force-data table: column 0 is time, column 3 is the force value.
/// The result is meant to be wrapped by
/// [`crate::forces::TabulatedForce::new`].
pub fn load_force_table(path: impl AsRef<Path>) -> Result<(Vec<f64>, Vec<f64>)> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| io_err(path, e))?;
    let reader = BufReader::new(file);

    let mut times = Vec::new();
    let mut forces = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| io_err(path, e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let row = parse_row(path, idx + 1, trimmed, 4)?;
        times.push(row[0]);
        forces.push(row[3]);
    }
    Ok((times, forces))
}

fn parse_row(path: &Path, line_no: usize, line: &str, min_cols: usize) -> Result<Vec<f64>> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < min_cols {
        return Err(data_err(
            path,
            line_no,
            format!("expected at least {min_cols} columns, found {}", fields.len()),
        ));
    }
    fields
        .iter()
        .map(|field| {
            field
                .parse::<f64>()
                .map_err(|_| data_err(path, line_no, format!("not a number: '{field}'")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{load_force_table, read_trajectory, write_trajectory};
    use crate::error::Error;
    use crate::forces::TabulatedForce;
    use crate::trajectory::{AuxChannel, Sample, Trajectory};
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("eddytube_{}_{}", std::process::id(), name));
        path
    }

    fn sample(t: f64) -> Sample {
        Sample {
            t,
            z: -4.905 * t * t,
            v: -9.81 * t,
            aux: -9.81,
        }
    }

    #[test]
    fn trajectory_round_trips_within_format_precision() {
        let traj = Trajectory::from_samples(
            AuxChannel::Force,
            (0..50).map(|i| sample(i as f64 * 5e-4)).collect(),
        )
        .unwrap();
        let path = scratch_path("roundtrip.dat");
        write_trajectory(&path, &traj).unwrap();
        let back = read_trajectory(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(back.channel(), AuxChannel::Force);
        assert_eq!(back.len(), traj.len());
        for (a, b) in traj.iter().zip(back.iter()) {
            for (x, y) in [(a.t, b.t), (a.z, b.z), (a.v, b.v), (a.aux, b.aux)] {
                // 6 fractional digits in scientific notation.
                assert!((x - y).abs() <= 1e-6 * x.abs().max(1e-300));
            }
        }
    }

    #[test]
    fn force_table_skips_comments_and_picks_columns() {
        let path = scratch_path("forces.dat");
        std::fs::write(
            &path,
            "# t U0 U1 F\n0.0 9 9 0.5\n\n1.0e-2 9 9 0.75\n# trailing comment\n2.0e-2 9 9 1.0\n",
        )
        .unwrap();
        let (times, forces) = load_force_table(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(times, vec![0.0, 1.0e-2, 2.0e-2]);
        assert_eq!(forces, vec![0.5, 0.75, 1.0]);
        // The loaded pair wraps straight into an interpolating force model.
        assert!(TabulatedForce::new(times, forces).is_ok());
    }

    #[test]
    fn malformed_rows_report_path_and_line() {
        let path = scratch_path("bad.dat");
        std::fs::write(&path, "0.0 1 2 3\n0.5 oops 2 3\n").unwrap();
        let err = load_force_table(&path).unwrap_err();
        match &err {
            Error::MalformedData { line, .. } => assert_eq!(*line, 2),
            other => panic!("expected MalformedData, got {other:?}"),
        }
        assert!(err.to_string().contains("bad.dat"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_reports_path() {
        let err = read_trajectory("/nonexistent/eddytube.dat").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/eddytube.dat"));
    }
}
