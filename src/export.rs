use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::ExportError;
use crate::history::HistoryBuffer;

/// Write history oldest-first as a pretty JSON array. Returns the sample count.
pub fn write_history<T, W>(writer: W, history: &HistoryBuffer<T>) -> Result<usize, ExportError>
where
    T: Serialize,
    W: Write,
{
    let samples: Vec<&T> = history.iter().collect();
    let mut writer = writer;
    serde_json::to_writer_pretty(&mut writer, &samples)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(samples.len())
}

pub fn export_history<T: Serialize>(path: &Path, history: &HistoryBuffer<T>) -> Result<usize, ExportError> {
    let file = File::create(path)?;
    let count = write_history(BufWriter::new(file), history)?;
    info!(path = %path.display(), samples = count, "exported history");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::FrameScheduler;
    use crate::sim::{Pendulum, Simulation};

    #[test]
    fn test_export_is_oldest_first_array() {
        let mut history = HistoryBuffer::new(3);
        for i in 0..5 {
            history.push(i);
        }
        let mut out = Vec::new();
        let n = write_history(&mut out, &history).unwrap();
        assert_eq!(n, 3);
        let parsed: Vec<i32> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, vec![2, 3, 4]);
    }

    #[test]
    fn test_export_scheduler_history_to_file() {
        let mut sched = FrameScheduler::<Pendulum>::with_defaults().unwrap();
        for _ in 0..10 {
            sched.advance(0.01).unwrap();
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pendulum.json");
        assert_eq!(export_history(&path, sched.history()).unwrap(), 10);

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 10);
        assert!(rows[0].get("theta").is_some());
        assert!(rows[9]["t"].as_f64().unwrap() > rows[0]["t"].as_f64().unwrap());
        assert_eq!(Pendulum::NAME, "pendulum");
    }

    #[test]
    fn test_export_to_missing_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/out.json");
        let history: HistoryBuffer<f64> = HistoryBuffer::new(4);
        assert!(matches!(export_history(&path, &history), Err(ExportError::Io(_))));
    }
}
