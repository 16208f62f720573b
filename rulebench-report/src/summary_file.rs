//! Duration Summary File
//!
//! One duration in seconds per line, in execution order. Pairs that never
//! produced a duration are skipped.

use std::io::Write;
use std::path::Path;

/// Write durations to `path`, creating parent directories as needed
pub fn write_summary_file(path: &Path, durations: &[f64]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    for duration in durations {
        writeln!(file, "{duration}")?;
    }
    file.flush()
}
