use crate::download::downloader::DownloadStatus;
use std::io::{self, Write};

const LINE_PADDING: usize = 10;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One human readable progress line, e.g. `Downloading 2024-03-15 08_30_05.mp4: 12.5 / 60`.
pub fn format_status(status: &DownloadStatus) -> String {
    let mut line = format!("{} {}", status.current_action, status.file_name);
    if status.progress > 0.0 {
        // Debug keeps the fraction on whole seconds ("10.0"), the total prints bare.
        line.push_str(&format!(": {:?} / {}", round2(status.progress), status.total));
    } else {
        line.push_str("...");
    }
    line
}

/// Rewrites a single console line in place while a recording downloads.
pub struct ProgressPrinter<W: Write> {
    out: W,
}

impl<W: Write> ProgressPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn update(&mut self, status: &DownloadStatus) -> io::Result<()> {
        write!(self.out, "{}{}\r", format_status(status), " ".repeat(LINE_PADDING))?;
        self.out.flush()
    }

    /// Ends the in-place line.
    pub fn finish(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        self.out.flush()
    }
}
