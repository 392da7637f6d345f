use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::Path,
    sync::Arc,
};

use parking_lot::Mutex;

/// Drops ANSI escape sequences so the log file stays plain text.
pub fn strip_ansi_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' {
            in_escape = true;
        } else if in_escape {
            if c.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Appends to a file and trims it back to the newest `max_lines` lines every
/// so often.
#[derive(Clone)]
pub(crate) struct CircularFileWriter {
    path: String,
    max_lines: u32,
    pending: Arc<Mutex<u32>>,
}

impl CircularFileWriter {
    pub fn new(path: String, max_lines: u32) -> Self {
        Self {
            path,
            max_lines: max_lines.max(1),
            pending: Arc::new(Mutex::new(0)),
        }
    }

    fn prune_threshold(&self) -> u32 {
        (self.max_lines / 10).max(50)
    }

    fn prune(&self) -> io::Result<()> {
        if !Path::new(&self.path).exists() {
            return Ok(());
        }

        let content = fs::read_to_string(&self.path)?;
        let lines: Vec<&str> = content.lines().collect();
        let keep = self.max_lines as usize;
        if lines.len() <= keep {
            return Ok(());
        }

        let mut out = lines[lines.len() - keep..].join("\n");
        out.push('\n');
        fs::write(&self.path, out)
    }
}

impl io::Write for CircularFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?
            .write_all(buf)?;

        let mut pending = self.pending.lock();
        *pending += buf.iter().filter(|&&b| b == b'\n').count() as u32;
        if *pending >= self.prune_threshold() {
            if let Err(e) = self.prune() {
                eprintln!("Failed to prune log file: {}", e);
            }
            *pending = 0;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CircularFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi_escapes() {
        assert_eq!(strip_ansi_escapes("\x1b[32mINFO\x1b[0m ok"), "INFO ok");
    }

    #[test]
    fn test_prune_keeps_newest_lines() {
        let path = std::env::temp_dir().join(format!("voxlink-writer-{}.log", std::process::id()));
        let path_str = path.to_string_lossy().to_string();
        let _ = fs::remove_file(&path);

        let mut writer = CircularFileWriter::new(path_str.clone(), 60);
        for i in 0..120 {
            writer.write_all(format!("line {}\n", i).as_bytes()).unwrap();
        }
        writer.prune().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 60);
        assert_eq!(lines.last().copied(), Some("line 119"));
        let _ = fs::remove_file(&path);
    }
}
