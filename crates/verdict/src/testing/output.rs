//! Output writer - chunked text output with break lines

use std::io::{self, Write};

/// Separator written between report sections
pub const BREAK_LINE_WIDTH: usize = 80;

/// Writes report chunks so that each starts on its own line.
///
/// Consecutive break lines collapse into one.
#[derive(Debug)]
pub struct OutputWriter<W: Write> {
    inner: W,
    at_line_start: bool,
    last_was_break: bool,
}

impl<W: Write> OutputWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            at_line_start: true,
            last_was_break: false,
        }
    }

    /// Write a chunk, starting a new line first if the previous chunk left
    /// one open.
    ///
    /// Returns whether anything was written.
    pub fn write(&mut self, text: &str) -> io::Result<bool> {
        if text.is_empty() {
            return Ok(false);
        }
        if !self.at_line_start && !text.starts_with('\n') {
            self.inner.write_all(b"\n")?;
        }
        self.inner.write_all(text.as_bytes())?;
        self.at_line_start = text.ends_with('\n');
        self.last_was_break = false;
        Ok(true)
    }

    /// Write a chunk and terminate its line.
    pub fn write_line(&mut self, text: &str) -> io::Result<bool> {
        if !self.write(text)? {
            return Ok(false);
        }
        self.end_line()?;
        Ok(true)
    }

    /// Write a line of `=`, unless the previous chunk already was one.
    pub fn write_break_line(&mut self) -> io::Result<bool> {
        if self.last_was_break {
            return Ok(false);
        }
        if !self.at_line_start {
            self.inner.write_all(b"\n")?;
        }
        self.inner.write_all("=".repeat(BREAK_LINE_WIDTH).as_bytes())?;
        self.at_line_start = false;
        self.last_was_break = true;
        Ok(true)
    }

    /// Terminate the current line if one is open.
    pub fn end_line(&mut self) -> io::Result<()> {
        if !self.at_line_start {
            self.inner.write_all(b"\n")?;
            self.at_line_start = true;
        }
        self.inner.flush()
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}

impl<W: Write> Drop for OutputWriter<W> {
    fn drop(&mut self) {
        let _ = self.inner.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(writer: &OutputWriter<Vec<u8>>) -> String {
        String::from_utf8(writer.get_ref().clone()).unwrap()
    }

    #[test]
    fn test_chunks_start_on_new_lines() {
        let mut writer = OutputWriter::new(Vec::new());
        writer.write("a").unwrap();
        writer.write("b").unwrap();
        writer.write_line("c").unwrap();
        writer.write("d").unwrap();
        writer.end_line().unwrap();
        assert_eq!(text(&writer), "a\nb\nc\nd\n");
    }

    #[test]
    fn test_empty_chunks_are_ignored() {
        let mut writer = OutputWriter::new(Vec::new());
        assert!(!writer.write("").unwrap());
        assert!(!writer.write_line("").unwrap());
        assert_eq!(text(&writer), "");
    }

    #[test]
    fn test_break_lines_collapse() {
        let mut writer = OutputWriter::new(Vec::new());
        writer.write("head").unwrap();
        assert!(writer.write_break_line().unwrap());
        assert!(!writer.write_break_line().unwrap());
        writer.write_line("tail").unwrap();

        let expected = format!("head\n{}\ntail\n", "=".repeat(80));
        assert_eq!(text(&writer), expected);
    }

    #[test]
    fn test_break_line_after_full_line() {
        let mut writer = OutputWriter::new(Vec::new());
        writer.write_line("head").unwrap();
        writer.write_break_line().unwrap();
        writer.end_line().unwrap();
        assert_eq!(text(&writer), format!("head\n{}\n", "=".repeat(80)));
    }
}
