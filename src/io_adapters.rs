use std::cell::RefCell;
use std::io::{Cursor, Read, Result as IoResult, Write};
use std::process::Stdio;
use std::rc::Rc;

/// Memory-backed reader used as standard input when embedding the shell.
pub struct MemReader {
    cursor: Cursor<Vec<u8>>,
}

impl MemReader {
    /// Create a MemReader that will read from the provided buffer.
    pub fn new(buf: Vec<u8>) -> Self {
        Self {
            cursor: Cursor::new(buf),
        }
    }
}

impl Read for MemReader {
    fn read(&mut self, out: &mut [u8]) -> IoResult<usize> {
        self.cursor.read(out)
    }
}

impl crate::command::Stdin for MemReader {
    /// Children see an empty input: there is no descriptor to hand them.
    fn child_stdio(&mut self) -> IoResult<Stdio> {
        Ok(Stdio::null())
    }
}

/// Memory-backed writer for capturing the output of commands.
///
/// External programs writing here are relayed through a pipe.
pub struct MemWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    /// Public constructor.
    pub fn new() -> Self {
        Self {
            buf: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Return inner Rc so caller can read collected bytes after command execution.
    pub fn into_inner(self) -> Rc<RefCell<Vec<u8>>> {
        self.buf
    }

    /// Convenience: create writer and return (writer, rc_handle).
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let mw = MemWriter::new();
        let rc = mw.buf.clone();
        (mw, rc)
    }
}

impl Default for MemWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

impl crate::command::Stdout for MemWriter {
    fn child_stdio(&mut self) -> IoResult<Option<Stdio>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Stdin, Stdout};

    #[test]
    fn test_mem_writer_shares_buffer_with_handle() {
        let (mut writer, handle) = MemWriter::with_handle();
        write!(writer, "abc").unwrap();
        assert!(writer.child_stdio().unwrap().is_none());
        assert_eq!(handle.borrow().as_slice(), b"abc");
        assert_eq!(writer.into_inner().borrow().as_slice(), b"abc");
    }

    #[test]
    fn test_mem_reader_reads_buffer() {
        let mut reader = MemReader::new(b"input".to_vec());
        let mut s = String::new();
        reader.read_to_string(&mut s).unwrap();
        assert_eq!(s, "input");
        assert!(reader.child_stdio().is_ok());
    }
}
