//! Forward-only byte window over a sequential stream
//!
//! A [`ByteWindow`] turns a forward-only [`Read`] stream into something
//! that can be indexed, sliced, and sub-sliced as if it were an in-memory
//! buffer, while only ever buffering the bytes actually requested. All
//! offsets are absolute within the window; the window tracks a cursor and
//! rejects any access below it, so a decoder bug surfaces immediately as an
//! out-of-order-access error instead of silently reading stale data.

use std::io::{self, Read};

use bytes::Bytes;

use crate::error::{ListError, ProtocolError, TransportError};

/// A forward-only, offset-tracked view over a byte source.
///
/// Every read advances the cursor; bytes between the cursor and a requested
/// offset are read from the source and discarded, so the window's absolute
/// offsets always agree with what has physically been consumed.
///
/// A sub-window created with [`sub_window`](Self::sub_window) borrows the
/// parent's source and is limited to its declared byte range. The parent's
/// cursor is advanced past the range immediately, so the sub-window must be
/// fully consumed (read to its end, or [`drain`](Self::drain)ed) before the
/// parent is used again. The parent does not re-validate this; it is an
/// obligation on every call site that carves out a sub-window.
pub struct ByteWindow<R> {
    source: R,
    cursor: usize,
    declared_len: Option<usize>,
}

impl<R: Read> ByteWindow<R> {
    /// Create a window over a stream of unknown length.
    pub fn new(source: R) -> Self {
        Self {
            source,
            cursor: 0,
            declared_len: None,
        }
    }

    /// Create a window over a stream with a declared byte length.
    pub fn with_len(source: R, len: usize) -> Self {
        Self {
            source,
            cursor: 0,
            declared_len: Some(len),
        }
    }

    /// The declared length of this window, if known.
    pub fn declared_len(&self) -> Option<usize> {
        self.declared_len
    }

    /// The current cursor position. Reads below this offset fail.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Read the single byte at an absolute offset.
    ///
    /// Bytes between the cursor and `offset` are read and discarded. The
    /// cursor advances to `offset + 1`.
    ///
    /// # Errors
    /// - [`ProtocolError::OutOfOrderAccess`] if `offset` is below the cursor
    /// - [`ProtocolError::UnexpectedEof`] if the stream or the declared
    ///   length ends before `offset`
    pub fn byte_at(&mut self, offset: usize) -> Result<u8, ListError> {
        match self.next_byte(offset)? {
            Some(byte) => Ok(byte),
            None => Err(ProtocolError::UnexpectedEof {
                offset: self.cursor,
            }
            .into()),
        }
    }

    /// Like [`byte_at`](Self::byte_at), but distinguishes a clean end of
    /// stream: `Ok(None)` when the source is already exhausted at the
    /// requested offset (no bytes consumed), versus an error when the
    /// stream ends partway through.
    ///
    /// Used by decoders walking a window of unknown length to detect the
    /// natural end of the stream at a field boundary.
    pub fn next_byte(&mut self, offset: usize) -> Result<Option<u8>, ListError> {
        self.check_order(offset)?;
        if let Some(len) = self.declared_len {
            if offset >= len {
                return Ok(None);
            }
        }
        let need = offset - self.cursor + 1;
        let mut buf = vec![0u8; need];
        if !self.read_full(&mut buf, true)? {
            return Ok(None);
        }
        self.cursor = offset + 1;
        Ok(Some(buf[need - 1]))
    }

    /// Read the bytes in `[start, end)` as an owned slice.
    ///
    /// Bytes between the cursor and `start` are read and discarded as
    /// padding; the cursor advances to `end`. An empty range returns
    /// immediately without consuming anything.
    ///
    /// # Errors
    /// - [`ProtocolError::OutOfOrderAccess`] if `start` is below the cursor
    /// - [`ProtocolError::UnexpectedEof`] if the stream yields fewer bytes
    ///   than requested or the range overruns the declared length
    pub fn range(&mut self, start: usize, end: usize) -> Result<Bytes, ListError> {
        self.check_order(start)?;
        if end < start {
            return Err(ProtocolError::OutOfOrderAccess {
                requested: end,
                cursor: start,
            }
            .into());
        }
        if start == end {
            return Ok(Bytes::new());
        }
        self.check_limit(end)?;
        let skip = start - self.cursor;
        let mut buf = vec![0u8; end - self.cursor];
        self.read_full(&mut buf, false)?;
        self.cursor = end;
        Ok(Bytes::from(buf).slice(skip..))
    }

    /// Carve out a bounded sub-window over `[start, end)`.
    ///
    /// The parent's cursor advances to `end` immediately, logically
    /// reserving the range. The returned window starts at cursor 0 with a
    /// declared length of `end - start` and can never read past it. The
    /// caller must consume the sub-window completely before touching the
    /// parent again.
    pub fn sub_window(&mut self, start: usize, end: usize) -> Result<ByteWindow<&mut R>, ListError> {
        self.check_order(start)?;
        if end < start {
            return Err(ProtocolError::OutOfOrderAccess {
                requested: end,
                cursor: start,
            }
            .into());
        }
        if start == end {
            return Ok(ByteWindow {
                source: &mut self.source,
                cursor: 0,
                declared_len: Some(0),
            });
        }
        self.check_limit(end)?;
        let padding = start - self.cursor;
        if padding > 0 {
            self.discard_exact(padding)?;
        }
        self.cursor = end;
        Ok(ByteWindow {
            source: &mut self.source,
            cursor: 0,
            declared_len: Some(end - start),
        })
    }

    /// Read and discard all remaining bytes.
    ///
    /// For a window with a declared length, consumes exactly up to that
    /// length; for an unbounded window, reads until end of stream. Used to
    /// skip unrecognized trailing fields and to guarantee a sub-window is
    /// fully consumed before control returns to its parent.
    pub fn drain(&mut self) -> Result<(), ListError> {
        match self.declared_len {
            Some(len) => {
                let remaining = len.saturating_sub(self.cursor);
                if remaining > 0 {
                    self.discard_exact(remaining)?;
                }
                Ok(())
            }
            None => {
                let mut scratch = [0u8; 4096];
                loop {
                    match self.source.read(&mut scratch) {
                        Ok(0) => return Ok(()),
                        Ok(n) => self.cursor += n,
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => return Err(TransportError::Io(e).into()),
                    }
                }
            }
        }
    }

    fn check_order(&self, requested: usize) -> Result<(), ListError> {
        if requested < self.cursor {
            return Err(ProtocolError::OutOfOrderAccess {
                requested,
                cursor: self.cursor,
            }
            .into());
        }
        Ok(())
    }

    fn check_limit(&self, end: usize) -> Result<(), ListError> {
        if let Some(len) = self.declared_len {
            if end > len {
                return Err(ProtocolError::UnexpectedEof { offset: len }.into());
            }
        }
        Ok(())
    }

    /// Fill `buf` completely from the source. When `clean_eof` is set, a
    /// stream that is already exhausted before the first byte returns
    /// `Ok(false)` instead of an error; a stream that ends partway through
    /// is always an error.
    fn read_full(&mut self, buf: &mut [u8], clean_eof: bool) -> Result<bool, ListError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.source.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 && clean_eof => return Ok(false),
                Ok(0) => {
                    return Err(ProtocolError::UnexpectedEof {
                        offset: self.cursor + filled,
                    }
                    .into())
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::Io(e).into()),
            }
        }
        Ok(true)
    }

    fn discard_exact(&mut self, count: usize) -> Result<(), ListError> {
        let mut scratch = [0u8; 4096];
        let mut remaining = count;
        while remaining > 0 {
            let take = remaining.min(scratch.len());
            self.read_full(&mut scratch[..take], false)?;
            self.cursor += take;
            remaining -= take;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn window(data: &[u8]) -> ByteWindow<Cursor<Vec<u8>>> {
        ByteWindow::new(Cursor::new(data.to_vec()))
    }

    #[test]
    fn byte_at_advances_cursor() {
        let mut w = window(&[10, 20, 30, 40]);
        assert_eq!(w.byte_at(0).unwrap(), 10);
        assert_eq!(w.cursor(), 1);
        assert_eq!(w.byte_at(1).unwrap(), 20);
        assert_eq!(w.cursor(), 2);
    }

    #[test]
    fn byte_at_discards_padding() {
        let mut w = window(&[10, 20, 30, 40]);
        assert_eq!(w.byte_at(2).unwrap(), 30);
        assert_eq!(w.cursor(), 3);
        // Bytes 10 and 20 were consumed as padding
        assert_eq!(w.byte_at(3).unwrap(), 40);
    }

    #[test]
    fn reads_below_cursor_fail() {
        let mut w = window(&[10, 20, 30, 40]);
        w.byte_at(2).unwrap();
        let err = w.byte_at(1).unwrap_err();
        assert!(matches!(
            err,
            ListError::Protocol(ProtocolError::OutOfOrderAccess {
                requested: 1,
                cursor: 3
            })
        ));
        let err = w.range(0, 4).unwrap_err();
        assert!(matches!(
            err,
            ListError::Protocol(ProtocolError::OutOfOrderAccess { .. })
        ));
    }

    #[test]
    fn range_returns_requested_slice() {
        let mut w = window(&[1, 2, 3, 4, 5, 6]);
        let bytes = w.range(1, 4).unwrap();
        assert_eq!(&bytes[..], &[2, 3, 4]);
        assert_eq!(w.cursor(), 4);
    }

    #[test]
    fn empty_range_consumes_nothing() {
        let mut w = window(&[1, 2, 3]);
        let bytes = w.range(2, 2).unwrap();
        assert!(bytes.is_empty());
        assert_eq!(w.cursor(), 0);
        // The skipped bytes are still available afterwards
        assert_eq!(w.byte_at(0).unwrap(), 1);
    }

    #[test]
    fn truncated_range_fails() {
        let mut w = window(&[1, 2, 3]);
        let err = w.range(0, 50).unwrap_err();
        assert!(matches!(
            err,
            ListError::Protocol(ProtocolError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn next_byte_reports_clean_eof() {
        let mut w = window(&[7]);
        assert_eq!(w.next_byte(0).unwrap(), Some(7));
        assert_eq!(w.next_byte(1).unwrap(), None);
    }

    #[test]
    fn declared_len_bounds_reads() {
        let mut w = ByteWindow::with_len(Cursor::new(vec![1u8, 2, 3, 4, 5]), 3);
        assert_eq!(&w.range(0, 3).unwrap()[..], &[1, 2, 3]);
        assert!(w.next_byte(3).unwrap().is_none());
        let err = w.range(3, 4).unwrap_err();
        assert!(matches!(
            err,
            ListError::Protocol(ProtocolError::UnexpectedEof { offset: 3 })
        ));
    }

    #[test]
    fn sub_window_reserves_range_in_parent() {
        let mut w = window(&[1, 2, 3, 4, 5, 6, 7, 8]);
        {
            let mut sub = w.sub_window(2, 5).unwrap();
            assert_eq!(sub.declared_len(), Some(3));
            assert_eq!(&sub.range(0, 3).unwrap()[..], &[3, 4, 5]);
        }
        // Parent resumes exactly at the sub-window's declared end
        assert_eq!(w.cursor(), 5);
        assert_eq!(w.byte_at(5).unwrap(), 6);
    }

    #[test]
    fn drained_sub_window_leaves_no_drift() {
        let mut w = window(&[1, 2, 3, 4, 5, 6]);
        {
            let mut sub = w.sub_window(0, 4).unwrap();
            // Read less than the declared length, then drain the rest
            assert_eq!(sub.byte_at(0).unwrap(), 1);
            sub.drain().unwrap();
        }
        assert_eq!(w.byte_at(4).unwrap(), 5);
        assert_eq!(w.byte_at(5).unwrap(), 6);
    }

    #[test]
    fn empty_sub_window_reads_nothing() {
        let mut w = window(&[9, 8, 7]);
        {
            let mut sub = w.sub_window(1, 1).unwrap();
            assert!(sub.next_byte(0).unwrap().is_none());
            sub.drain().unwrap();
        }
        // Mirrors the quirk that a zero-length carve-out does not advance
        // the parent; the next read consumes the padding itself.
        assert_eq!(w.byte_at(1).unwrap(), 8);
    }

    #[test]
    fn sub_window_discards_leading_padding() {
        let mut w = window(&[1, 2, 3, 4, 5]);
        let mut sub = w.sub_window(2, 4).unwrap();
        assert_eq!(&sub.range(0, 2).unwrap()[..], &[3, 4]);
    }

    #[test]
    fn drain_with_declared_len_stops_at_end() {
        let mut w = ByteWindow::with_len(Cursor::new(vec![1u8, 2, 3, 4, 5]), 3);
        w.drain().unwrap();
        assert_eq!(w.cursor(), 3);
        // Draining twice is a no-op
        w.drain().unwrap();
        assert_eq!(w.cursor(), 3);
    }

    #[test]
    fn drain_unbounded_reads_to_eof() {
        let mut w = window(&[1, 2, 3]);
        w.drain().unwrap();
        assert_eq!(w.cursor(), 3);
        assert!(w.next_byte(3).unwrap().is_none());
    }
}
