//! Byte-stream adapters for `AwaitableSlice<u8>`
//!
//! `AwaitableSlice<u8>` 的字节流适配器

use std::io;

use super::{AwaitableSlice, ReadError, WriteError};
use crate::park;

/// Blocks until at least one byte is available; `Ok(0)` marks end of stream
///
/// 阻塞直到至少有一个字节可读；`Ok(0)` 表示流结束
impl io::Read for &AwaitableSlice<u8> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match AwaitableSlice::read(*self, buf) {
                Ok(0) => park::block_on(self.await_data()),
                Ok(n) => return Ok(n),
                Err(ReadError::Eof) => return Ok(0),
            }
        }
    }
}

impl io::Read for AwaitableSlice<u8> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut &*self, buf)
    }
}

/// Writes fail with [`io::ErrorKind::BrokenPipe`] once the queue was closed
///
/// 队列关闭后写入以 [`io::ErrorKind::BrokenPipe`] 失败
impl io::Write for &AwaitableSlice<u8> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        AwaitableSlice::write(*self, buf).map_err(|err| match err {
            WriteError::Closed => io::Error::new(io::ErrorKind::BrokenPipe, err),
        })
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for AwaitableSlice<u8> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
