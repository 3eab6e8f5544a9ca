use crate::error::{PipelineError, RetrievalError};

use std::io::{ErrorKind, Read};
use std::time::Instant;
use tracing::trace;

/// Pre-allocated buffer holding one compressed camera image.
///
/// The capacity is fixed at construction; `read_from` never grows it, so a
/// frame can be reused across cycles without touching the allocator.
#[derive(Debug)]
pub struct RawFrame {
    data: Vec<u8>,
    capacity: usize,
}

impl RawFrame {
    /// Reserve exactly `capacity` bytes, reporting allocation failure
    pub fn try_with_capacity(capacity: usize) -> Result<Self, PipelineError> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|e| PipelineError::BuffersUnavailable {
                details: format!("image buffer of {} bytes: {}", capacity, e),
            })?;
        Ok(Self { data, capacity })
    }

    /// Read exactly `expected` bytes from `reader`.
    ///
    /// A length of zero is a missing length, and a length at or above the
    /// capacity is rejected before any byte is read. End of stream or the
    /// deadline passing before `expected` bytes arrive aborts with
    /// `Incomplete`; the frame is left empty on any failure.
    pub fn read_from<R: Read>(
        &mut self,
        reader: &mut R,
        expected: usize,
        deadline: Instant,
    ) -> Result<(), RetrievalError> {
        self.data.clear();

        if expected == 0 {
            return Err(RetrievalError::MissingLength);
        }
        if expected >= self.capacity {
            return Err(RetrievalError::TooLarge {
                length: expected,
                capacity: self.capacity,
            });
        }

        self.data.resize(expected, 0);
        let mut received = 0;

        while received < expected {
            if Instant::now() > deadline {
                break;
            }
            match reader.read(&mut self.data[received..]) {
                Ok(0) => break,
                Ok(n) => {
                    received += n;
                    trace!("Read {} bytes ({}/{})", n, received, expected);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::UnexpectedEof
                    ) =>
                {
                    break
                }
                Err(e) => {
                    self.data.clear();
                    return Err(RetrievalError::Io(e));
                }
            }
        }

        if received < expected {
            self.data.clear();
            return Err(RetrievalError::Incomplete { received, expected });
        }

        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
