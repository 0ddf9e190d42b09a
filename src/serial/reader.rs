/// Frame extraction from the raw multisensor byte stream
use log::debug;
use std::fmt;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// ETX, sent by the sensor after every telegram
pub const FRAME_TERMINATOR: u8 = 0x03;
/// Upper bound for one frame; a longer run of bytes is cut here
pub const MAX_FRAME_LEN: usize = 150;

/// Bytes of one read cycle, terminator included when one was seen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    bytes: Vec<u8>,
}

impl RawFrame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True when the frame ended on the terminator rather than the length bound
    pub fn is_terminated(&self) -> bool {
        self.bytes.last() == Some(&FRAME_TERMINATOR)
    }
}

impl From<Vec<u8>> for RawFrame {
    fn from(bytes: Vec<u8>) -> Self {
        RawFrame { bytes }
    }
}

impl From<&[u8]> for RawFrame {
    fn from(bytes: &[u8]) -> Self {
        RawFrame {
            bytes: bytes.to_vec(),
        }
    }
}

/// Printable rendering for diagnostics; control bytes are escaped
impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bytes.escape_ascii())
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Reads terminated frames from any async byte source
///
/// The source is normally the serial device, but anything implementing
/// `AsyncRead` works, which keeps the reader testable with plain slices.
pub struct FrameReader<R> {
    source: R,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(source: R) -> Self {
        FrameReader { source }
    }

    /// Read the next frame
    ///
    /// Waits until input is available, then collects bytes until the
    /// terminator arrives or `MAX_FRAME_LEN` bytes have been gathered.
    /// Transient read errors are retried in place.
    ///
    /// # Returns
    /// `Ok(None)` once the source is exhausted, otherwise the collected frame.
    /// A frame cut short by end of input is still returned so it can be
    /// reported as malformed.
    pub async fn read_frame(&mut self) -> io::Result<Option<RawFrame>> {
        let mut bytes = Vec::with_capacity(MAX_FRAME_LEN);

        while bytes.len() < MAX_FRAME_LEN {
            let byte = match self.source.read_u8().await {
                Ok(byte) => byte,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    if bytes.is_empty() {
                        return Ok(None);
                    }
                    debug!("Input ended inside a frame after {} bytes", bytes.len());
                    break;
                }
                Err(e) if is_transient(&e) => {
                    debug!("Transient read error, retrying: {}", e);
                    tokio::task::yield_now().await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            bytes.push(byte);
            if byte == FRAME_TERMINATOR {
                break;
            }
        }

        Ok(Some(RawFrame { bytes }))
    }
}
