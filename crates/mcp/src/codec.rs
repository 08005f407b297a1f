// Newline-delimited frame codec for the stdio transport

use bytes::BytesMut;
use std::io::ErrorKind;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

/// One newline-delimited frame read from the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Line(String),
    /// The line was longer than the limit; its bytes were discarded
    Oversized,
    /// The line was not valid UTF-8; its bytes were discarded
    InvalidUtf8,
}

/// Wraps `LinesCodec` so malformed lines surface as items, not decoder errors
///
/// A decoder error ends a `FramedRead` stream, which would drop requests
/// already buffered behind the bad line.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    lines: LinesCodec,
}

impl FrameCodec {
    pub fn new(max_line_length: usize) -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(max_line_length),
        }
    }

    fn map(result: Result<Option<String>, LinesCodecError>) -> Result<Option<Frame>, std::io::Error> {
        match result {
            Ok(line) => Ok(line.map(Frame::Line)),
            Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Frame::Oversized)),
            // LinesCodec consumes the line before checking its encoding
            Err(LinesCodecError::Io(e)) if e.kind() == ErrorKind::InvalidData => Ok(Some(Frame::InvalidUtf8)),
            Err(LinesCodecError::Io(e)) => Err(e),
        }
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, std::io::Error> {
        Self::map(self.lines.decode(buf))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, std::io::Error> {
        Self::map(self.lines.decode_eof(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut FrameCodec, input: &[u8]) -> Vec<Frame> {
        let mut buf = BytesMut::from(input);
        let mut frames = Vec::new();
        while let Some(frame) = codec.decode(&mut buf).unwrap() {
            frames.push(frame);
        }
        while let Some(frame) = codec.decode_eof(&mut buf).unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_oversized_lines_do_not_hide_later_frames() {
        let mut codec = FrameCodec::new(16);
        let input = format!("{}\n{}\nping\n", "a".repeat(40), "b".repeat(40));

        assert_eq!(
            decode_all(&mut codec, input.as_bytes()),
            vec![Frame::Oversized, Frame::Oversized, Frame::Line("ping".to_string())]
        );
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let mut codec = FrameCodec::new(1024);
        let frames = decode_all(&mut codec, b"bad \xff line\nok\r\n");

        assert_eq!(frames, vec![Frame::InvalidUtf8, Frame::Line("ok".to_string())]);
    }

    #[test]
    fn test_unterminated_last_line_is_returned_at_eof() {
        let mut codec = FrameCodec::new(1024);
        assert_eq!(
            decode_all(&mut codec, b"first\nsecond"),
            vec![Frame::Line("first".to_string()), Frame::Line("second".to_string())]
        );
    }
}
