//! JSONL adapters: frame stream in, annotation stream out.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use posewatch_common::error::{PosewatchError, PosewatchResult};
use posewatch_pose_model::frame::{
    parse_frame_line, AnnotatedFrame, FrameLine, FrameObservation, FrameStreamHeader,
};

/// Annotations flushed to disk every this many frames.
const FLUSH_EVERY: u64 = 500;

/// Receiver for per-frame annotations.
pub trait AnnotationSink {
    fn emit(&mut self, frame: &AnnotatedFrame) -> PosewatchResult<()>;

    /// Called once after the last frame.
    fn finish(&mut self) -> PosewatchResult<()> {
        Ok(())
    }
}

/// Discards every annotation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AnnotationSink for NullSink {
    fn emit(&mut self, _frame: &AnnotatedFrame) -> PosewatchResult<()> {
        Ok(())
    }
}

impl AnnotationSink for Vec<AnnotatedFrame> {
    fn emit(&mut self, frame: &AnnotatedFrame) -> PosewatchResult<()> {
        self.push(frame.clone());
        Ok(())
    }
}

/// Writes one annotation per line for the overlay renderer.
pub struct JsonlAnnotationWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    frames_written: u64,
}

impl JsonlAnnotationWriter {
    /// Create (or truncate) `path`. When a stream header is given it is
    /// copied as the first `#` line so the renderer knows the source video.
    pub fn new(path: PathBuf, header: Option<&FrameStreamHeader>) -> PosewatchResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| PosewatchError::from_io_at(e, &path))?;

        let mut writer = BufWriter::new(file);

        if let Some(header) = header {
            let header_json = serde_json::to_string(header)?;
            writeln!(writer, "# {header_json}")
                .map_err(|e| PosewatchError::processing(format!("Failed to write header: {e}")))?;
        }

        Ok(Self {
            writer,
            path,
            frames_written: 0,
        })
    }

    /// Flush buffered writes to disk.
    pub fn flush(&mut self) -> PosewatchResult<()> {
        self.writer
            .flush()
            .map_err(|e| PosewatchError::processing(format!("Failed to flush annotations: {e}")))
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AnnotationSink for JsonlAnnotationWriter {
    fn emit(&mut self, frame: &AnnotatedFrame) -> PosewatchResult<()> {
        let json = serde_json::to_string(frame)?;
        writeln!(self.writer, "{json}")
            .map_err(|e| PosewatchError::processing(format!("Failed to write annotation: {e}")))?;
        self.frames_written += 1;

        if self.frames_written % FLUSH_EVERY == 0 {
            self.flush()?;
        }

        Ok(())
    }

    fn finish(&mut self) -> PosewatchResult<()> {
        self.flush()
    }
}

impl Drop for JsonlAnnotationWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Lenient frame reader used by the analysis loop.
///
/// Yields one [`FrameObservation`] per frame line. A frame line that fails
/// to parse still yields a frame (an empty observation) so frame indices
/// stay aligned with the source video; so does a line that is not valid
/// UTF-8. Only an I/O error ends the stream early.
pub struct JsonlFrameSource<R> {
    reader: R,
    header: Option<FrameStreamHeader>,
    seen_header_line: bool,
    pending: Option<FrameObservation>,
    line_no: usize,
    malformed: u64,
    read_error: Option<PosewatchError>,
    done: bool,
}

impl JsonlFrameSource<BufReader<File>> {
    /// Open a frame stream file. Failing to open is fatal.
    pub fn open(path: &Path) -> PosewatchResult<Self> {
        let file = File::open(path).map_err(|e| PosewatchError::from_io_at(e, path))?;
        tracing::debug!(path = %path.display(), "Opened frame stream");
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonlFrameSource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            header: None,
            seen_header_line: false,
            pending: None,
            line_no: 0,
            malformed: 0,
            read_error: None,
            done: false,
        }
    }

    /// Stream header, once the header line has been read.
    pub fn header(&self) -> Option<&FrameStreamHeader> {
        self.header.as_ref()
    }

    /// Read up to the first frame so a leading header is available. The
    /// frame is buffered and still yielded by the iterator.
    pub fn read_preamble(&mut self) -> Option<&FrameStreamHeader> {
        if self.pending.is_none() {
            self.pending = self.next_frame();
        }
        self.header.as_ref()
    }

    /// Frame lines that failed to parse so far.
    pub fn malformed_lines(&self) -> u64 {
        self.malformed
    }

    /// The I/O error that ended the stream early, if any.
    pub fn read_error(&self) -> Option<&PosewatchError> {
        self.read_error.as_ref()
    }

    fn malformed_frame(&mut self, error: &dyn std::fmt::Display) -> FrameObservation {
        self.malformed += 1;
        tracing::warn!(line = self.line_no, error = %error, "Malformed frame line, treating as empty frame");
        FrameObservation::empty()
    }

    /// Only the first `#` line is read as the header.
    fn accept_header(&mut self, payload: &str) {
        if self.seen_header_line {
            return;
        }
        self.seen_header_line = true;
        match serde_json::from_str::<FrameStreamHeader>(payload) {
            Ok(header) => {
                tracing::debug!(
                    schema_version = %header.schema_version,
                    source = ?header.source,
                    "Frame stream header"
                );
                self.header = Some(header);
            }
            Err(e) => {
                tracing::warn!(line = self.line_no, error = %e, "Ignoring malformed stream header");
            }
        }
    }
}

impl<R: BufRead> Iterator for JsonlFrameSource<R> {
    type Item = FrameObservation;

    fn next(&mut self) -> Option<FrameObservation> {
        self.pending.take().or_else(|| self.next_frame())
    }
}

impl<R: BufRead> JsonlFrameSource<R> {
    fn next_frame(&mut self) -> Option<FrameObservation> {
        if self.done {
            return None;
        }

        loop {
            let mut buf = Vec::new();
            match self.reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    let err = PosewatchError::frame_source(format!(
                        "read failed after line {}: {e}",
                        self.line_no
                    ));
                    tracing::warn!(error = %err, "Ending frame stream early");
                    self.read_error = Some(err);
                    self.done = true;
                    return None;
                }
            }
            self.line_no += 1;

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line,
                Err(e) => return Some(self.malformed_frame(&e)),
            };

            match parse_frame_line(line) {
                FrameLine::Blank => continue,
                FrameLine::Header(payload) => self.accept_header(payload),
                FrameLine::Frame(Ok(frame)) => return Some(frame),
                FrameLine::Frame(Err(e)) => return Some(self.malformed_frame(&e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posewatch_pose_model::activity::Activity;
    use std::io::Cursor;

    fn source(text: &str) -> JsonlFrameSource<Cursor<Vec<u8>>> {
        JsonlFrameSource::from_reader(Cursor::new(text.as_bytes().to_vec()))
    }

    #[test]
    fn test_source_reads_header_and_frames() {
        let mut src = source(concat!(
            "# {\"schema_version\":\"1.0\",\"source\":\"input_video.mp4\"}\n",
            "\n",
            "{\"pose\":null}\n",
            "{}\n",
        ));
        assert!(src.next().is_some());
        assert_eq!(
            src.header().and_then(|h| h.source.as_deref()),
            Some("input_video.mp4")
        );
        assert!(src.next().is_some());
        assert!(src.next().is_none());
        assert_eq!(src.malformed_lines(), 0);
    }

    #[test]
    fn test_malformed_line_is_an_empty_frame() {
        let frames: Vec<_> = source("{}\nnot json\n{\"pose\":7}\n{}\n").collect();
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[1], FrameObservation::empty());
        assert_eq!(frames[2], FrameObservation::empty());

        let mut src = source("{}\nnot json\n");
        src.by_ref().for_each(drop);
        assert_eq!(src.malformed_lines(), 1);
    }

    #[test]
    fn test_preamble_exposes_header_without_losing_a_frame() {
        let mut src = source(concat!(
            "# {\"schema_version\":\"1.0\",\"fps\":25.0}\n",
            "{\"faces\":{\"error\":\"x\"}}\n",
            "{}\n",
        ));
        assert_eq!(src.read_preamble().and_then(|h| h.fps), Some(25.0));
        assert_eq!(src.read_preamble().and_then(|h| h.fps), Some(25.0));
        let frames: Vec<_> = src.collect();
        assert_eq!(frames.len(), 2);
        assert!(frames[0].emotions.is_failure());
    }

    #[test]
    fn test_invalid_utf8_line_is_an_empty_frame() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"{}\n");
        bytes.extend_from_slice(b"{\"faces\":[{\"region\":{\"x\":0,\"y\":0,\"w\":8,\"h\":8},\"dominant_emotion\":\"ha\xffppy\"}]}\n");
        for _ in 0..5 {
            bytes.extend_from_slice(b"{\"pose\":null}\n");
        }

        let mut src = JsonlFrameSource::from_reader(Cursor::new(bytes));
        let frames: Vec<_> = src.by_ref().collect();
        assert_eq!(frames.len(), 7);
        assert_eq!(frames[1], FrameObservation::empty());
        assert_eq!(src.malformed_lines(), 1);
        assert!(src.read_error().is_none());
    }

    #[test]
    fn test_bad_faces_do_not_drop_the_pose() {
        let pose = r#""pose":{"nose":{"x":0.5,"y":0.2,"z":0.0,"visibility":0.9}}"#;
        let text = format!(
            "{{{pose},\"faces\":null}}\n{{{pose},\"faces\":[{{\"region\":{{\"x\":1,\"y\":1,\"w\":-3,\"h\":4}},\"dominant_emotion\":\"sad\"}}]}}\n"
        );
        let mut src = source(&text);
        let frames: Vec<_> = src.by_ref().collect();
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.pose.is_some()));
        assert!(frames.iter().all(|f| f.emotions.is_failure()));
        assert_eq!(src.malformed_lines(), 0);
    }

    struct BrokenReader {
        served: bool,
    }

    impl std::io::Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.served {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "device gone"));
            }
            self.served = true;
            let line = b"{}\n";
            buf[..line.len()].copy_from_slice(line);
            Ok(line.len())
        }
    }

    #[test]
    fn test_io_error_ends_stream_with_frame_source_error() {
        let mut src = JsonlFrameSource::from_reader(BufReader::new(BrokenReader { served: false }));
        assert_eq!(src.by_ref().count(), 1);
        assert!(matches!(
            src.read_error(),
            Some(PosewatchError::FrameSource { .. })
        ));
        assert!(src.next().is_none());
    }

    #[test]
    fn test_bad_header_is_ignored() {
        let mut src = source("# not a header\n# {\"schema_version\":\"1.0\"}\n{}\n");
        assert_eq!(src.by_ref().count(), 1);
        assert!(src.header().is_none());
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let path = std::env::temp_dir().join("posewatch_no_such_stream.jsonl");
        let err = JsonlFrameSource::open(&path).err().unwrap();
        assert!(matches!(err, PosewatchError::FileNotFound { .. }));
    }

    #[test]
    fn test_annotation_writer_output() {
        let dir = std::env::temp_dir().join("posewatch_test_annotations");
        let _ = std::fs::remove_dir_all(&dir);

        let path = dir.join("out").join("annotations.jsonl");
        let header = FrameStreamHeader {
            schema_version: "1.0".to_string(),
            source: Some("input_video.mp4".to_string()),
            fps: Some(30.0),
            width: Some(1280),
            height: Some(720),
        };

        {
            let mut writer = JsonlAnnotationWriter::new(path.clone(), Some(&header)).unwrap();
            for index in 0..3 {
                writer
                    .emit(&AnnotatedFrame {
                        index,
                        activity: Some(Activity::Idle),
                        caption: Some(Activity::Idle.overlay_text()),
                        rule: None,
                        anomaly: false,
                        emotions: vec![],
                        bones: vec![],
                    })
                    .unwrap();
            }
            assert_eq!(writer.frames_written(), 3);
            writer.finish().unwrap();
            assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 4);
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("# "));

        let frames: Vec<AnnotatedFrame> = lines[1..]
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(frames[2].index, 2);
        assert_eq!(frames[0].caption.as_deref(), Some("Atividade: Parado"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<AnnotatedFrame> = Vec::new();
        let frame = AnnotatedFrame {
            index: 0,
            activity: None,
            caption: None,
            rule: None,
            anomaly: false,
            emotions: vec![],
            bones: vec![],
        };
        sink.emit(&frame).unwrap();
        NullSink.emit(&frame).unwrap();
        assert_eq!(sink, vec![frame]);
    }
}
