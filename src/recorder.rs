//! Wire transcript recording for offline inspection of actor exchanges.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use time::{OffsetDateTime, format_description};

use crate::protocol::{Request, Response};

/// Appends every request/response pair for one actor to a JSONL file.
pub struct TranscriptRecorder {
    file: File,
}

impl TranscriptRecorder {
    /// Create `<dir>/actorNN - <timestamp>.jsonl`, creating `dir` as needed.
    pub fn create(dir: &Path, actor_id: u32) -> io::Result<Self> {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let format = format_description::parse("[year][month][day]-[hour][minute][second]")
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
        let stamp = now
            .format(&format)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }

        let path = dir.join(format!("actor{:02} - {}.jsonl", actor_id, stamp));
        Ok(Self {
            file: File::create(path)?,
        })
    }

    /// Append one exchange as a single JSON line.
    pub fn record(&mut self, request: &Request, response: &Response) -> io::Result<()> {
        let line = serde_json::json!({ "request": request, "response": response });
        writeln!(self.file, "{}", line)?;
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RemoteState;

    #[test]
    fn test_transcript_lines_parse_back() {
        let dir = std::env::temp_dir().join(format!("timberbot-recorder-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);

        let mut recorder = TranscriptRecorder::create(&dir, 3).unwrap();
        recorder
            .record(
                &Request::GetState,
                &Response::ok_state(RemoteState::default()),
            )
            .unwrap();
        recorder
            .record(&Request::Reset, &Response::error("actor offline"))
            .unwrap();

        let mut entries = fs::read_dir(&dir).unwrap();
        let path = entries.next().unwrap().unwrap().path();
        assert!(entries.next().is_none());
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("actor03")
        );

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value.get("request").is_some());
            assert!(value.get("response").is_some());
        }

        fs::remove_dir_all(&dir).unwrap();
    }
}
