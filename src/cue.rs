use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::types::AudioFormat;
use crate::{Error, Result};

const FIRST_TRACK_AT_ZERO: &str = "INDEX 01 00:00:00";

/// Raw CUE sheet contents. Only pattern checks are made against it.
#[derive(Debug)]
pub(crate) struct CueText {
    text: String,
}

impl CueText {
    pub(crate) fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|err| {
            Error::Io(format!("failed to read cue file {}: {}", path.display(), err))
        })?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Markers are ASCII, so a lossy decode is enough for any 8-bit encoding.
    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            text: String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Audio formats mentioned anywhere in the sheet, case-insensitively.
    pub(crate) fn referenced_formats(&self) -> Vec<AudioFormat> {
        let lower = self.text.to_ascii_lowercase();
        AudioFormat::ALL
            .into_iter()
            .filter(|format| lower.contains(&format!(".{}", format.extension())))
            .collect()
    }

    pub(crate) fn has_track_one_at_zero(&self) -> bool {
        self.text.contains(FIRST_TRACK_AT_ZERO)
    }

    /// `INDEX 00` lines plus the first `INDEX 01` line, with 1-based line numbers.
    pub(crate) fn leading_index_lines(&self) -> Vec<(usize, String)> {
        let mut lines = Vec::new();
        for (idx, line) in self.text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with("INDEX 00") {
                lines.push((idx + 1, trimmed.to_string()));
            } else if trimmed.starts_with("INDEX 01") {
                lines.push((idx + 1, trimmed.to_string()));
                break;
            }
        }
        lines
    }

    /// Distinct file names from `FILE "<name>" <type>` lines.
    pub(crate) fn file_entries(&self) -> BTreeSet<String> {
        self.text
            .lines()
            .filter_map(|line| parse_file_line(line.trim()))
            .collect()
    }

    pub(crate) fn track_count(&self) -> usize {
        self.text
            .lines()
            .filter(|line| line.trim_start().starts_with("TRACK "))
            .count()
    }
}

fn parse_file_line(line: &str) -> Option<String> {
    let rest = line.strip_prefix("FILE ")?.trim_start();
    if let Some(quoted) = rest.strip_prefix('"') {
        let end = quoted.find('"')?;
        return Some(quoted[..end].to_string());
    }
    rest.split_whitespace().next().map(str::to_string)
}

/// Rejects sheets the splitter cannot handle: no known format marker, a
/// pre-gap before track 1, or several audio files.
pub(crate) fn validate_cue_text(cue: &CueText) -> Result<()> {
    if cue.referenced_formats().is_empty() {
        let expected: Vec<String> = AudioFormat::ALL
            .iter()
            .map(|format| format!(".{}", format.extension()))
            .collect();
        return Err(Error::Precondition(format!(
            "unsupported audio format: the cue sheet references none of {}",
            expected.join(", ")
        )));
    }

    if !cue.has_track_one_at_zero() {
        let mut message = format!(
            "track 1 has a pre-gap: the cue sheet has no \"{}\"",
            FIRST_TRACK_AT_ZERO
        );
        for (num, line) in cue.leading_index_lines() {
            message.push_str(&format!("\n    line {}: {}", num, line));
        }
        message.push_str(
            "\nsplitting would put the audio before track 1 into an extra file; \
edit the cue sheet so track 1 starts at INDEX 01 00:00:00 and run again",
        );
        return Err(Error::Precondition(message));
    }

    let files = cue.file_entries();
    if files.len() > 1 {
        let names: Vec<&str> = files.iter().map(String::as_str).collect();
        return Err(Error::Precondition(format!(
            "cue sheet references multiple audio files: {}",
            names.join(", ")
        )));
    }

    Ok(())
}

/// Whether the sheet's `FILE` entry names `audio` (by file name or stem).
pub(crate) fn references_audio(cue: &CueText, audio: &Path) -> bool {
    let Some(entry) = cue.file_entries().into_iter().next() else {
        return true;
    };
    let entry = Path::new(&entry);
    let same_name = entry.file_name() == audio.file_name();
    let same_stem = entry.file_stem() == audio.file_stem();
    same_name || same_stem
}

#[cfg(test)]
mod tests {
    use super::{CueText, references_audio, validate_cue_text};
    use crate::Error;
    use crate::types::AudioFormat;
    use std::path::Path;

    const GOOD: &str = r#"REM DATE 1988
PERFORMER "Artist"
TITLE "Album"
FILE "Album.FLAC" WAVE
  TRACK 01 AUDIO
    TITLE "One"
    INDEX 01 00:00:00
  TRACK 02 AUDIO
    TITLE "Two"
    INDEX 00 03:10:00
    INDEX 01 03:12:00
"#;

    const PREGAP: &str = r#"FILE "album.ape" WAVE
  TRACK 01 AUDIO
    TITLE "One"
    INDEX 00 00:00:00
    INDEX 01 00:02:00
  TRACK 02 AUDIO
    INDEX 01 04:00:00
"#;

    #[test]
    fn detects_format_marker_case_insensitively() {
        let cue = CueText::from_bytes(GOOD.as_bytes());
        assert_eq!(cue.referenced_formats(), vec![AudioFormat::Flac]);
        assert!(validate_cue_text(&cue).is_ok());
        assert_eq!(cue.track_count(), 2);
    }

    #[test]
    fn rejects_sheet_without_format_marker() {
        let cue = CueText::from_bytes(GOOD.replace("Album.FLAC", "Album.mp3").as_bytes());
        let err = validate_cue_text(&cue).unwrap_err();
        assert!(err.to_string().starts_with("unsupported audio format"));
    }

    #[test]
    fn pregap_reports_index_lines() {
        let cue = CueText::from_bytes(PREGAP.as_bytes());
        assert_eq!(
            cue.leading_index_lines(),
            vec![
                (4, "INDEX 00 00:00:00".to_string()),
                (5, "INDEX 01 00:02:00".to_string()),
            ]
        );

        let err = validate_cue_text(&cue).unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        let message = err.to_string();
        assert!(message.contains("pre-gap"));
        assert!(message.contains("line 4: INDEX 00 00:00:00"));
        assert!(message.contains("line 5: INDEX 01 00:02:00"));
    }

    #[test]
    fn rejects_multi_file_sheets() {
        let text = format!("{}FILE \"Disc 2.flac\" WAVE\n  TRACK 03 AUDIO\n    INDEX 01 00:00:00\n", GOOD);
        let cue = CueText::from_bytes(text.as_bytes());
        let err = validate_cue_text(&cue).unwrap_err();
        assert!(err.to_string().contains("multiple audio files"));
    }

    #[test]
    fn legacy_bytes_still_match_markers() {
        let mut bytes = b"PERFORMER \"".to_vec();
        bytes.extend_from_slice(&[0xca, 0xe8, 0xed, 0xee]);
        bytes.extend_from_slice(b"\"\nFILE \"a.wv\" WAVE\n  TRACK 01 AUDIO\n    INDEX 01 00:00:00\n");
        let cue = CueText::from_bytes(&bytes);
        assert_eq!(cue.referenced_formats(), vec![AudioFormat::WavPack]);
        assert!(validate_cue_text(&cue).is_ok());
    }

    #[test]
    fn matches_audio_by_stem() {
        let cue = CueText::from_bytes(GOOD.as_bytes());
        assert!(references_audio(&cue, Path::new("/x/Album.FLAC")));
        assert!(references_audio(&cue, Path::new("/x/Album.ape")));
        assert!(!references_audio(&cue, Path::new("/x/Other.flac")));

        let cue = CueText::from_bytes(PREGAP.as_bytes());
        assert!(references_audio(&cue, Path::new("/x/album.flac")));
        assert!(!references_audio(&cue, Path::new("/x/other.flac")));
    }
}
