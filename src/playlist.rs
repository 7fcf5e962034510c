//! Line-oriented editor for the HLS master playlist (spec §4.7). Grounded on
//! the splice logic in `original_source/pkg/handler/handler.go`'s
//! `AddAudioTracks`/`AddSubtitles`, generalized into a reusable type the
//! audio and subtitle mux stages both drive.

use anyhow::{Context, Result};
use std::path::Path;

/// The `#EXT-X-STREAM-INF` / URI line pairs start at index 2 in a freshly
/// written master playlist (`#EXTM3U`, `#EXT-X-VERSION:N`, then pairs).
const VARIANT_LINES_START: usize = 2;

pub struct MasterPlaylist {
    lines: Vec<String>,
}

impl MasterPlaylist {
    pub async fn read(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read master playlist {}", path.display()))?;
        Ok(Self {
            lines: content.lines().map(str::to_string).collect(),
        })
    }

    pub async fn write(&self, path: &Path) -> Result<()> {
        let content = self.lines.join("\n");
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("failed to write master playlist {}", path.display()))
    }

    /// Inserts `media_lines` at `anchor`. When `blank_separator` is set, two
    /// empty lines are inserted after the block — the audio splice does this,
    /// the subtitle splice does not (spec §8 property #2).
    pub fn splice(&mut self, anchor: usize, media_lines: Vec<String>, blank_separator: bool) {
        let anchor = anchor.min(self.lines.len());
        let mut insert = media_lines;
        if blank_separator {
            insert.push(String::new());
            insert.push(String::new());
        }
        for (offset, line) in insert.into_iter().enumerate() {
            self.lines.insert(anchor + offset, line);
        }
    }

    /// Applies `transform` to every `#EXT-X-STREAM-INF` line (identified by
    /// containing `"RESOLUTION"`) at or after `from_index`. `from_index` only
    /// needs to clear the two-line `#EXTM3U`/`#EXT-X-VERSION` header —
    /// content matching does the rest, so callers pass a fixed floor
    /// regardless of how many media lines were spliced in before it.
    pub fn edit_stream_inf<F>(&mut self, from_index: usize, transform: F) -> Result<()>
    where
        F: Fn(&str) -> Result<String>,
    {
        for i in from_index.max(VARIANT_LINES_START)..self.lines.len() {
            if self.lines[i].contains("RESOLUTION") {
                self.lines[i] = transform(&self.lines[i])?;
            }
        }
        Ok(())
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// Appends `,CODEC_SUFFIX",ATTR="value"` in place of a trailing closing
/// quote (the audio splice's CODECS-quote-splice). Fails loudly if the line
/// does not end in `"`, per spec.md Open Question (b): silently mis-splicing
/// a malformed line would corrupt the playlist without any signal.
pub fn splice_into_trailing_quote(line: &str, suffix: &str) -> Result<String> {
    if !line.ends_with('"') {
        anyhow::bail!("expected #EXT-X-STREAM-INF line to end with a closing quote: {line:?}");
    }
    let mut s = line.to_string();
    s.pop();
    s.push_str(suffix);
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MasterPlaylist {
        MasterPlaylist {
            lines: vec![
                "#EXTM3U".to_string(),
                "#EXT-X-VERSION:3".to_string(),
                "#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360,CODECS=\"avc1.4d001f\"".to_string(),
                "360p/index.m3u8".to_string(),
            ],
        }
    }

    #[test]
    fn splice_with_blank_separator_inserts_two_blank_lines() {
        let mut pl = sample();
        let before = pl.lines.len();
        pl.splice(2, vec!["#EXT-X-MEDIA:TYPE=AUDIO".to_string()], true);
        assert_eq!(pl.lines.len(), before + 3);
        assert_eq!(pl.lines[3], "");
        assert_eq!(pl.lines[4], "");
    }

    #[test]
    fn splice_without_blank_separator_inserts_only_given_lines() {
        let mut pl = sample();
        let before = pl.lines.len();
        pl.splice(2, vec!["#EXT-X-MEDIA:TYPE=SUBTITLES".to_string()], false);
        assert_eq!(pl.lines.len(), before + 1);
    }

    #[test]
    fn edit_stream_inf_only_touches_resolution_lines() {
        let mut pl = sample();
        pl.edit_stream_inf(2, |l| splice_into_trailing_quote(l, ",mp4a.40.2\",AUDIO=\"audio\""))
            .unwrap();
        assert!(pl.lines[2].ends_with(",mp4a.40.2\",AUDIO=\"audio\""));
        assert_eq!(pl.lines[3], "360p/index.m3u8");
    }

    #[test]
    fn splice_into_trailing_quote_errors_when_line_has_no_closing_quote() {
        let err = splice_into_trailing_quote("not-quoted", ",x").unwrap_err();
        assert!(err.to_string().contains("closing quote"));
    }
}
