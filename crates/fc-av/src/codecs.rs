//! Codec listing parsed from `ffmpeg -codecs`.

use serde::{Deserialize, Serialize};

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Stream type a codec handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    Video,
    Audio,
    Subtitle,
    Data,
    Attachment,
}

/// One row of the ffmpeg codec table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecInfo {
    pub name: String,
    pub kind: CodecKind,
    pub decode: bool,
    pub encode: bool,
    pub description: String,
}

/// List the codecs the discovered ffmpeg supports.
///
/// Returns an empty list if ffmpeg is missing or the listing fails; the
/// failure is logged.
pub async fn supported_codecs(tools: &ToolRegistry) -> Vec<CodecInfo> {
    let ffmpeg = match tools.require("ffmpeg") {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Could not list codecs: {e}");
            return Vec::new();
        }
    };

    let mut cmd = ToolCommand::new(ffmpeg.path.clone());
    cmd.args(["-hide_banner", "-codecs"]);
    match cmd.execute().await {
        Ok(output) => parse_codecs(&output.stdout),
        Err(e) => {
            tracing::error!("Could not list codecs: {e}");
            Vec::new()
        }
    }
}

/// Parse the table printed by `ffmpeg -codecs`.
///
/// Rows follow the `-------` separator and look like
/// `DEV.LS h264   H.264 / AVC / MPEG-4 AVC`. The six flag columns are
/// decode, encode, stream type, intra-only, lossy and lossless.
pub fn parse_codecs(listing: &str) -> Vec<CodecInfo> {
    listing
        .lines()
        .skip_while(|l| !l.trim_start().starts_with("---"))
        .skip(1)
        .filter_map(parse_codec_row)
        .collect()
}

fn parse_codec_row(line: &str) -> Option<CodecInfo> {
    let line = line.trim();
    let (flags, rest) = line.split_once(char::is_whitespace)?;
    let flags: Vec<char> = flags.chars().collect();
    if flags.len() != 6 {
        return None;
    }

    let kind = match flags[2] {
        'V' => CodecKind::Video,
        'A' => CodecKind::Audio,
        'S' => CodecKind::Subtitle,
        'D' => CodecKind::Data,
        'T' => CodecKind::Attachment,
        _ => return None,
    };

    let rest = rest.trim_start();
    let (name, description) = match rest.split_once(char::is_whitespace) {
        Some((n, d)) => (n, d.trim()),
        None => (rest, ""),
    };
    if name.is_empty() {
        return None;
    }

    Some(CodecInfo {
        name: name.to_string(),
        kind,
        decode: flags[0] == 'D',
        encode: flags[1] == 'E',
        description: description.to_string(),
    })
}
