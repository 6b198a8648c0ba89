//! M3U playlist parsing and export
//!
//! Parsing is permissive and never fails: malformed lines are skipped.
//! Export comes in two flavors, plain and STB, where the STB flavor
//! rewrites internal localhost proxy commands into direct portal URLs.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::errors::{PortalError, ProtocolError};
use crate::models::{Channel, ProviderConfig, ProviderKind};
use crate::transport::HttpTransport;

/// Parse M3U text into channel records.
///
/// A `#EXTINF` line opens a pending record and consumes the next id, the
/// following `http...` line closes it. A `#EXTINF` with no URL line after
/// it still consumes an id but yields no record.
pub fn parse_m3u(content: &str) -> Vec<Channel> {
    let mut channels = Vec::new();
    let mut pending: Option<Channel> = None;
    let mut next_id: i64 = 0;

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with("#EXTINF") {
            next_id += 1;
            pending = Some(Channel {
                id: next_id,
                name: extinf_name(line).unwrap_or_default(),
                logo: extinf_attr(line, "tvg-logo"),
                tvg_id: extinf_attr(line, "tvg-id"),
                group: extinf_attr(line, "group-title"),
                cmd: String::new(),
            });
        } else if line.starts_with("http") {
            if let Some(mut channel) = pending.take() {
                channel.cmd = line.to_string();
                channels.push(channel);
            }
        }
    }

    channels
}

/// Extract a quoted `attr="value"` from an `#EXTINF` line.
/// Empty values count as absent.
fn extinf_attr(line: &str, attr: &str) -> Option<String> {
    let marker = format!("{}=\"", attr);
    let start = line.find(&marker)? + marker.len();
    let rest = &line[start..];
    let end = rest.find('"')?;
    if end == 0 {
        None
    } else {
        Some(rest[..end].to_string())
    }
}

/// Display name: everything after the last comma on the `#EXTINF` line.
fn extinf_name(line: &str) -> Option<String> {
    let pos = line.rfind(',')?;
    let name = line[pos + 1..].trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Download a playlist over HTTP and parse it.
pub fn download_playlist(
    transport: &HttpTransport,
    url: &str,
) -> Result<Vec<Channel>, PortalError> {
    let response = transport.get_text(url)?;
    if response.status != 200 {
        return Err(ProtocolError::Status(response.status).into());
    }
    Ok(parse_m3u(&response.body))
}

/// Parse a playlist from a local file.
pub fn parse_m3u_file(path: &Path) -> io::Result<Vec<Channel>> {
    Ok(parse_m3u(&fs::read_to_string(path)?))
}

/// The single pseudo-channel an M3USTREAM provider exposes.
pub fn stream_channel(url: &str) -> Channel {
    Channel {
        id: 1,
        name: "Stream".to_string(),
        logo: None,
        tvg_id: None,
        group: None,
        cmd: url.to_string(),
    }
}

fn write_entry<W: Write>(out: &mut W, name: &str, logo: &str, url: &str) -> io::Result<()> {
    writeln!(out, "#EXTINF:-1 tvg-logo=\"{}\" ,{}", logo, name)?;
    writeln!(out, "{}", url)
}

/// Write channels as-is. Channels with an empty command are skipped.
/// Returns the number of entries written.
pub fn write_m3u<W: Write>(out: &mut W, channels: &[Channel]) -> io::Result<usize> {
    writeln!(out, "#EXTM3U")?;
    let mut count = 0;
    for channel in channels {
        if channel.cmd.is_empty() {
            continue;
        }
        write_entry(
            out,
            &channel.name,
            channel.logo.as_deref().unwrap_or(""),
            &channel.cmd,
        )?;
        count += 1;
    }
    Ok(count)
}

/// Write STB-sourced channels, rewriting each command for direct playback.
pub fn write_stb_m3u<W: Write>(
    out: &mut W,
    channels: &[Channel],
    base_url: &str,
    mac: &str,
) -> io::Result<usize> {
    writeln!(out, "#EXTM3U")?;
    let mut count = 0;
    for channel in channels {
        let cmd = rewrite_stb_cmd(&channel.cmd, base_url, mac);
        write_entry(
            out,
            &channel.name,
            channel.logo.as_deref().unwrap_or(""),
            &cmd,
        )?;
        count += 1;
    }
    Ok(count)
}

/// Turn an STB launch command into a directly playable URL.
///
/// The `ffmpeg ` launcher prefix is always stripped. Commands pointing at
/// the portal's internal proxy (`localhost`) carry a `/ch/<id>_` or
/// `/vod/<id>_` stream reference and are rebuilt as direct portal play
/// URLs; anything else passes through unchanged.
pub fn rewrite_stb_cmd(cmd: &str, base_url: &str, mac: &str) -> String {
    let cmd = cmd.replace("ffmpeg ", "");
    if !cmd.contains("localhost") {
        return cmd;
    }
    match stream_ref(&cmd) {
        Some(("ch", id)) => format!(
            "{}/play/live.php?mac={}&stream={}&extension=m3u8",
            base_url, mac, id
        ),
        Some(("vod", id)) => format!(
            "{}/play/vod.php?mac={}&stream={}&extension=m3u8",
            base_url, mac, id
        ),
        _ => cmd,
    }
}

/// Find the first `/ch/<digits>_` or `/vod/<digits>_` stream reference in
/// a command. When both markers appear, the earlier one wins regardless of
/// slot.
fn stream_ref(cmd: &str) -> Option<(&'static str, &str)> {
    let mut first: Option<(usize, &'static str, &str)> = None;
    for slot in ["ch", "vod"] {
        let marker = format!("/{}/", slot);
        let mut from = 0;
        while let Some(rel) = cmd[from..].find(&marker) {
            let pos = from + rel;
            let rest = &cmd[pos + marker.len()..];
            let digits_end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            if digits_end > 0 && rest[digits_end..].starts_with('_') {
                if first.map_or(true, |(seen, _, _)| pos < seen) {
                    first = Some((pos, slot, &rest[..digits_end]));
                }
                break;
            }
            from = pos + marker.len();
        }
    }
    first.map(|(_, slot, id)| (slot, id))
}

/// Export a provider's cached channels to an M3U file, picking the right
/// flavor for its kind.
pub fn export_provider(provider: &ProviderConfig, path: &Path) -> io::Result<usize> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    let count = match provider.kind {
        ProviderKind::Stb => write_stb_m3u(
            &mut out,
            &provider.channels,
            provider.url.trim_end_matches('/'),
            &provider.mac,
        )?,
        _ => write_m3u(&mut out, &provider.channels)?,
    };
    out.flush()?;
    log::info!("exported {} entries to {}", count, path.display());
    Ok(count)
}

#[cfg(test)]
#[path = "m3u_tests.rs"]
mod tests;
