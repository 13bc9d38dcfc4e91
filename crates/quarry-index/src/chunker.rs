//! Line-based chunking with overlap, plus head/middle/tail sampling for
//! oversized files.

use quarry_github::FileRecord;

use crate::fragment::Fragment;

/// Characters assumed per line when converting the overlap character budget
/// into a line count. A deliberate approximation: real overlap drifts for
/// very short or very long lines.
const OVERLAP_CHARS_PER_LINE: usize = 50;

/// Chunker configuration.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Target fragment size in characters (default: 600).
    pub target_size: usize,
    /// Overlap carried between adjacent fragments, in characters (default: 120).
    pub overlap: usize,
    /// Files above this line count are sampled instead of chunked whole
    /// (default: 5000).
    pub max_file_lines: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_size: 600,
            overlap: 120,
            max_file_lines: 5000,
        }
    }
}

/// Split files into overlapping fragments.
///
/// Fragment ids are assigned sequentially across all files in input order.
/// Pure and deterministic: identical input yields identical fragments.
#[must_use]
pub fn chunk_files(files: &[FileRecord], config: &ChunkerConfig) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    for file in files {
        chunk_file(file, config, &mut fragments);
    }
    fragments
}

fn chunk_file(file: &FileRecord, config: &ChunkerConfig, out: &mut Vec<Fragment>) {
    if file.content.is_empty() {
        return;
    }
    let lines: Vec<&str> = file.content.lines().collect();

    if lines.len() > config.max_file_lines {
        sample_windows(&lines, &file.path, config, out);
    } else {
        chunk_window(&lines, 0, &file.path, config, out);
    }
}

/// Oversized files are sampled rather than chunked whole: three equal windows
/// (head, centered middle, tail) each go through direct chunking with line
/// numbers kept relative to the original file. Bounds per-file cost for huge
/// generated or vendored files while still surfacing context from all three
/// regions.
fn sample_windows(lines: &[&str], path: &str, config: &ChunkerConfig, out: &mut Vec<Fragment>) {
    let sample = config.max_file_lines / 3;
    let total = lines.len();

    chunk_window(&lines[..sample], 0, path, config, out);

    let middle_start = total / 2 - sample / 2;
    chunk_window(
        &lines[middle_start..middle_start + sample],
        middle_start,
        path,
        config,
        out,
    );

    let tail_start = total - sample;
    chunk_window(&lines[tail_start..], tail_start, path, config, out);
}

/// Direct chunking of one window of lines. `window_start` is the absolute
/// line number of `lines[0]` in the original file.
fn chunk_window(
    lines: &[&str],
    window_start: usize,
    path: &str,
    config: &ChunkerConfig,
    out: &mut Vec<Fragment>,
) {
    let mut buf = String::new();
    let mut buf_lines = 0usize;
    let mut buf_start = window_start;

    for (i, line) in lines.iter().enumerate() {
        if !buf.is_empty() && buf.len() + line.len() + 1 > config.target_size {
            push_fragment(out, &buf, path, buf_start, window_start + i - 1);

            // Seed the next buffer with an overlap suffix of the closed one.
            let overlap_lines = (config.overlap / OVERLAP_CHARS_PER_LINE).min(buf_lines);
            let tail = overlap_suffix(&buf, overlap_lines);
            buf = tail;
            buf_lines = overlap_lines;
            buf_start = (window_start + i).saturating_sub(overlap_lines);
        }
        buf.push_str(line);
        buf.push('\n');
        buf_lines += 1;
    }

    if !buf.trim().is_empty() {
        push_fragment(out, &buf, path, buf_start, window_start + lines.len() - 1);
    }
}

/// Last `count` lines of the buffer, newline-terminated. `count == 0` yields
/// an empty string.
fn overlap_suffix(buf: &str, count: usize) -> String {
    if count == 0 {
        return String::new();
    }
    let lines: Vec<&str> = buf.lines().collect();
    let start = lines.len().saturating_sub(count);
    let mut suffix = lines[start..].join("\n");
    suffix.push('\n');
    suffix
}

fn push_fragment(out: &mut Vec<Fragment>, buf: &str, path: &str, start: usize, end: usize) {
    out.push(Fragment {
        id: out.len(),
        content: buf.trim().to_owned(),
        file_path: path.to_owned(),
        start_line: start,
        end_line: end,
        embedding: None,
    });
}
