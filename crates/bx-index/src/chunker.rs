use crate::hasher::{chunk_hash, chunk_id};
use crate::model::Chunk;

/// Tuning knobs for [`chunk`]. Defaults mirror the reference sizing: chunks
/// target ~1000 characters, never smaller than 200 unless they are the last
/// chunk in the file, with a 5-line overlap between consecutive chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub max_chars: usize,
    pub min_chars: usize,
    pub overlap_lines: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: 1000,
            min_chars: 200,
            overlap_lines: 5,
        }
    }
}

/// Split `content` into line-bounded, overlapping [`Chunk`]s with
/// branch-scoped stable identity.
#[allow(clippy::too_many_arguments)]
pub fn chunk(
    file_path: &str,
    content: &str,
    organization_id: &str,
    project_id: &str,
    branch: &str,
    is_base_branch: bool,
    cfg: ChunkerConfig,
) -> Vec<Chunk> {
    if content.is_empty() {
        return Vec::new();
    }

    let lines: Vec<&str> = content.split('\n').collect();
    let mut out = Vec::new();

    // `cur` holds 0-based indices into `lines` for the chunk under construction.
    let mut cur: Vec<usize> = Vec::new();
    let mut cur_chars: usize = 0;
    let mut start_line: usize = 1;

    for i in 0..lines.len() {
        let line = lines[i];
        let l = line.len() + 1;

        if cur_chars + l > cfg.max_chars && !cur.is_empty() && cur_chars >= cfg.min_chars {
            let end_line = i; // 1-based, inclusive of the line at index i-1
            push_chunk(
                &mut out,
                &lines,
                file_path,
                organization_id,
                project_id,
                branch,
                is_base_branch,
                start_line,
                end_line,
            );

            let keep = cfg.overlap_lines.min(cur.len());
            let seed: Vec<usize> = cur[cur.len() - keep..].to_vec();
            cur_chars = seed.iter().map(|&idx| lines[idx].len() + 1).sum();
            start_line = i - (seed.len().max(1) - 1);
            if seed.is_empty() {
                start_line = i + 1;
            }
            cur = seed;
        }

        cur.push(i);
        cur_chars += l;
    }

    if !cur.is_empty() && cur_chars >= cfg.min_chars {
        push_chunk(
            &mut out,
            &lines,
            file_path,
            organization_id,
            project_id,
            branch,
            is_base_branch,
            start_line,
            lines.len(),
        );
    }

    out
}

#[allow(clippy::too_many_arguments)]
fn push_chunk(
    out: &mut Vec<Chunk>,
    lines: &[&str],
    file_path: &str,
    organization_id: &str,
    project_id: &str,
    branch: &str,
    is_base_branch: bool,
    start_line: usize,
    end_line: usize,
) {
    let code_chunk = lines[start_line - 1..end_line].join("\n");
    let hash = chunk_hash(file_path, start_line, end_line);
    let id = chunk_id(&hash, organization_id, branch);
    out.push(Chunk {
        id,
        organization_id: organization_id.to_string(),
        project_id: project_id.to_string(),
        file_path: file_path.to_string(),
        code_chunk,
        start_line,
        end_line,
        chunk_hash: hash,
        git_branch: branch.to_string(),
        is_base_branch,
    });
}
