use std::sync::OnceLock;

use regex::Regex;

/// Classification of a line in the outer diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Unchanged,
    Removed,
    Added,
}

/// Generates HTML diffs between two strings.
///
/// Line-level first (LCS over lines), then character-level (LCS over
/// characters) for removed/added line pairs. Whitespace-only changes get
/// a dedicated renderer that marks each inserted or removed whitespace
/// character, newlines included. Pure function of its inputs plus the
/// configuration on this struct; safe to share across threads.
pub struct DiffEngine {
    /// Number of unchanged context lines shown around each change.
    pub context_lines: usize,
    /// Lines longer than this skip the character-level diff; the LCS table
    /// is O(m*n) and would blow up on huge lines.
    pub max_char_diff: usize,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self {
            context_lines: 3,
            max_char_diff: 1000,
        }
    }
}

impl DiffEngine {
    pub fn new(context_lines: usize) -> Self {
        Self {
            context_lines,
            ..Self::default()
        }
    }

    /// Compare two strings and return an inline (unified style) HTML diff.
    pub fn compare(&self, old: &str, new: &str) -> String {
        let old = normalize_line_endings(old);
        let new = normalize_line_endings(new);

        if self.is_whitespace_only_change(&old, &new) {
            return self.render_whitespace_change(&old, &new);
        }

        self.render_inline(&old, &new)
    }

    /// Compare two strings and return a side-by-side (two column) HTML diff.
    pub fn compare_side_by_side(&self, old: &str, new: &str) -> String {
        let old = normalize_line_endings(old);
        let new = normalize_line_endings(new);

        if self.is_whitespace_only_change(&old, &new) {
            return self.render_whitespace_change(&old, &new);
        }

        self.render_side_by_side(&old, &new)
    }

    /// True when the two strings differ only in whitespace or newlines.
    fn is_whitespace_only_change(&self, old: &str, new: &str) -> bool {
        static WS: OnceLock<Regex> = OnceLock::new();
        let ws = WS.get_or_init(|| Regex::new(r"\s+").expect("static pattern is valid"));

        let old_normalized = ws.replace_all(old.trim(), " ");
        let new_normalized = ws.replace_all(new.trim(), " ");

        old_normalized == new_normalized && old != new
    }

    /// Character-level rendering for whitespace-only changes: walk both
    /// strings against their LCS, emitting `<del>`/`<ins>` around each
    /// whitespace character that moved, with a visible `↵` for newlines.
    fn render_whitespace_change(&self, old: &str, new: &str) -> String {
        let old_chars: Vec<char> = old.chars().collect();
        let new_chars: Vec<char> = new.chars().collect();
        let lcs = longest_common_subsequence(&old_chars, &new_chars);

        let mut html = String::from(
            "<div class=\"diff-whitespace-change\">\
             <div class=\"p-2 border bg-light\" style=\"white-space: pre-wrap; word-wrap: break-word;\">",
        );

        let (mut old_i, mut new_i, mut lcs_i) = (0, 0, 0);

        while old_i < old_chars.len() || new_i < new_chars.len() {
            let old_in_lcs = old_i < old_chars.len()
                && lcs_i < lcs.len()
                && old_chars[old_i] == lcs[lcs_i];
            let new_in_lcs = new_i < new_chars.len()
                && lcs_i < lcs.len()
                && new_chars[new_i] == lcs[lcs_i];

            if old_in_lcs && new_in_lcs {
                html.push_str(&escape_char(old_chars[old_i]));
                old_i += 1;
                new_i += 1;
                lcs_i += 1;
            } else if !old_in_lcs && old_i < old_chars.len() {
                let ch = old_chars[old_i];
                if ch == '\n' {
                    html.push_str("<del class=\"empty-line\">↵</del>");
                } else {
                    html.push_str(&format!("<del>{}</del>", escape_char(ch)));
                }
                old_i += 1;
            } else if !new_in_lcs && new_i < new_chars.len() {
                let ch = new_chars[new_i];
                if ch == '\n' {
                    html.push_str("<ins class=\"empty-line\">↵</ins>\n");
                } else {
                    html.push_str(&format!("<ins>{}</ins>", escape_char(ch)));
                }
                new_i += 1;
            } else {
                break;
            }
        }

        html.push_str("</div></div>");
        html
    }

    fn render_inline(&self, old: &str, new: &str) -> String {
        let diff = diff_lines(old, new);
        let show = self.lines_to_show(&diff);
        let items = group_changes_for_char_diff(&diff, self.max_char_diff);

        let mut html = String::from(
            "<table class=\"diff-wrapper diff-inline\">\
             <thead><tr><th class=\"line-num\">#</th><th class=\"sign\"></th><th>Content</th></tr></thead>\
             <tbody>",
        );

        let mut line_num = 0usize;
        let mut last_shown: Option<usize> = None;

        for item in &items {
            if !show[item.orig_index] {
                continue;
            }

            if let Some(last) = last_shown
                && item.orig_index > last + 1
            {
                html.push_str(
                    "<tr class=\"separator\">\
                     <td colspan=\"3\" class=\"text-center text-muted\">...</td></tr>",
                );
            }
            last_shown = Some(item.orig_index);

            line_num += 1;

            match item.kind {
                LineKind::Unchanged => {
                    html.push_str(&format!(
                        "<tr class=\"unchanged\"><td class=\"line-num\">{line_num}</td>\
                         <td class=\"sign\"> </td><td>{}</td></tr>",
                        html_escape(&item.line),
                    ));
                }
                LineKind::Added => {
                    let content = match &item.html {
                        Some(marked) => marked.clone(),
                        None if item.line.is_empty() => {
                            "<ins class=\"empty-line\">↵</ins>".to_string()
                        }
                        None => format!("<ins>{}</ins>", html_escape(&item.line)),
                    };
                    html.push_str(&format!(
                        "<tr class=\"added\"><td class=\"line-num\">+</td>\
                         <td class=\"sign\">+</td><td>{content}</td></tr>",
                    ));
                }
                LineKind::Removed => {
                    let content = match &item.html {
                        Some(marked) => marked.clone(),
                        None if item.line.is_empty() => {
                            "<del class=\"empty-line\">↵</del>".to_string()
                        }
                        None => format!("<del>{}</del>", html_escape(&item.line)),
                    };
                    html.push_str(&format!(
                        "<tr class=\"removed\"><td class=\"line-num\">-</td>\
                         <td class=\"sign\">-</td><td>{content}</td></tr>",
                    ));
                    // Removed lines do not exist in the new text.
                    line_num -= 1;
                }
            }
        }

        html.push_str("</tbody></table>");
        html
    }

    fn render_side_by_side(&self, old: &str, new: &str) -> String {
        let diff = diff_lines(old, new);
        let show = self.lines_to_show(&diff);

        let mut rows: Vec<SideRow> = Vec::new();
        let mut old_buffer: Vec<String> = Vec::new();
        let mut new_buffer: Vec<String> = Vec::new();
        let mut last_shown: Option<usize> = None;

        for (index, (line, kind)) in diff.iter().enumerate() {
            if !show[index] {
                flush_side_buffers(&mut rows, &mut old_buffer, &mut new_buffer, self.max_char_diff);
                continue;
            }

            if let Some(last) = last_shown
                && index > last + 1
            {
                flush_side_buffers(&mut rows, &mut old_buffer, &mut new_buffer, self.max_char_diff);
                rows.push(SideRow::Separator);
            }
            last_shown = Some(index);

            match kind {
                LineKind::Unchanged => {
                    flush_side_buffers(&mut rows, &mut old_buffer, &mut new_buffer, self.max_char_diff);
                    rows.push(SideRow::Unchanged(line.clone()));
                }
                LineKind::Removed => old_buffer.push(line.clone()),
                LineKind::Added => new_buffer.push(line.clone()),
            }
        }
        flush_side_buffers(&mut rows, &mut old_buffer, &mut new_buffer, self.max_char_diff);

        let mut html = String::from(
            "<table class=\"diff-wrapper diff-side-by-side\">\
             <thead><tr><th class=\"line-num\">#</th><th>Before</th>\
             <th class=\"line-num\">#</th><th>After</th></tr></thead>\
             <tbody>",
        );

        let mut old_num = 0usize;
        let mut new_num = 0usize;

        for row in &rows {
            match row {
                SideRow::Separator => {
                    html.push_str(
                        "<tr class=\"separator\">\
                         <td colspan=\"4\" class=\"text-center text-muted\">...</td></tr>",
                    );
                }
                SideRow::Unchanged(line) => {
                    old_num += 1;
                    new_num += 1;
                    let escaped = html_escape(line);
                    html.push_str(&format!(
                        "<tr class=\"unchanged\"><td class=\"line-num\">{old_num}</td>\
                         <td>{escaped}</td><td class=\"line-num\">{new_num}</td>\
                         <td>{escaped}</td></tr>",
                    ));
                }
                SideRow::Changed {
                    old,
                    new,
                    old_html,
                    new_html,
                } => {
                    old_num += 1;
                    new_num += 1;

                    html.push_str("<tr class=\"changed\">");
                    html.push_str(&format!(
                        "<td class=\"line-num old\">{}</td>",
                        if old.is_some() { old_num.to_string() } else { String::new() },
                    ));
                    html.push_str(&format!("<td class=\"old\">{}</td>", match (old, old_html) {
                        (_, Some(marked)) => marked.clone(),
                        (Some(line), None) if line.is_empty() => {
                            "<del class=\"empty-line\">↵</del>".to_string()
                        }
                        (Some(line), None) => format!("<del>{}</del>", html_escape(line)),
                        (None, None) => String::new(),
                    }));
                    html.push_str(&format!(
                        "<td class=\"line-num new\">{}</td>",
                        if new.is_some() { new_num.to_string() } else { String::new() },
                    ));
                    html.push_str(&format!("<td class=\"new\">{}</td>", match (new, new_html) {
                        (_, Some(marked)) => marked.clone(),
                        (Some(line), None) if line.is_empty() => {
                            "<ins class=\"empty-line\">↵</ins>".to_string()
                        }
                        (Some(line), None) => format!("<ins>{}</ins>", html_escape(line)),
                        (None, None) => String::new(),
                    }));
                    html.push_str("</tr>");

                    // Counters only advance for the side that has a line.
                    if old.is_none() {
                        old_num -= 1;
                    }
                    if new.is_none() {
                        new_num -= 1;
                    }
                }
            }
        }

        html.push_str("</tbody></table>");
        html
    }

    /// Flags for which diff lines are displayed: every change plus
    /// `context_lines` of context around it.
    fn lines_to_show(&self, diff: &[(String, LineKind)]) -> Vec<bool> {
        let mut show = vec![false; diff.len()];

        for (index, (_, kind)) in diff.iter().enumerate() {
            if *kind == LineKind::Unchanged {
                continue;
            }
            let start = index.saturating_sub(self.context_lines);
            let end = (index + self.context_lines).min(diff.len().saturating_sub(1));
            for flag in show.iter_mut().take(end + 1).skip(start) {
                *flag = true;
            }
        }

        show
    }
}

/// One row of the inline diff after removed/added pairing.
struct InlineItem {
    line: String,
    kind: LineKind,
    orig_index: usize,
    html: Option<String>,
}

/// A rendered row of the side-by-side diff.
enum SideRow {
    Separator,
    Unchanged(String),
    Changed {
        old: Option<String>,
        new: Option<String>,
        old_html: Option<String>,
        new_html: Option<String>,
    },
}

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Outer line diff: classify each line as unchanged, removed or added by
/// walking both line lists against their LCS. Within a hunk, removed lines
/// come before added lines.
fn diff_lines(old: &str, new: &str) -> Vec<(String, LineKind)> {
    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();
    let lcs = longest_common_subsequence(&old_lines, &new_lines);

    let mut result = Vec::new();
    let (mut i, mut j, mut k) = (0, 0, 0);

    while i < old_lines.len() || j < new_lines.len() {
        let old_matches = i < old_lines.len() && k < lcs.len() && old_lines[i] == lcs[k];
        let new_matches = j < new_lines.len() && k < lcs.len() && new_lines[j] == lcs[k];

        if old_matches && new_matches {
            result.push((old_lines[i].to_string(), LineKind::Unchanged));
            i += 1;
            j += 1;
            k += 1;
        } else if i < old_lines.len() && !old_matches {
            result.push((old_lines[i].to_string(), LineKind::Removed));
            i += 1;
        } else {
            result.push((new_lines[j].to_string(), LineKind::Added));
            j += 1;
        }
    }

    result
}

/// Pair each removed line with the next added line and compute an
/// intra-line character diff for the pair; unpaired lines pass through.
fn group_changes_for_char_diff(
    diff: &[(String, LineKind)],
    max_char_diff: usize,
) -> Vec<InlineItem> {
    let mut result = Vec::new();
    let mut removed_buffer: std::collections::VecDeque<(String, usize)> =
        std::collections::VecDeque::new();

    let flush =
        |result: &mut Vec<InlineItem>, buffer: &mut std::collections::VecDeque<(String, usize)>| {
            for (line, orig_index) in buffer.drain(..) {
                result.push(InlineItem {
                    line,
                    kind: LineKind::Removed,
                    orig_index,
                    html: None,
                });
            }
        };

    for (index, (line, kind)) in diff.iter().enumerate() {
        match kind {
            LineKind::Removed => {
                removed_buffer.push_back((line.clone(), index));
            }
            LineKind::Added if !removed_buffer.is_empty() => {
                let (removed_line, removed_index) =
                    removed_buffer.pop_front().expect("buffer checked non-empty");
                let (old_html, new_html) = compute_char_diff(&removed_line, line, max_char_diff);

                result.push(InlineItem {
                    line: removed_line,
                    kind: LineKind::Removed,
                    orig_index: removed_index,
                    html: Some(old_html),
                });
                result.push(InlineItem {
                    line: line.clone(),
                    kind: LineKind::Added,
                    orig_index: index,
                    html: Some(new_html),
                });
            }
            _ => {
                flush(&mut result, &mut removed_buffer);
                result.push(InlineItem {
                    line: line.clone(),
                    kind: *kind,
                    orig_index: index,
                    html: None,
                });
            }
        }
    }
    flush(&mut result, &mut removed_buffer);

    result
}

/// Pair removed/added buffers into side-by-side rows, with character
/// diffs for rows that have both sides.
fn flush_side_buffers(
    rows: &mut Vec<SideRow>,
    old_buffer: &mut Vec<String>,
    new_buffer: &mut Vec<String>,
    max_char_diff: usize,
) {
    let max_len = old_buffer.len().max(new_buffer.len());
    for i in 0..max_len {
        let old_line = old_buffer.get(i).cloned();
        let new_line = new_buffer.get(i).cloned();

        let (old_html, new_html) = match (&old_line, &new_line) {
            (Some(old), Some(new)) => {
                let (o, n) = compute_char_diff(old, new, max_char_diff);
                (Some(o), Some(n))
            }
            _ => (None, None),
        };

        rows.push(SideRow::Changed {
            old: old_line,
            new: new_line,
            old_html,
            new_html,
        });
    }
    old_buffer.clear();
    new_buffer.clear();
}

/// Character-level diff of a removed/added line pair. Long lines fall back
/// to whole-line highlighting instead of paying the quadratic LCS cost.
fn compute_char_diff(old_line: &str, new_line: &str, max_char_diff: usize) -> (String, String) {
    let old_chars: Vec<char> = old_line.chars().collect();
    let new_chars: Vec<char> = new_line.chars().collect();

    if old_chars.len() > max_char_diff || new_chars.len() > max_char_diff {
        return (
            format!("<del>{}</del>", html_escape(old_line)),
            format!("<ins>{}</ins>", html_escape(new_line)),
        );
    }

    let lcs = longest_common_subsequence(&old_chars, &new_chars);

    (
        build_char_diff_html(&old_chars, &lcs, "del"),
        build_char_diff_html(&new_chars, &lcs, "ins"),
    )
}

/// Wrap runs of characters outside the LCS in the given tag.
fn build_char_diff_html(chars: &[char], lcs: &[char], tag: &str) -> String {
    let mut html = String::new();
    let mut lcs_index = 0;
    let mut in_tag = false;

    for &ch in chars {
        let in_lcs = lcs_index < lcs.len() && lcs[lcs_index] == ch;

        if in_lcs {
            if in_tag {
                html.push_str(&format!("</{tag}>"));
                in_tag = false;
            }
            html.push_str(&escape_char(ch));
            lcs_index += 1;
        } else {
            if !in_tag {
                html.push_str(&format!("<{tag}>"));
                in_tag = true;
            }
            html.push_str(&escape_char(ch));
        }
    }

    if in_tag {
        html.push_str(&format!("</{tag}>"));
    }

    html
}

/// Classic O(m*n) dynamic-programming LCS with backtracking.
fn longest_common_subsequence<T: PartialEq + Clone>(a: &[T], b: &[T]) -> Vec<T> {
    let (m, n) = (a.len(), b.len());
    let mut dp = vec![vec![0u32; n + 1]; m + 1];

    for i in 1..=m {
        for j in 1..=n {
            dp[i][j] = if a[i - 1] == b[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }

    let mut lcs = Vec::new();
    let (mut i, mut j) = (m, n);
    while i > 0 && j > 0 {
        if a[i - 1] == b[j - 1] {
            lcs.push(a[i - 1].clone());
            i -= 1;
            j -= 1;
        } else if dp[i - 1][j] > dp[i][j - 1] {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    lcs.reverse();
    lcs
}

/// Escape text for embedding in HTML.
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        out.push_str(&escape_char(ch));
    }
    out
}

fn escape_char(ch: char) -> String {
    match ch {
        '&' => "&amp;".to_string(),
        '<' => "&lt;".to_string(),
        '>' => "&gt;".to_string(),
        '"' => "&quot;".to_string(),
        '\'' => "&#039;".to_string(),
        other => other.to_string(),
    }
}
