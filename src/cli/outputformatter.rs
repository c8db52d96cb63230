use chrono::{DateTime, Local, NaiveDateTime};
use terminal_size::{Width, Height, terminal_size};

use crate::api::{Exam, Fee, LoginRecord};
use crate::dashboard::Dashboard;
use crate::error::ResourceError;
use crate::view::{AdminElement, DetailSection, DetailView, Notice, NoticeLevel, Presentation};

// Render the roster as an ASCII table. The actions column only appears while the
// presentation shows it, and each row's actions follow that row's own visibility.
pub fn render_roster(dashboard: &Dashboard, view: &Presentation, termw: usize) -> String {
    let mut out = Vec::new();
    let mut summary = format!("Total students: {}", dashboard.total_students());
    if view.is_visible(AdminElement::TotalLoginsCard) {
        match dashboard.total_logins() {
            Some(n) if dashboard.logins_stale() => summary.push_str(&format!("   Total logins: {} (stale)", n)),
            Some(n) => summary.push_str(&format!("   Total logins: {}", n)),
            None => summary.push_str("   Total logins: -"),
        }
    }
    out.push(summary);
    if !dashboard.filter().is_empty() {
        out.push(format!("filter: \"{}\"", dashboard.filter()));
    }

    let rows = dashboard.visible();
    if rows.is_empty() {
        out.push("No students found.".to_string());
        return out.join("\n");
    }
    let with_actions = view.is_visible(AdminElement::ActionsColumn);
    let mut cols = vec!["ID".to_string(), "Name".to_string(), "Email".to_string()];
    if with_actions { cols.push("Actions".to_string()); }
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|s| {
            let mut r = vec![s.id.to_string(), s.name.clone(), s.email.clone()];
            if with_actions {
                let a = if view.is_visible(AdminElement::RowActions(s.id)) { "edit | delete" } else { "" };
                r.push(a.to_string());
            }
            r
        })
        .collect();
    out.extend(render_table(&cols, &cells, termw));
    out.join("\n")
}

pub fn render_detail(detail: &DetailView, termw: usize) -> String {
    let mut out = vec![format!("{} <{}>", detail.student.name, detail.student.email)];
    match &detail.exams {
        DetailSection::NotRequested => {}
        DetailSection::Failed(e) => out.push(section_failure("exams", e)),
        DetailSection::Loaded(v) if v.is_empty() => out.push("Exams: No exams.".to_string()),
        DetailSection::Loaded(v) => {
            out.push("Exams:".to_string());
            out.extend(render_table(&strings(&["Semester", "Subject", "Marks", "Date"]), &exam_rows(v), termw));
        }
    }
    match &detail.fees {
        DetailSection::NotRequested => {}
        DetailSection::Failed(e) => out.push(section_failure("fees", e)),
        DetailSection::Loaded(v) if v.is_empty() => out.push("Fees: No fee records.".to_string()),
        DetailSection::Loaded(v) => {
            out.push("Fees:".to_string());
            out.extend(render_table(&strings(&["Term", "Amount", "Status", "Due"]), &fee_rows(v), termw));
        }
    }
    out.join("\n")
}

fn section_failure(what: &str, e: &ResourceError) -> String {
    match e.status() {
        Some(status) => format!("Failed to load {} ({}).", what, status),
        None => format!("Failed to load {}.", what),
    }
}

fn exam_rows(exams: &[Exam]) -> Vec<Vec<String>> {
    exams
        .iter()
        .map(|e| {
            vec![
                e.semester.clone().unwrap_or_default(),
                e.subject.clone(),
                format!("{}/{}", e.marks_obtained, e.max_marks),
                e.exam_date.clone().unwrap_or_default(),
            ]
        })
        .collect()
}

fn fee_rows(fees: &[Fee]) -> Vec<Vec<String>> {
    fees.iter()
        .map(|f| {
            vec![
                f.term.clone(),
                format!("{:.2}", f.amount),
                if f.paid { "Paid" } else { "Pending" }.to_string(),
                f.due_date.clone().unwrap_or_default(),
            ]
        })
        .collect()
}

pub fn render_login_history(records: &[LoginRecord], termw: usize) -> String {
    if records.is_empty() {
        return "No logins recorded yet.".to_string();
    }
    let rows: Vec<Vec<String>> =
        records.iter().map(|r| vec![r.username.clone(), format_login_time(&r.login_time)]).collect();
    let mut out = render_table(&strings(&["User", "Login time"]), &rows, termw);
    out.push(format!("logins: {}", records.len()));
    out.join("\n")
}

/// Local time when the server value parses, the raw text otherwise.
pub fn format_login_time(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    raw.to_string()
}

pub fn render_notice(n: &Notice) -> String {
    let (color, label) = match n.level {
        NoticeLevel::Success => ("32", "ok"),
        NoticeLevel::Info => ("36", "info"),
        NoticeLevel::Warning => ("33", "warning"),
        NoticeLevel::Danger => ("31", "error"),
    };
    format!("\x1b[{}m[{}]\x1b[0m {}", color, label, n.message)
}

fn strings(v: &[&str]) -> Vec<String> { v.iter().map(|s| s.to_string()).collect() }

// --- table building ---

pub fn render_table(cols: &[String], rows: &[Vec<String>], termw: usize) -> Vec<String> {
    let mut widths: Vec<usize> = cols.iter().map(|s| visible_len(s).min(termw)).collect();
    for r in rows {
        for (i, cell) in r.iter().enumerate().take(cols.len()) {
            let w = visible_len(cell);
            if w > widths[i] { widths[i] = w.min(termw); }
        }
    }
    let sep = build_separator(&widths);
    let mut out = Vec::with_capacity(rows.len() + 4);
    out.push(fit_line_to_width(&sep, termw));
    out.push(fit_line_to_width(&build_row_header_colored(cols, &widths), termw));
    out.push(fit_line_to_width(&sep, termw));
    for r in rows {
        out.push(fit_line_to_width(&build_row(r, &widths), termw));
    }
    out.push(fit_line_to_width(&sep, termw));
    out
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('+');
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).cloned().unwrap_or_default();
        let (text, align_right) = (truncate(&cell, *w), is_numeric_like(&cell));
        let pad = w.saturating_sub(visible_len(&text));
        s.push(' ');
        if align_right {
            s.push_str(&" ".repeat(pad));
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&" ".repeat(pad));
        }
        s.push_str(" |");
    }
    s
}

// Header cells in green; padding follows the visible width.
fn build_row_header_colored(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).cloned().unwrap_or_default();
        let text = truncate(&cell, *w);
        s.push(' ');
        s.push_str(&format!("\x1b[32m{}\x1b[0m", text));
        s.push_str(&" ".repeat(w.saturating_sub(visible_len(&text))));
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    if st.is_empty() { return false; }
    let mut has_digit = false;
    for ch in st.chars() {
        if ch.is_ascii_digit() { has_digit = true; continue; }
        if ".-+/,_".contains(ch) { continue; }
        return false;
    }
    has_digit
}

// --- terminal fitting & ANSI helpers ---

pub fn get_terminal_width() -> usize {
    if let Some((Width(w), Height(_h))) = terminal_size() {
        return (w as usize).saturating_sub(4).max(20);
    }
    80
}

fn fit_line_to_width(s: &str, maxw: usize) -> String {
    if visible_len(s) <= maxw { return s.to_string(); }
    let mut out = String::new();
    let mut seen = 0usize;
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            // copy escape sequences through untouched
            out.push(ch);
            if chars.peek() == Some(&'[') {
                for c in chars.by_ref() {
                    out.push(c);
                    if c.is_ascii_alphabetic() { break; }
                }
            }
            continue;
        }
        if seen + 1 >= maxw {
            out.push('…');
            break;
        }
        out.push(ch);
        seen += 1;
    }
    // reset color in case an escape was cut short
    out.push_str("\x1b[0m");
    out
}

fn visible_len(s: &str) -> usize {
    let mut count = 0;
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            if chars.peek() == Some(&'[') {
                for c in chars.by_ref() {
                    if c.is_ascii_alphabetic() { break; }
                }
            }
            continue;
        }
        count += 1;
    }
    count
}
