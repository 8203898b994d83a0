//! Terminal rendering for collection results and stored files.

use std::fmt::Write as _;

use pp_core::{
    collect::{comments::Commenter, members::Member},
    paginate::Page,
    platform::governor::RateLimitNotice,
    service::FileView,
    store::SavedFile,
    utils::truncate_text,
};

const COMMENT_PREVIEW_LEN: usize = 60;

pub const NO_MEMBERS: &str = "No users found matching the specified criteria.";

pub fn no_comments(limit: u32) -> String {
    format!(
        "No comments found in the last {limit} posts. Try increasing the number of posts to parse."
    )
}

pub fn rate_limit_notice(notice: &RateLimitNotice) -> String {
    format!(
        "Rate limited on {}: waiting {} seconds, resuming at {}",
        notice.operation,
        notice.retry_after.as_secs(),
        notice.resume_at.format("%H:%M:%S")
    )
}

fn display_name(
    username: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
    id: i64,
) -> String {
    let full = [first_name, last_name]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    match (username, full.is_empty()) {
        (Some(u), true) => format!("@{u}"),
        (Some(u), false) => format!("@{u} ({full})"),
        (None, false) => full,
        (None, true) => format!("id {id}"),
    }
}

fn page_header(kind: &str, current: usize, total_pages: usize, total_items: usize) -> String {
    format!("{kind}: {total_items} total, page {current}/{total_pages}")
}

fn page_footer(out: &mut String, current: usize, total_pages: usize) {
    if current < total_pages {
        let _ = writeln!(out, "Use --page {} for more.", current + 1);
    }
}

pub fn members_page(page: &Page<'_, Member>, page_size: usize) -> String {
    let mut out = page_header("Users", page.current_page, page.total_pages, page.total_items);
    out.push('\n');
    let offset = (page.current_page - 1) * page_size;
    for (i, m) in page.items.iter().enumerate() {
        let mut line = format!(
            "{}. {}",
            offset + i + 1,
            display_name(
                m.username.as_deref(),
                m.first_name.as_deref(),
                m.last_name.as_deref(),
                m.id.0
            )
        );
        if m.premium {
            line.push_str(" [premium]");
        }
        if let Some(phone) = m.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            let _ = write!(line, " phone: {phone}");
        }
        if let Some(seen) = &m.last_seen {
            let _ = write!(line, " last seen: {seen}");
        }
        let _ = writeln!(out, "{line}");
    }
    page_footer(&mut out, page.current_page, page.total_pages);
    out
}

pub fn commenters_page(page: &Page<'_, Commenter>, page_size: usize) -> String {
    let mut out = page_header(
        "Commenters",
        page.current_page,
        page.total_pages,
        page.total_items,
    );
    out.push('\n');
    let offset = (page.current_page - 1) * page_size;
    for (i, c) in page.items.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} {} comment(s), last {}",
            offset + i + 1,
            display_name(
                c.username.as_deref(),
                c.first_name.as_deref(),
                c.last_name.as_deref(),
                c.id.0
            ),
            c.comment_count,
            c.last_comment_date.format("%Y-%m-%d %H:%M"),
        );
        let _ = writeln!(
            out,
            "   first on post #{}: {}",
            c.first_comment.post_id.0,
            truncate_text(&c.first_comment.text, COMMENT_PREVIEW_LEN)
        );
    }
    page_footer(&mut out, page.current_page, page.total_pages);
    out
}

pub fn file_list(files: &[SavedFile]) -> String {
    if files.is_empty() {
        return "No saved files.".to_string();
    }
    let mut out = String::new();
    for f in files {
        let _ = writeln!(
            out,
            "#{} {} [{}] {} ({})",
            f.id,
            f.filename,
            f.file_type.as_str(),
            f.source_name,
            f.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    out
}

pub fn file_view(view: &FileView) -> String {
    let mut out = format!(
        "#{} {} from {}\n{}\n",
        view.file.id,
        view.file.filename,
        view.file.source_name,
        page_header("Records", view.current_page, view.total_pages, view.total_items)
    );
    for record in &view.records {
        let _ = writeln!(out, "{record}");
    }
    page_footer(&mut out, view.current_page, view.total_pages);
    out
}
