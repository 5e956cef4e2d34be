use std::fmt;

use serde::Serialize;

use crate::capability::Capabilities;
use crate::config::{Entry, Settings};
use crate::link::{BodyLine, parse_line};
use crate::repository::Snapshot;
use crate::text::{ClickAction, Line, Message, Span};

pub const LINES_PER_PAGE: usize = 10;
pub const BORDER_REPEAT: usize = 12;
pub const VIEW_COMMAND: &str = "/modwiki:wiki";
pub const SHARE_COMMAND: &str = "/modwiki:wikishare";

const BODY_COLOR: &str = "&f";
const MUTED_COLOR: &str = "&7";

/// Negative or informational results shown to the requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    NotFound { id: String },
    PermissionDenied { permission: String },
    EmptyRepository,
    Reloaded,
    ReloadFailed,
    PageOutOfRange { page: usize, pages: usize },
    CommandDenied { permission: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => {
                write!(f, "No wiki entries were found for requested value '{id}'")
            }
            Self::PermissionDenied { permission } => {
                write!(f, "You do not have permission to view this wiki '{permission}'")
            }
            Self::EmptyRepository => f.write_str("No wiki entries were found"),
            Self::Reloaded => f.write_str("Successfully reloaded wiki"),
            Self::ReloadFailed => {
                f.write_str("Failed to reload wiki, see console for more information")
            }
            Self::PageOutOfRange { page, pages } => {
                write!(f, "Page {page} does not exist, the wiki has {pages} page(s)")
            }
            Self::CommandDenied { permission } => {
                write!(f, "You do not have permission to use this command '{permission}'")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Render {
    Entry { message: Message },
    Listing { list: PaginatedList },
    Notice { notice: Notice, message: Message },
}

impl Render {
    pub fn notice(settings: &Settings, notice: Notice) -> Self {
        let message = render_notice(settings, &notice);
        Self::Notice { notice, message }
    }

    pub fn as_notice(&self) -> Option<&Notice> {
        match self {
            Self::Notice { notice, .. } => Some(notice),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ShareOutcome {
    /// Message for the recipient.
    Delivered { recipient: String, message: Message },
    /// Message back to the sharer.
    Rejected { notice: Notice, message: Message },
}

/// Summary lines grouped into fixed-size pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginatedList {
    pub title: String,
    pub padding: String,
    lines_per_page: usize,
    pub lines: Vec<Line>,
}

/// One page of a listing, with its position for JSON consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingPage<'a> {
    pub title: &'a str,
    pub page: usize,
    pub pages: usize,
    pub lines: &'a [Line],
}

impl PaginatedList {
    /// A page size of zero is raised to one.
    pub fn new(
        title: impl Into<String>,
        padding: impl Into<String>,
        lines_per_page: usize,
        lines: Vec<Line>,
    ) -> Self {
        Self {
            title: title.into(),
            padding: padding.into(),
            lines_per_page: lines_per_page.max(1),
            lines,
        }
    }

    pub fn lines_per_page(&self) -> usize {
        self.lines_per_page
    }

    pub fn page_count(&self) -> usize {
        self.lines.len().div_ceil(self.lines_per_page).max(1)
    }

    /// 1-based page slice; page 1 of an empty list is empty.
    pub fn page_lines(&self, page: usize) -> Option<&[Line]> {
        if page == 0 || page > self.page_count() {
            return None;
        }
        let start = (page - 1) * self.lines_per_page;
        let end = (start + self.lines_per_page).min(self.lines.len());
        Some(&self.lines[start..end])
    }

    pub fn page(&self, page: usize) -> Result<ListingPage<'_>, Notice> {
        let pages = self.page_count();
        let lines = self
            .page_lines(page)
            .ok_or(Notice::PageOutOfRange { page, pages })?;
        Ok(ListingPage {
            title: &self.title,
            page,
            pages,
            lines,
        })
    }

    pub fn render_page(&self, page: usize) -> Result<Message, Notice> {
        let listing = self.page(page)?;
        let border = border(&self.padding);
        let mut message = Message::default();
        message.push(Span::new(format!("{border} {} {border}", listing.title)));
        for line in listing.lines {
            message.push(line.clone());
        }
        message.push(Span::new(format!(
            "{border} {MUTED_COLOR}Page {page}/{} {border}",
            listing.pages
        )));
        Ok(message)
    }
}

pub fn border(padding: &str) -> String {
    padding.repeat(BORDER_REPEAT)
}

pub fn banner(settings: &Settings, title: &str) -> Line {
    let border = border(&settings.padding);
    Span::new(format!(
        "{border}{} {title} {border}",
        settings.primary_color
    ))
    .into()
}

pub fn render_notice(settings: &Settings, notice: &Notice) -> Message {
    Line::from(Span::new(format!("{}{notice}", settings.prefix))).into()
}

pub fn view_command(id: &str) -> String {
    format!("{VIEW_COMMAND} {id}")
}

pub fn share_command(id: &str) -> String {
    format!("{SHARE_COMMAND} {id}")
}

pub fn render_body_line(settings: &Settings, line: &str) -> Line {
    match parse_line(line) {
        BodyLine::Plain { text } => Span::new(format!("{BODY_COLOR}{text}")).into(),
        BodyLine::Link { target, display } => Span::new(format!("{BODY_COLOR}{display}"))
            .on_click(ClickAction::RunCommand(view_command(target)))
            .on_hover(format!("{}Open entry '{target}'", settings.primary_color))
            .into(),
    }
}

fn render_share_button(settings: &Settings, entry: &Entry) -> Line {
    let Settings {
        primary_color,
        secondary_color,
        ..
    } = settings;
    Span::new(format!(
        "{secondary_color}[{primary_color}Share '{}'{secondary_color}]",
        entry.name
    ))
    .on_click(ClickAction::SuggestCommand(share_command(&entry.id)))
    .on_hover(format!("{primary_color}Share wiki with another player"))
    .into()
}

/// Full page for one entry: banner, body, optional share button, banner.
pub fn render_entry_body(settings: &Settings, entry: &Entry) -> Message {
    let mut message = Message::default();
    message.push(banner(settings, &entry.name));
    for line in &entry.description {
        message.push(render_body_line(settings, line));
    }
    if entry.share {
        message.push(Line::default());
        message.push(render_share_button(settings, entry));
    }
    message.push(banner(settings, &entry.name));
    message
}

pub fn render_entry<R>(snapshot: &Snapshot, requester: &R, id: &str) -> Render
where
    R: Capabilities + ?Sized,
{
    let settings = snapshot.settings();
    let Some(entry) = snapshot.get(id) else {
        return Render::notice(settings, Notice::NotFound { id: id.to_string() });
    };
    if !entry.is_viewable_by(requester) {
        let permission = entry.permission.clone().unwrap_or_default();
        return Render::notice(settings, Notice::PermissionDenied { permission });
    }
    Render::Entry {
        message: render_entry_body(settings, entry),
    }
}

fn render_listing_line(settings: &Settings, entry: &Entry) -> Line {
    let Settings {
        primary_color,
        secondary_color,
        ..
    } = settings;
    Span::new(format!(
        " {MUTED_COLOR}- {primary_color}{}{secondary_color} [View]",
        entry.name
    ))
    .on_click(ClickAction::RunCommand(view_command(&entry.id)))
    .on_hover(format!("{primary_color}More information about {}", entry.name))
    .into()
}

pub fn render_listing<R>(snapshot: &Snapshot, requester: &R) -> Render
where
    R: Capabilities + ?Sized,
{
    let settings = snapshot.settings();
    if snapshot.is_empty() {
        return Render::notice(settings, Notice::EmptyRepository);
    }
    let lines = snapshot
        .list_visible(requester)
        .map(|entry| render_listing_line(settings, entry))
        .collect();
    Render::Listing {
        list: PaginatedList::new(
            settings.default_title.as_str(),
            settings.padding.as_str(),
            LINES_PER_PAGE,
            lines,
        ),
    }
}

/// The recipient's own permission is only checked when they open the entry.
pub fn render_share(snapshot: &Snapshot, id: &str, sharer: &str, recipient: &str) -> ShareOutcome {
    let settings = snapshot.settings();
    let Some(entry) = snapshot.get(id) else {
        let notice = Notice::NotFound { id: id.to_string() };
        let message = render_notice(settings, &notice);
        return ShareOutcome::Rejected { notice, message };
    };

    let Settings {
        primary_color,
        secondary_color,
        ..
    } = settings;
    let announcement = Span::new(format!(
        "{MUTED_COLOR}[] {secondary_color}{sharer}{primary_color} shared the '{}' wiki with you ",
        entry.name
    ));
    let view_button = Span::new(format!(
        "{secondary_color}[{primary_color}View{secondary_color}]"
    ))
    .on_click(ClickAction::RunCommand(view_command(&entry.id)))
    .on_hover(format!("{primary_color}View entry '{}'", entry.id));

    ShareOutcome::Delivered {
        recipient: recipient.to_string(),
        message: Line::new(vec![announcement, view_button]).into(),
    }
}
