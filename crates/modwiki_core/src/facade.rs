use std::sync::Arc;

use serde::Serialize;

use crate::capability::Capabilities;
use crate::config::Settings;
use crate::paths::ResolvedPaths;
use crate::render::{Notice, Render, ShareOutcome, render_entry, render_listing, render_share};
use crate::repository::EntryRepository;

pub const USE_PERMISSION: &str = "modwiki.use";
pub const RELOAD_PERMISSION: &str = "modwiki.reload";
pub const SHARE_PERMISSION: &str = "modwiki.share";

/// A command the hosting framework registers, with its gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub permission: &'static str,
    pub description: &'static str,
}

impl CommandSpec {
    /// `CommandDenied` when the requester lacks this command's permission.
    pub fn denial<R>(&self, requester: &R) -> Option<Notice>
    where
        R: Capabilities + ?Sized,
    {
        (!requester.has(self.permission)).then(|| Notice::CommandDenied {
            permission: self.permission.to_string(),
        })
    }
}

pub const COMMAND_SURFACE: &[CommandSpec] = &[
    CommandSpec {
        name: "wiki",
        usage: "wiki [entry]",
        permission: USE_PERMISSION,
        description: "List wiki entries or open one by id",
    },
    CommandSpec {
        name: "wikireload",
        usage: "wikireload",
        permission: RELOAD_PERMISSION,
        description: "Reload wiki.conf and entries.conf",
    },
    CommandSpec {
        name: "wikishare",
        usage: "wikishare <entry> <player>",
        permission: SHARE_PERMISSION,
        description: "Send a wiki entry to another player",
    },
];

pub fn command_surface() -> &'static [CommandSpec] {
    COMMAND_SURFACE
}

pub fn command_spec(name: &str) -> Option<&'static CommandSpec> {
    COMMAND_SURFACE.iter().find(|spec| spec.name == name)
}

/// Load both documents from scratch and report the outcome as a reload notice.
/// Nothing is loaded yet on failure, so the notice uses default settings.
pub fn reload_documents(paths: ResolvedPaths) -> (Option<CommandFacade>, Render) {
    match EntryRepository::open(paths) {
        Ok(repository) => {
            let render = Render::notice(repository.snapshot().settings(), Notice::Reloaded);
            (Some(CommandFacade::new(Arc::new(repository))), render)
        }
        Err(error) => {
            log::error!("failed to reload wiki: {error:#}");
            let render = Render::notice(&Settings::default().normalized(), Notice::ReloadFailed);
            (None, render)
        }
    }
}

/// Entry points handed to the command router.
#[derive(Debug, Clone)]
pub struct CommandFacade {
    repository: Arc<EntryRepository>,
}

impl CommandFacade {
    pub fn new(repository: Arc<EntryRepository>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<EntryRepository> {
        &self.repository
    }

    pub fn view<R>(&self, requester: &R, id: Option<&str>) -> Render
    where
        R: Capabilities + ?Sized,
    {
        let snapshot = self.repository.snapshot();
        match id {
            Some(id) => render_entry(&snapshot, requester, id),
            None => render_listing(&snapshot, requester),
        }
    }

    pub fn reload(&self) -> Render {
        let notice = match self.repository.reload() {
            Ok(_) => Notice::Reloaded,
            Err(error) => {
                log::error!("failed to reload wiki: {error:#}");
                Notice::ReloadFailed
            }
        };
        Render::notice(self.repository.snapshot().settings(), notice)
    }

    pub fn share(&self, id: &str, recipient: &str, sharer: &str) -> ShareOutcome {
        render_share(&self.repository.snapshot(), id, sharer, recipient)
    }
}
