//! Entry snapshot with atomic publication.
//!
//! Readers pin an `Arc<Snapshot>` for the duration of a render. `reload` builds
//! a complete replacement off to the side and publishes it with one pointer
//! swap; a failed load never touches the published snapshot. Reloads are
//! serialized by `reload_lock`.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::capability::Capabilities;
use crate::config::{BootstrapReport, Entry, Settings, load_or_bootstrap, validate_entries};
use crate::paths::ResolvedPaths;

/// Immutable settings and entries in load order, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    settings: Settings,
    entries: Vec<Entry>,
    by_id: HashMap<String, usize>,
}

impl Snapshot {
    /// Rejects empty or duplicate ids so `get` and the listing agree.
    pub fn new(settings: Settings, entries: Vec<Entry>) -> Result<Self> {
        validate_entries(&entries)?;
        let by_id = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.id.clone(), position))
            .collect();
        Ok(Self {
            settings: settings.normalized(),
            entries,
            by_id,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.by_id.get(id).map(|&position| &self.entries[position])
    }

    pub fn list_visible<'a, R>(&'a self, requester: &'a R) -> impl Iterator<Item = &'a Entry>
    where
        R: Capabilities + ?Sized,
    {
        self.entries
            .iter()
            .filter(move |entry| entry.is_listable_by(requester))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadReport {
    pub entries: usize,
    pub bootstrap: BootstrapReport,
}

#[derive(Debug)]
pub struct EntryRepository {
    paths: ResolvedPaths,
    current: ArcSwap<Snapshot>,
    reload_lock: Mutex<()>,
}

impl EntryRepository {
    /// Initial load, bootstrapping missing documents.
    pub fn open(paths: ResolvedPaths) -> Result<Self> {
        let loaded = load_or_bootstrap(&paths)?;
        log::info!(
            "loaded {} wiki entries from {}",
            loaded.entries.len(),
            paths.entries_path.display()
        );
        let snapshot = Snapshot::new(loaded.settings, loaded.entries)?;
        Ok(Self::with_snapshot(paths, snapshot))
    }

    pub fn with_snapshot(paths: ResolvedPaths, snapshot: Snapshot) -> Self {
        Self {
            paths,
            current: ArcSwap::from_pointee(snapshot),
            reload_lock: Mutex::new(()),
        }
    }

    pub fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Re-read both documents and publish them together. On error the previous
    /// snapshot stays in place.
    pub fn reload(&self) -> Result<ReloadReport> {
        let _guard = self.reload_lock.lock();
        let loaded = load_or_bootstrap(&self.paths)?;
        let report = ReloadReport {
            entries: loaded.entries.len(),
            bootstrap: loaded.bootstrap,
        };
        let snapshot = Snapshot::new(loaded.settings, loaded.entries)?;
        self.current.store(Arc::new(snapshot));
        log::info!("reloaded {} wiki entries", report.entries);
        Ok(report)
    }

    pub fn get(&self, id: &str) -> Option<Entry> {
        self.current.load().get(id).cloned()
    }

    pub fn list_visible<R>(&self, requester: &R) -> Vec<Entry>
    where
        R: Capabilities + ?Sized,
    {
        self.current
            .load()
            .list_visible(requester)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use tempfile::tempdir;

    use super::{EntryRepository, Snapshot};
    use crate::capability::PermissionSet;
    use crate::config::{Entry, Settings};
    use crate::paths::{ResolvedPaths, ValueSource};

    fn entry(id: &str, permission: Option<&str>, hide: bool) -> Entry {
        Entry {
            id: id.to_string(),
            name: id.to_uppercase(),
            permission: permission.map(str::to_string),
            description: Vec::new(),
            hide,
            share: true,
        }
    }

    #[test]
    fn snapshot_indexes_by_id_and_normalizes_colors() {
        let snapshot = Snapshot::new(
            Settings::default(),
            vec![entry("a", None, false), entry("b", Some("admin"), true)],
        )
        .expect("snapshot");
        assert_eq!(snapshot.get("b").map(|entry| entry.name.as_str()), Some("B"));
        assert!(snapshot.get("c").is_none());
        assert_eq!(snapshot.settings().primary_color, "&b");
        assert_eq!(snapshot.settings().secondary_color, "&3");
    }

    #[test]
    fn list_visible_keeps_load_order_and_filters() {
        let snapshot = Snapshot::new(
            Settings::default(),
            vec![
                entry("z", None, false),
                entry("hidden", None, true),
                entry("staff", Some("staff"), false),
                entry("a", None, false),
            ],
        )
        .expect("snapshot");
        let guest = PermissionSet::default();
        let ids: Vec<_> = snapshot
            .list_visible(&guest)
            .map(|entry| entry.id.as_str())
            .collect();
        assert_eq!(ids, vec!["z", "a"]);

        let staff = PermissionSet::new(["staff"]);
        let ids: Vec<_> = snapshot
            .list_visible(&staff)
            .map(|entry| entry.id.as_str())
            .collect();
        assert_eq!(ids, vec!["z", "staff", "a"]);
    }

    #[test]
    fn open_bootstraps_and_serves_lookups() {
        let temp = tempdir().expect("tempdir");
        let paths = ResolvedPaths::in_dir(temp.path().join("wiki"), ValueSource::Flag);

        let repository = EntryRepository::open(paths).expect("open");
        assert!(repository.get("some_wiki").is_some());
        assert!(repository.get("missing").is_none());

        let admin = PermissionSet::new(["wiki.admin"]);
        let listed = repository.list_visible(&admin);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "some_wiki");
    }

    #[test]
    fn failed_reload_keeps_previous_snapshot() {
        let temp = tempdir().expect("tempdir");
        let paths = ResolvedPaths::in_dir(temp.path().join("wiki"), ValueSource::Flag);
        let repository = EntryRepository::open(paths.clone()).expect("open");
        let before = repository.snapshot();

        fs::write(&paths.entries_path, "[{\"id\": \"broken\"").expect("corrupt entries");
        let error = repository.reload().expect_err("reload must fail");
        assert!(error.to_string().contains("failed to parse"));

        let after = repository.snapshot();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.entries().len(), 2);
    }

    #[test]
    fn corrupt_settings_keep_previous_settings_and_entries() {
        let temp = tempdir().expect("tempdir");
        let paths = ResolvedPaths::in_dir(temp.path().join("wiki"), ValueSource::Flag);
        let repository = EntryRepository::open(paths.clone()).expect("open");
        let before = repository.snapshot();

        fs::write(&paths.settings_path, r#"{"padding": "-", "default_title": "#)
            .expect("corrupt settings");
        let error = repository.reload().expect_err("reload must fail");
        assert!(format!("{error:#}").contains("wiki.conf"));

        let after = repository.snapshot();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.settings().default_title, "&bWiki");
        assert_eq!(after.settings().padding, "&3=");
        assert!(after.get("some_wiki").is_some());
    }

    #[test]
    fn successful_reload_replaces_everything() {
        let temp = tempdir().expect("tempdir");
        let paths = ResolvedPaths::in_dir(temp.path().join("wiki"), ValueSource::Flag);
        let repository = EntryRepository::open(paths.clone()).expect("open");
        let pinned = repository.snapshot();

        fs::write(
            &paths.entries_path,
            r#"[{"id": "rules", "name": "Rules", "permission": null, "description": []}]"#,
        )
        .expect("write entries");
        fs::write(
            &paths.settings_path,
            r#"{"padding": "-", "default_title": "Help", "prefix": "> ", "primary_color": "&a", "secondary_color": "e"}"#,
        )
        .expect("write settings");

        let report = repository.reload().expect("reload");
        assert_eq!(report.entries, 1);
        assert!(!report.bootstrap.wrote_entries);

        let current = repository.snapshot();
        assert!(current.get("some_wiki").is_none());
        assert!(current.get("rules").is_some());
        assert_eq!(current.settings().default_title, "Help");
        assert_eq!(current.settings().secondary_color, "&e");

        // Readers holding the old snapshot keep a consistent view.
        assert!(pinned.get("some_wiki").is_some());
        assert!(pinned.get("rules").is_none());
    }

    #[test]
    fn concurrent_readers_never_see_a_mixed_snapshot() {
        let temp = tempdir().expect("tempdir");
        let paths = ResolvedPaths::in_dir(temp.path().join("wiki"), ValueSource::Flag);
        let write_version = |title: &str, id: &str| {
            fs::write(
                &paths.settings_path,
                format!(
                    r#"{{"padding": "=", "default_title": "{title}", "prefix": "", "primary_color": "b", "secondary_color": "3"}}"#
                ),
            )
            .expect("write settings");
            fs::write(
                &paths.entries_path,
                format!(r#"[{{"id": "{id}", "name": "{title}"}}]"#),
            )
            .expect("write entries");
        };
        fs::create_dir_all(&paths.config_dir).expect("create dir");
        write_version("One", "one");
        let repository = EntryRepository::open(paths.clone()).expect("open");

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let snapshot = repository.snapshot();
                        let title = snapshot.settings().default_title.as_str();
                        let id = if title == "One" { "one" } else { "two" };
                        assert!(snapshot.get(id).is_some(), "torn snapshot for {title}");
                        assert_eq!(snapshot.entries().len(), 1);
                    }
                });
            }
            for round in 0..20 {
                if round % 2 == 0 {
                    write_version("Two", "two");
                } else {
                    write_version("One", "one");
                }
                repository.reload().expect("reload");
            }
        });
    }

    #[test]
    fn reload_recreates_deleted_documents() {
        let temp = tempdir().expect("tempdir");
        let paths = ResolvedPaths::in_dir(temp.path().join("wiki"), ValueSource::Flag);
        let repository = EntryRepository::open(paths.clone()).expect("open");

        fs::remove_file(&paths.settings_path).expect("remove settings");
        let report = repository.reload().expect("reload");
        assert!(report.bootstrap.wrote_settings);
        assert!(paths.settings_path.exists());
    }
}
