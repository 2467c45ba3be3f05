//! The git-backed record store.
//!
//! [`GitBridge`] owns the repository binding, the active working copy and
//! the in-memory list of loaded entries. Every write goes to disk through
//! the tree codec and is committed through the VCS session before the
//! in-memory list changes.
//!
//! The entry list sits behind a single mutex. Mutations take the lock,
//! change the list, release it, and only then notify subscribers, so a
//! subscriber may safely call back into the store.
//!
//! One store instance per working copy: git's index is not safe for
//! concurrent writers from several processes.

mod events;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

pub use events::{StoreEvent, SubscriptionId};

use crate::binding::{repository_name, validate_association, RepositoryBinding};
use crate::capture::{Provenance, DESCRIPTION_FIELD, WHO_FIELD};
use crate::config::Config;
use crate::error::{BridgeError, Result};
use crate::record::{write_record, Entries, Entry, Fingerprint, Record};
use crate::state::StateManager;
use crate::vcs::known_hosts::{ensure_host_keys, ssh_host};
use crate::vcs::{ConfigScope, Identity, VcsSession};
use events::Observers;

pub struct GitBridge {
    config: Config,
    binding: RepositoryBinding,
    state: StateManager,
    project: Option<String>,
    repo_uri: Option<String>,
    session: Option<VcsSession>,
    entries: Mutex<Vec<Entry>>,
    observers: Observers,
}

impl GitBridge {
    /// Open the store described by `config` and load the active project's
    /// records, if it has a working copy.
    pub fn open(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.base_dir).map_err(|e| BridgeError::io(&config.base_dir, e))?;

        let mut bridge = Self {
            binding: RepositoryBinding::load(&config.base_dir)?,
            state: StateManager::new(&config.base_dir),
            project: config.project.clone(),
            repo_uri: None,
            session: None,
            entries: Mutex::new(Vec::new()),
            observers: Observers::default(),
            config,
        };
        bridge.reload_project()?;
        Ok(bridge)
    }

    /// Re-read the association file, re-resolve the active working copy
    /// and reload its records.
    pub fn reload_project(&mut self) -> Result<usize> {
        self.binding = RepositoryBinding::load(&self.config.base_dir)?;
        self.repo_uri = None;
        self.session = None;

        if let Some(project) = &self.project {
            match self.binding.resolve(project) {
                Some(uri) => {
                    let uri = uri.to_string();
                    let path = self.working_copy_path(&uri)?;
                    if path.join(".git").exists() {
                        self.session = Some(VcsSession::new(&self.config.git_program, path));
                    } else {
                        warn!(
                            "Project {} is associated with {} but {} is not a working copy",
                            project,
                            uri,
                            path.display()
                        );
                    }
                    self.repo_uri = Some(uri);
                }
                None => debug!("Project {} has no associated repository", project),
            }
        }

        info!(
            "Loaded project {:?}, repository {:?}",
            self.project, self.repo_uri
        );
        self.reload()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn binding(&self) -> &RepositoryBinding {
        &self.binding
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn repository_uri(&self) -> Option<&str> {
        self.repo_uri.as_deref()
    }

    pub fn working_copy(&self) -> Option<&Path> {
        self.session.as_ref().map(VcsSession::workdir)
    }

    /// Local working-copy directory for `uri` under the base directory.
    pub fn working_copy_path(&self, uri: &str) -> Result<PathBuf> {
        Ok(self.config.base_dir.join(repository_name(uri)?))
    }

    fn session(&self) -> Result<&VcsSession> {
        self.session.as_ref().ok_or(BridgeError::NoActiveRepository)
    }

    /// Directory of a stored record. Symlinks are not records.
    fn record_dir(session: &VcsSession, fingerprint: &Fingerprint) -> Result<PathBuf> {
        let dir = session.workdir().join(fingerprint.as_str());
        match fs::symlink_metadata(&dir) {
            Ok(meta) if meta.is_dir() => Ok(dir),
            _ => Err(BridgeError::UnknownRecord(fingerprint.to_string())),
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        self.observers.subscribe(Arc::new(listener))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Associate `project` with `uri`, cloning the repository on first use.
    ///
    /// An existing working copy for the same repository name is reused.
    /// SSH host keys are scanned before a first clone over SSH.
    pub fn associate(
        &mut self,
        project: &str,
        uri: &str,
        identity: Option<(&Identity, ConfigScope)>,
    ) -> Result<()> {
        validate_association(project, uri)?;
        let name = repository_name(uri)?;
        let path = self.config.base_dir.join(&name);

        if path.join(".git").exists() {
            info!("Reusing working copy at {}", path.display());
        } else {
            if let Some(host) = ssh_host(uri) {
                ensure_host_keys(&host, &self.config.known_hosts)?;
            }
            VcsSession::clone_into(&self.config.git_program, uri, &self.config.base_dir, &name)?;
        }

        let session = VcsSession::new(&self.config.git_program, path);
        if let Some((identity, scope)) = identity {
            session.set_identity(identity, scope)?;
        }

        self.binding.associate(project, uri)?;
        self.state.set_current_project(project)?;

        self.project = Some(project.to_string());
        self.repo_uri = Some(uri.to_string());
        self.session = Some(session);
        self.reload()?;
        Ok(())
    }

    /// Delete the local working copy for `uri`, discarding anything not
    /// pushed. Returns whether a directory was removed.
    pub fn delete_local_copy(&mut self, uri: &str) -> Result<bool> {
        let path = self.working_copy_path(uri)?;

        if self.working_copy() == Some(path.as_path()) {
            self.session = None;
            self.clear();
        }

        if !path.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&path).map_err(|e| BridgeError::io(&path, e))?;
        warn!("Deleted local working copy {}", path.display());
        Ok(true)
    }

    /// Rebuild the entry list from the working copy.
    pub fn reload(&self) -> Result<usize> {
        let loaded: Vec<Entry> = match &self.session {
            Some(session) => Entries::open(session.workdir())?.collect(),
            None => Vec::new(),
        };
        let count = loaded.len();

        *self.lock_entries() = loaded;

        self.observers.notify(&StoreEvent::Reloaded { count });
        debug!("Reloaded {} entries", count);
        Ok(count)
    }

    pub fn clear(&self) {
        let count = {
            let mut entries = self.lock_entries();
            let count = entries.len();
            entries.clear();
            count
        };
        if count > 0 {
            self.observers.notify(&StoreEvent::Cleared { count });
        }
    }

    /// Snapshot of the loaded entries.
    pub fn entries(&self) -> Vec<Entry> {
        self.lock_entries().clone()
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Entry> {
        self.lock_entries()
            .iter()
            .find(|e| &e.fingerprint == fingerprint)
            .cloned()
    }

    /// Resolve a full fingerprint or a unique prefix of one.
    pub fn resolve_fingerprint(&self, prefix: &str) -> Result<Fingerprint> {
        let entries = self.lock_entries();
        let mut matches = entries
            .iter()
            .filter(|e| e.fingerprint.as_str().starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(found), None) if !prefix.is_empty() => Ok(found.fingerprint.clone()),
            _ => Err(BridgeError::UnknownRecord(prefix.to_string())),
        }
    }

    /// Current `user.name` of the working copy.
    pub fn whoami(&self) -> Result<String> {
        self.session()?.whoami()
    }

    /// Timestamp and author for a record about to be stored.
    pub fn provenance(&self) -> Result<Provenance> {
        Ok(Provenance::now(self.whoami()?))
    }

    /// Write `record` under its fingerprint, stage and commit it.
    ///
    /// Storing a record whose fingerprint is already loaded rewrites it in
    /// place instead of adding a second entry.
    pub fn add_record(&self, record: Record) -> Result<Fingerprint> {
        let session = self.session()?;
        let fingerprint = record.fingerprint();
        let dir = session.workdir().join(fingerprint.as_str());

        write_record(&record, &dir)?;
        session.stage(fingerprint.as_str())?;
        let kind = record.kind().map(|k| k.into_owned());
        session.commit(&format!(
            "Added {} entry",
            kind.as_deref().unwrap_or("record")
        ))?;
        info!("Stored {} as {}", kind.as_deref().unwrap_or("record"), fingerprint);

        let event = {
            let mut entries = self.lock_entries();
            let entry = Entry {
                fingerprint: fingerprint.clone(),
                record,
            };
            match entries.iter().position(|e| e.fingerprint == fingerprint) {
                Some(index) => {
                    entries[index] = entry;
                    StoreEvent::Updated {
                        index,
                        fingerprint: fingerprint.clone(),
                    }
                }
                None => {
                    entries.push(entry);
                    StoreEvent::Inserted {
                        index: entries.len() - 1,
                        fingerprint: fingerprint.clone(),
                    }
                }
            }
        };
        self.observers.notify(&event);

        Ok(fingerprint)
    }

    /// Remove a record's directory and commit the deletion.
    ///
    /// There is no tombstone: once committed, and more so once pushed, the
    /// record is gone for everyone.
    pub fn remove(&self, fingerprint: &Fingerprint) -> Result<()> {
        let session = self.session()?;
        let dir = Self::record_dir(session, fingerprint)?;

        session.remove(fingerprint.as_str())?;
        session.commit(&format!("Removed entry at {}", dir.display()))?;
        info!("Removed {}", fingerprint);

        let removed = {
            let mut entries = self.lock_entries();
            entries
                .iter()
                .position(|e| &e.fingerprint == fingerprint)
                .map(|index| {
                    entries.remove(index);
                    index
                })
        };
        if let Some(index) = removed {
            self.observers.notify(&StoreEvent::Removed {
                index,
                fingerprint: fingerprint.clone(),
            });
        }
        Ok(())
    }

    /// Replace a record's description, commit, then push.
    ///
    /// Only the author recorded in `who` may edit. Anyone else gets
    /// `Ok(false)` and nothing changes. The check compares self-reported
    /// `user.name` values and is advisory, not access control.
    pub fn set_description(&self, fingerprint: &Fingerprint, description: &str) -> Result<bool> {
        let session = self.session()?;
        let dir = Self::record_dir(session, fingerprint)?;

        let who_path = dir.join(WHO_FIELD);
        let author = match fs::read(&who_path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(BridgeError::io(&who_path, e)),
        };
        let me = session.whoami()?;
        if author.is_empty() || author != me {
            warn!(
                "{} cannot edit the description of {}: created by {:?}",
                me, fingerprint, author
            );
            return Ok(false);
        }

        let description_path = dir.join(DESCRIPTION_FIELD);
        fs::write(&description_path, description)
            .map_err(|e| BridgeError::io(&description_path, e))?;
        session.stage(Path::new(fingerprint.as_str()).join(DESCRIPTION_FIELD))?;
        session.commit("Edited description entry")?;

        let updated = {
            let mut entries = self.lock_entries();
            entries
                .iter_mut()
                .enumerate()
                .find(|(_, e)| &e.fingerprint == fingerprint)
                .map(|(index, e)| {
                    e.record.set_scalar(DESCRIPTION_FIELD, description);
                    index
                })
        };
        if let Some(index) = updated {
            self.observers.notify(&StoreEvent::Updated {
                index,
                fingerprint: fingerprint.clone(),
            });
        }

        // The edit is committed locally either way; a failed push leaves it
        // for the next sync.
        self.sync_out()?;
        Ok(true)
    }

    /// Pull remote changes and rebuild the entry list.
    pub fn sync_in(&self) -> Result<usize> {
        self.session()?.sync_in()?;
        self.state.mark_pulled()?;
        self.reload()
    }

    /// Pull then push. A rejected push is surfaced unresolved.
    pub fn sync_out(&self) -> Result<()> {
        self.session()?.sync_out()?;
        self.state.mark_pushed()?;
        Ok(())
    }
}
