//! Matrix edit workflow backing the permission management table.
//!
//! `Clean -> Dirty -> Saving -> Clean`. Edits are held in memory until an
//! explicit save; cancel reloads whatever the store currently holds. While a
//! save is in flight every other action is refused.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::catalog::{search_permissions, PermissionCategory};
use crate::errors::{GateError, GateResult};
use crate::matrix::{load_matrix, save_matrix, toggle, PermissionMatrix, RoleGrants};
use crate::role::AdminRole;
use crate::store::{CookieOptions, PersistedStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EditState {
    Clean,
    Dirty,
    Saving,
}

impl fmt::Display for EditState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// One checkbox row of the management table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRow {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub grants: RoleGrants,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionGroup {
    pub category: PermissionCategory,
    pub title: &'static str,
    pub rows: Vec<PermissionRow>,
}

pub struct MatrixEditor<'s> {
    store: &'s dyn PersistedStore,
    cookie: CookieOptions,
    matrix: PermissionMatrix,
    state: EditState,
}

impl<'s> MatrixEditor<'s> {
    /// Start a clean editing session from the effective matrix.
    pub fn open(store: &'s dyn PersistedStore, cookie: CookieOptions) -> Self {
        Self {
            store,
            cookie,
            matrix: load_matrix(store),
            state: EditState::Clean,
        }
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn matrix(&self) -> &PermissionMatrix {
        &self.matrix
    }

    pub fn toggle(&mut self, key: &str, role: AdminRole, enabled: bool) -> GateResult<()> {
        if self.state == EditState::Saving {
            return Err(GateError::invalid_transition(self.state.to_string(), "toggle"));
        }
        self.matrix = toggle(&self.matrix, key, role, enabled);
        self.state = EditState::Dirty;
        Ok(())
    }

    /// `Dirty -> Saving`.
    pub fn begin_save(&mut self) -> GateResult<()> {
        if self.state != EditState::Dirty {
            return Err(GateError::invalid_transition(self.state.to_string(), "save"));
        }
        self.state = EditState::Saving;
        Ok(())
    }

    /// Write the edited matrix: `Saving -> Clean`, or back to `Dirty` if the
    /// write fails so the edits are not lost.
    pub fn finish_save(&mut self) -> GateResult<()> {
        if self.state != EditState::Saving {
            return Err(GateError::invalid_transition(self.state.to_string(), "finish save"));
        }
        match save_matrix(self.store, &self.matrix, &self.cookie) {
            Ok(()) => {
                self.state = EditState::Clean;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("permission matrix save failed, edits kept: {e}");
                self.state = EditState::Dirty;
                Err(e)
            }
        }
    }

    /// Full save including the simulated round-trip latency.
    pub async fn save(&mut self, latency: Duration) -> GateResult<()> {
        self.begin_save()?;
        match save_matrix(self.store, &self.matrix, &self.cookie) {
            Ok(()) => {
                tokio::time::sleep(latency).await;
                self.state = EditState::Clean;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("permission matrix save failed, edits kept: {e}");
                self.state = EditState::Dirty;
                Err(e)
            }
        }
    }

    /// Discard in-memory edits: `Dirty -> Clean`, reloading from the store.
    pub fn cancel(&mut self) -> GateResult<()> {
        if self.state != EditState::Dirty {
            return Err(GateError::invalid_transition(self.state.to_string(), "cancel"));
        }
        self.matrix = load_matrix(self.store);
        self.state = EditState::Clean;
        Ok(())
    }

    /// Catalog rows matching `search`, grouped by category. Empty groups
    /// are omitted.
    pub fn rows(&self, search: &str) -> Vec<PermissionGroup> {
        let matches = search_permissions(search);
        [PermissionCategory::Users, PermissionCategory::Settings]
            .into_iter()
            .filter_map(|category| {
                let rows: Vec<PermissionRow> = matches
                    .iter()
                    .filter(|p| p.category == category)
                    .map(|p| PermissionRow {
                        key: p.key,
                        name: p.name,
                        description: p.description,
                        grants: self.matrix.grants(p.key).copied().unwrap_or_default(),
                    })
                    .collect();
                (!rows.is_empty()).then(|| PermissionGroup {
                    category,
                    title: category.title(),
                    rows,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CookieJar, MATRIX_KEY};

    #[test]
    fn toggle_marks_dirty() {
        let jar = CookieJar::new();
        let mut editor = MatrixEditor::open(&jar, CookieOptions::session_default());
        assert_eq!(editor.state(), EditState::Clean);

        editor.toggle("users:delete", AdminRole::Editor, true).unwrap();
        assert_eq!(editor.state(), EditState::Dirty);
        assert!(editor.matrix().granted("users:delete", AdminRole::Editor));
    }

    #[test]
    fn cancel_restores_persisted_without_writing() {
        let jar = CookieJar::new();
        let mut editor = MatrixEditor::open(&jar, CookieOptions::session_default());
        editor.toggle("users:delete", AdminRole::Editor, true).unwrap();

        editor.cancel().unwrap();
        assert_eq!(editor.state(), EditState::Clean);
        assert!(!editor.matrix().granted("users:delete", AdminRole::Editor));
        assert_eq!(jar.pending_writes(), 0);
        assert_eq!(jar.get(MATRIX_KEY), None);
    }

    #[test]
    fn saving_refuses_other_actions() {
        let jar = CookieJar::new();
        let mut editor = MatrixEditor::open(&jar, CookieOptions::session_default());
        editor.toggle("webhooks:read", AdminRole::Auditor, true).unwrap();
        editor.begin_save().unwrap();
        assert_eq!(editor.state(), EditState::Saving);

        assert!(editor.toggle("users:read", AdminRole::Auditor, false).is_err());
        assert!(editor.cancel().is_err());
        assert!(editor.begin_save().is_err());

        editor.finish_save().unwrap();
        assert_eq!(editor.state(), EditState::Clean);
        assert_eq!(load_matrix(&jar), *editor.matrix());
    }

    #[test]
    fn clean_editor_cannot_save_or_cancel() {
        let jar = CookieJar::new();
        let mut editor = MatrixEditor::open(&jar, CookieOptions::session_default());
        assert!(editor.begin_save().is_err());
        assert!(editor.cancel().is_err());
    }

    #[tokio::test]
    async fn save_persists_and_returns_clean() {
        let jar = CookieJar::new();
        let mut editor = MatrixEditor::open(&jar, CookieOptions::session_default());
        editor.toggle("users:export", AdminRole::Editor, true).unwrap();
        editor.save(Duration::from_millis(5)).await.unwrap();

        assert_eq!(editor.state(), EditState::Clean);
        assert_eq!(jar.pending_writes(), 1);
        assert!(load_matrix(&jar).granted("users:export", AdminRole::Editor));
    }

    #[test]
    fn rows_group_and_filter() {
        let jar = CookieJar::new();
        let editor = MatrixEditor::open(&jar, CookieOptions::session_default());

        let all = editor.rows("");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "User Management");
        assert_eq!(all[0].rows.len(), 5);

        let filtered = editor.rows("webhook");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].category, PermissionCategory::Settings);
        assert!(filtered[0].rows.iter().all(|r| r.grants.super_admin));
    }
}
