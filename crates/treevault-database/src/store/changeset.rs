//! Atomic batches of tree mutations.

use treevault_core::types::{FileId, FolderId};
use treevault_entity::event::NewSyncEvent;
use treevault_entity::lifecycle::ResourceState;

/// One row-level change.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Re-parent a file. Bumps its version.
    MoveFile {
        /// File to move.
        file_id: FileId,
        /// New folder (None = root).
        folder_id: Option<FolderId>,
    },
    /// Rename a file. Bumps its version.
    RenameFile {
        /// File to rename.
        file_id: FileId,
        /// New name.
        name: String,
    },
    /// Rename a folder.
    RenameFolder {
        /// Folder to rename.
        folder_id: FolderId,
        /// New name.
        name: String,
    },
    /// Re-parent a folder and rewrite the paths of its whole subtree.
    ///
    /// Both the folder's current path and the parent's path are read inside
    /// the transaction, so earlier mutations of the same changeset are seen.
    MoveFolder {
        /// Folder to move.
        folder_id: FolderId,
        /// New parent (None = root).
        parent_id: Option<FolderId>,
    },
    /// Set the lifecycle columns of several folders.
    SetFolderState {
        /// Folders to update.
        ids: Vec<FolderId>,
        /// New state.
        state: ResourceState,
    },
    /// Set the lifecycle columns of several files. Bumps their versions.
    SetFileState {
        /// Files to update.
        ids: Vec<FileId>,
        /// New state.
        state: ResourceState,
    },
    /// Hard-delete file rows and the shares pointing at them.
    DeleteFiles(Vec<FileId>),
    /// Hard-delete folder rows and the shares pointing at them.
    DeleteFolders(Vec<FolderId>),
    /// Append a sync event.
    RecordEvent(NewSyncEvent),
}

/// An ordered list of mutations applied in a single transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    mutations: Vec<Mutation>,
}

impl Changeset {
    /// Create an empty changeset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mutation.
    pub fn push(&mut self, mutation: Mutation) -> &mut Self {
        self.mutations.push(mutation);
        self
    }

    /// Append a sync event.
    pub fn record(&mut self, event: NewSyncEvent) -> &mut Self {
        self.push(Mutation::RecordEvent(event))
    }

    /// Whether there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Number of mutations.
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// Borrow the mutations in order.
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Sync events carried by this changeset.
    pub fn events(&self) -> impl Iterator<Item = &NewSyncEvent> {
        self.mutations.iter().filter_map(|m| match m {
            Mutation::RecordEvent(event) => Some(event),
            _ => None,
        })
    }
}

/// What applying a changeset actually removed.
///
/// A concurrent transaction may have deleted a row between the caller's
/// read and the commit; such rows are absent here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applied {
    /// File rows deleted by this changeset.
    pub deleted_files: Vec<FileId>,
    /// Folder rows deleted by this changeset.
    pub deleted_folders: Vec<FolderId>,
}

impl Applied {
    /// Whether this changeset deleted the file row.
    pub fn deleted_file(&self, id: FileId) -> bool {
        self.deleted_files.contains(&id)
    }
}

impl IntoIterator for Changeset {
    type Item = Mutation;
    type IntoIter = std::vec::IntoIter<Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.into_iter()
    }
}
