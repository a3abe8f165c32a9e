//! Tree traversal over materialized paths.
//!
//! Descendants are enumerated breadth-first, one query per level, and
//! ancestors by an iterative walk up `parent_id`. Neither uses recursive
//! SQL nor recursion in process.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::error;

use treevault_core::result::AppResult;
use treevault_core::types::FolderId;
use treevault_core::AppError;
use treevault_database::store::TreeStore;
use treevault_entity::file::File;
use treevault_entity::folder::{Folder, MaterializedPath};

/// Deepest ancestor chain followed before the tree is considered corrupt.
pub const MAX_ANCESTOR_DEPTH: usize = 64;

/// A folder together with everything below it.
#[derive(Debug, Clone)]
pub struct Subtree {
    /// The subtree root followed by its descendants, level by level.
    pub folders: Vec<Folder>,
    /// Files inside any of those folders.
    pub files: Vec<File>,
}

impl Subtree {
    /// Keys of every folder in the subtree.
    pub fn folder_ids(&self) -> Vec<FolderId> {
        self.folders.iter().map(|f| f.id).collect()
    }
}

/// Folder tree queries.
#[derive(Debug, Clone)]
pub struct PathTree {
    store: Arc<dyn TreeStore>,
}

impl PathTree {
    /// Creates a new path tree over the store.
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        Self { store }
    }

    /// Path of a folder with key `id` placed under `parent_id`.
    pub async fn compute_path(
        &self,
        parent_id: Option<FolderId>,
        id: FolderId,
    ) -> AppResult<MaterializedPath> {
        let parent_path = match parent_id {
            Some(parent_id) => Some(
                self.store
                    .find_folder(parent_id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("Folder {parent_id} not found")))?
                    .path,
            ),
            None => None,
        };
        Ok(MaterializedPath::compute(parent_path.as_ref(), id))
    }

    /// Keys of every folder strictly below `root`, level by level.
    pub async fn collect_descendant_ids(&self, root: FolderId) -> AppResult<Vec<FolderId>> {
        let mut seen: HashSet<FolderId> = HashSet::from([root]);
        let mut descendants = Vec::new();
        let mut frontier = vec![root];

        while !frontier.is_empty() {
            let children = self.store.find_child_folder_ids(&frontier).await?;
            frontier = children
                .into_iter()
                .filter(|id| seen.insert(*id))
                .collect();
            descendants.extend_from_slice(&frontier);
        }

        Ok(descendants)
    }

    /// Keys of every ancestor of `folder_id`, nearest first.
    ///
    /// Fails with an internal error when the chain is longer than
    /// [`MAX_ANCESTOR_DEPTH`] or loops back on itself.
    pub async fn collect_ancestor_ids(&self, folder_id: FolderId) -> AppResult<Vec<FolderId>> {
        let mut ancestors = Vec::new();
        let mut current = self
            .store
            .find_folder(folder_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))?;

        while let Some(parent_id) = current.parent_id {
            if ancestors.len() >= MAX_ANCESTOR_DEPTH
                || parent_id == folder_id
                || ancestors.contains(&parent_id)
            {
                error!(folder_id = %folder_id, "Folder ancestry is cyclic or too deep");
                return Err(AppError::internal(format!(
                    "Ancestor chain of folder {folder_id} exceeds {MAX_ANCESTOR_DEPTH} levels"
                )));
            }
            ancestors.push(parent_id);
            current = self.store.find_folder(parent_id).await?.ok_or_else(|| {
                AppError::internal(format!("Folder {parent_id} referenced as parent is missing"))
            })?;
        }

        Ok(ancestors)
    }

    /// Ancestor keys read from the path alone, nearest first.
    pub fn ancestor_ids_from_path(path: &MaterializedPath) -> Vec<FolderId> {
        let mut ids = path.ancestor_ids();
        ids.reverse();
        ids
    }

    /// Load `root`, every folder below it, and every file inside them.
    pub async fn load_subtree(&self, root: Folder) -> AppResult<Subtree> {
        let descendant_ids = self.collect_descendant_ids(root.id).await?;
        let mut folders = Vec::with_capacity(descendant_ids.len() + 1);
        folders.push(root);
        if !descendant_ids.is_empty() {
            folders.extend(self.store.find_folders(&descendant_ids).await?);
        }

        let ids: Vec<FolderId> = folders.iter().map(|f| f.id).collect();
        let files = self.store.find_files_in_folders(&ids).await?;
        Ok(Subtree { folders, files })
    }

    /// Path of the folder holding a file, or None at the root.
    pub async fn folder_path_of(&self, file: &File) -> AppResult<Option<MaterializedPath>> {
        match file.folder_id {
            Some(folder_id) => Ok(Some(
                self.store
                    .find_folder(folder_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::internal(format!("Folder {folder_id} of file {} is missing", file.id))
                    })?
                    .path,
            )),
            None => Ok(None),
        }
    }
}
