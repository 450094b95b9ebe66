use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::domain::entities::{
    Directory, DirectoryField, DirectoryUnique, File, FileField, Repository, RepositoryUnique,
    UpdateDirectory,
};
use crate::domain::query::{Filter, FindManyArgs, OrderBy};
use crate::domain::stores::{ConstraintKind, Store, StoreError, StoreResult, Tx};

const ACYCLIC_CONSTRAINT: &str = "directories_parent_acyclic";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryNode {
    #[serde(flatten)]
    pub directory: Directory,
    pub children: Vec<DirectoryNode>,
    pub files: Vec<File>,
}

/// A repository's directories nested under their parents. Files without a
/// directory sit at the root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryTree {
    pub repository: Repository,
    pub directories: Vec<DirectoryNode>,
    pub files: Vec<File>,
}

#[derive(Clone)]
pub struct DirectoryTreeService {
    store: Store,
}

impl DirectoryTreeService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// `None` if the repository does not exist.
    pub async fn tree(&self, repository_id: &str) -> StoreResult<Option<RepositoryTree>> {
        let id = repository_id.to_string();
        self.store.run(move |tx| load_tree(tx, &id)).await
    }

    /// Parent, grandparent, ... up to the root, nearest first.
    pub async fn ancestors(&self, directory_id: &str) -> StoreResult<Vec<Directory>> {
        let id = directory_id.to_string();
        self.store
            .run(move |tx| {
                let directory = tx.find_unique_or_throw::<Directory>(&DirectoryUnique::Id(id))?;
                ancestor_chain(tx, directory.parent_id)
            })
            .await
    }

    /// Moves a directory under `new_parent_id`, or to the root with `None`.
    pub async fn reparent(&self, directory_id: &str, new_parent_id: Option<String>) -> StoreResult<Directory> {
        let id = directory_id.to_string();
        self.store
            .run(move |tx| {
                let key = DirectoryUnique::Id(id.clone());
                tx.find_unique_or_throw::<Directory>(&key)?;
                if let Some(parent_id) = &new_parent_id {
                    if *parent_id == id {
                        return Err(cycle_error(&id));
                    }
                    let parent = tx.find_unique_or_throw::<Directory>(&DirectoryUnique::Id(parent_id.clone()))?;
                    let chain = ancestor_chain(tx, parent.parent_id)?;
                    if chain.iter().any(|d| d.id == id) {
                        return Err(cycle_error(&id));
                    }
                }
                debug!("Reparenting directory {} under {:?}", id, new_parent_id);
                tx.update::<Directory>(
                    &key,
                    UpdateDirectory {
                        parent_id: Some(new_parent_id),
                        ..Default::default()
                    },
                )
            })
            .await
    }
}

fn cycle_error(directory_id: &str) -> StoreError {
    StoreError::constraint(
        ConstraintKind::Acyclic,
        ACYCLIC_CONSTRAINT,
        format!("directory {} cannot become its own ancestor", directory_id),
    )
}

fn ancestor_chain(tx: &mut Tx<'_>, mut next: Option<String>) -> StoreResult<Vec<Directory>> {
    let mut visited = HashSet::new();
    let mut chain = Vec::new();
    while let Some(id) = next {
        if !visited.insert(id.clone()) {
            return Err(StoreError::Unknown(format!(
                "directory {} appears twice in its own ancestry",
                id
            )));
        }
        let Some(directory) = tx.find_unique::<Directory>(&DirectoryUnique::Id(id))? else {
            break;
        };
        next = directory.parent_id.clone();
        chain.push(directory);
    }
    Ok(chain)
}

fn load_tree(tx: &mut Tx<'_>, repository_id: &str) -> StoreResult<Option<RepositoryTree>> {
    let Some(repository) = tx.find_unique::<Repository>(&RepositoryUnique::Id(repository_id.to_string()))? else {
        return Ok(None);
    };
    let directories = tx.find_many::<Directory>(
        FindManyArgs::new()
            .filter(Filter::equals(DirectoryField::RepositoryId, repository_id))
            .order_by(OrderBy::asc(DirectoryField::Path)),
    )?;
    let files = tx.find_many::<File>(
        FindManyArgs::new()
            .filter(Filter::equals(FileField::RepositoryId, repository_id))
            .order_by(OrderBy::asc(FileField::Path)),
    )?;

    let mut files_by_directory: HashMap<Option<String>, Vec<File>> = HashMap::new();
    for file in files {
        files_by_directory
            .entry(file.directory_id.clone())
            .or_default()
            .push(file);
    }
    let mut children: HashMap<Option<String>, Vec<Directory>> = HashMap::new();
    for directory in directories {
        children
            .entry(directory.parent_id.clone())
            .or_default()
            .push(directory);
    }

    let mut visited = HashSet::new();
    let roots = build_nodes(None, &mut children, &mut files_by_directory, &mut visited);
    let root_files = files_by_directory.remove(&None).unwrap_or_default();
    Ok(Some(RepositoryTree {
        repository,
        directories: roots,
        files: root_files,
    }))
}

fn build_nodes(
    parent: Option<String>,
    children: &mut HashMap<Option<String>, Vec<Directory>>,
    files: &mut HashMap<Option<String>, Vec<File>>,
    visited: &mut HashSet<String>,
) -> Vec<DirectoryNode> {
    let Some(directories) = children.remove(&parent) else {
        return Vec::new();
    };
    let mut nodes = Vec::with_capacity(directories.len());
    for directory in directories {
        if !visited.insert(directory.id.clone()) {
            continue;
        }
        let key = Some(directory.id.clone());
        let nested = build_nodes(key.clone(), children, files, visited);
        nodes.push(DirectoryNode {
            files: files.remove(&key).unwrap_or_default(),
            children: nested,
            directory,
        });
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::entities::{CreateDirectory, CreateFile, CreateRepository, CreateUser};
    use crate::domain::stores::TransactionOptions;
    use crate::infrastructure::memory::MemoryBackend;

    struct Fixture {
        service: DirectoryTreeService,
        repository: Repository,
        src: Directory,
        store_dir: Directory,
        docs: Directory,
    }

    async fn fixture() -> Fixture {
        let store = Store::new(Arc::new(MemoryBackend::new()), TransactionOptions::default());
        let user = store
            .users()
            .create(CreateUser {
                email: "ada@example.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let repository = store
            .repositories()
            .create(CreateRepository {
                name: "engine".to_string(),
                user_id: user.id,
                ..Default::default()
            })
            .await
            .unwrap();
        let directory = |path: &str, parent: Option<&Directory>| CreateDirectory {
            path: path.to_string(),
            repository_id: repository.id.clone(),
            parent_id: parent.map(|p| p.id.clone()),
            ..Default::default()
        };
        let src = store.directories().create(directory("src", None)).await.unwrap();
        let store_dir = store
            .directories()
            .create(directory("src/store", Some(&src)))
            .await
            .unwrap();
        let docs = store.directories().create(directory("docs", None)).await.unwrap();

        for (path, dir) in [
            ("Cargo.toml", None),
            ("src/lib.rs", Some(&src)),
            ("src/store/mod.rs", Some(&store_dir)),
        ] {
            store
                .files()
                .create(CreateFile {
                    path: path.to_string(),
                    name: path.rsplit('/').next().unwrap_or(path).to_string(),
                    repository_id: repository.id.clone(),
                    directory_id: dir.map(|d: &Directory| d.id.clone()),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        Fixture {
            service: DirectoryTreeService::new(store),
            repository,
            src,
            store_dir,
            docs,
        }
    }

    #[tokio::test]
    async fn test_tree_nests_directories_and_files() {
        let f = fixture().await;
        let tree = f.service.tree(&f.repository.id).await.unwrap().unwrap();

        let roots: Vec<&str> = tree.directories.iter().map(|n| n.directory.path.as_str()).collect();
        assert_eq!(roots, vec!["docs", "src"]);
        assert_eq!(tree.files.len(), 1);
        assert_eq!(tree.files[0].path, "Cargo.toml");

        let src = &tree.directories[1];
        assert_eq!(src.files[0].path, "src/lib.rs");
        assert_eq!(src.children.len(), 1);
        assert_eq!(src.children[0].directory.id, f.store_dir.id);
        assert_eq!(src.children[0].files[0].name, "mod.rs");

        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["directories"][1]["path"], "src");
        assert_eq!(json["directories"][1]["children"][0]["path"], "src/store");

        assert!(f.service.tree("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ancestors_nearest_first() {
        let f = fixture().await;
        let chain = f.service.ancestors(&f.store_dir.id).await.unwrap();
        assert_eq!(chain, vec![f.src.clone()]);
        assert!(f.service.ancestors(&f.src.id).await.unwrap().is_empty());
        assert!(f.service.ancestors("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_reparent_rejects_cycles() {
        let f = fixture().await;

        let err = f
            .service
            .reparent(&f.src.id, Some(f.store_dir.id.clone()))
            .await
            .unwrap_err();
        assert_eq!(
            err.violated_constraint(),
            Some((ConstraintKind::Acyclic, ACYCLIC_CONSTRAINT))
        );
        let err = f
            .service
            .reparent(&f.src.id, Some(f.src.id.clone()))
            .await
            .unwrap_err();
        assert_eq!(
            err.violated_constraint(),
            Some((ConstraintKind::Acyclic, ACYCLIC_CONSTRAINT))
        );

        let moved = f
            .service
            .reparent(&f.store_dir.id, Some(f.docs.id.clone()))
            .await
            .unwrap();
        assert_eq!(moved.parent_id, Some(f.docs.id.clone()));
        let to_root = f.service.reparent(&f.store_dir.id, None).await.unwrap();
        assert!(to_root.parent_id.is_none());
    }
}
