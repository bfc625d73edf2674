//! Folder hierarchy of a workspace

use super::types::WorkspaceFolder;
use std::collections::{HashMap, HashSet};

/// A folder with its nested children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    pub folder: WorkspaceFolder,
    pub children: Vec<FolderNode>,
}

/// Folders nested by `parent_folder_id`, rooted at the workspace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderTree {
    pub roots: Vec<FolderNode>,
}

impl FolderTree {
    /// Folders without a parent, or whose parent is not in the list, become roots.
    /// Folders only reachable through a parent cycle are attached at the root
    /// too. Siblings are ordered by display name.
    pub fn build(folders: &[WorkspaceFolder]) -> Self {
        let known: HashSet<&str> = folders.iter().map(|f| f.id.as_str()).collect();
        let mut by_parent: HashMap<Option<&str>, Vec<&WorkspaceFolder>> = HashMap::new();

        for folder in folders {
            let parent = folder
                .parent_folder_id
                .as_deref()
                .filter(|p| known.contains(p) && *p != folder.id);
            by_parent.entry(parent).or_default().push(folder);
        }

        let mut visited = HashSet::new();
        let mut roots = Self::children_of(None, &by_parent, &mut visited);

        let mut unplaced: Vec<&WorkspaceFolder> = folders
            .iter()
            .filter(|f| !visited.contains(f.id.as_str()))
            .collect();
        unplaced.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        for folder in unplaced {
            if visited.insert(folder.id.as_str()) {
                let children = Self::children_of(Some(folder.id.as_str()), &by_parent, &mut visited);
                roots.push(FolderNode {
                    folder: folder.clone(),
                    children,
                });
            }
        }

        Self { roots }
    }

    fn children_of<'a>(
        parent: Option<&'a str>,
        by_parent: &HashMap<Option<&'a str>, Vec<&'a WorkspaceFolder>>,
        visited: &mut HashSet<&'a str>,
    ) -> Vec<FolderNode> {
        let mut siblings: Vec<&WorkspaceFolder> =
            by_parent.get(&parent).cloned().unwrap_or_default();
        siblings.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        let mut nodes = Vec::with_capacity(siblings.len());
        for folder in siblings {
            if visited.insert(folder.id.as_str()) {
                let children = Self::children_of(Some(folder.id.as_str()), by_parent, visited);
                nodes.push(FolderNode {
                    folder: folder.clone(),
                    children,
                });
            }
        }
        nodes
    }

    /// Find a folder anywhere in the tree
    pub fn find(&self, folder_id: &str) -> Option<&FolderNode> {
        fn walk<'a>(nodes: &'a [FolderNode], id: &str) -> Option<&'a FolderNode> {
            nodes.iter().find_map(|node| {
                if node.folder.id == id {
                    Some(node)
                } else {
                    walk(&node.children, id)
                }
            })
        }
        walk(&self.roots, folder_id)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::WorkspaceId;
    use pretty_assertions::assert_eq;

    fn folder(id: &str, name: &str, parent: Option<&str>, ws: WorkspaceId) -> WorkspaceFolder {
        WorkspaceFolder {
            id: id.to_string(),
            display_name: name.to_string(),
            workspace_id: ws,
            parent_folder_id: parent.map(str::to_string),
        }
    }

    #[test]
    fn test_nests_by_parent() {
        let ws = WorkspaceId::new();
        let tree = FolderTree::build(&[
            folder("c", "Child", Some("a"), ws),
            folder("a", "Alpha", None, ws),
            folder("b", "Beta", None, ws),
        ]);

        let names: Vec<_> = tree.roots.iter().map(|n| n.folder.display_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
        assert_eq!(tree.find("a").unwrap().children[0].folder.id, "c");
    }

    #[test]
    fn test_orphans_attach_at_root() {
        let ws = WorkspaceId::new();
        let tree = FolderTree::build(&[folder("x", "Orphan", Some("missing"), ws)]);
        assert_eq!(tree.roots.len(), 1);
        assert!(tree.find("x").is_some());
    }

    #[test]
    fn test_parent_cycle_attaches_at_root() {
        let ws = WorkspaceId::new();
        let tree = FolderTree::build(&[
            folder("b", "Beta", Some("a"), ws),
            folder("a", "Alpha", Some("b"), ws),
            folder("r", "Reports", None, ws),
        ]);

        let names: Vec<_> = tree.roots.iter().map(|n| n.folder.display_name.as_str()).collect();
        assert_eq!(names, vec!["Reports", "Alpha"]);
        assert_eq!(tree.find("a").unwrap().children[0].folder.id, "b");
        assert!(tree.find("b").unwrap().children.is_empty());
    }
}
