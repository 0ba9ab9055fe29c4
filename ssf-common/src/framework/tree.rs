//! Editable framework tree (pillar → theme → sub-theme)
//!
//! Structural edits never touch their input: [`apply_edit`] borrows the
//! current tree and hands back a new one, so callers can diff old against new.
//! Nodes are addressed by index paths: `[i]` is pillar `i`, `[i, j]` theme `j`
//! of pillar `i`, `[i, j, k]` sub-theme `k` of that theme.

use serde::{Deserialize, Serialize};

use super::Level;
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameworkTree {
    #[serde(default)]
    pub pillars: Vec<PillarNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillarNode {
    /// Store id; `None` for nodes not saved yet
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub themes: Vec<ThemeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeNode {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub subthemes: Vec<SubthemeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubthemeNode {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

impl PillarNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            code: String::new(),
            name: name.into(),
            description: None,
            sort_order: 0,
            themes: Vec::new(),
        }
    }
}

impl ThemeNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            code: String::new(),
            name: name.into(),
            description: None,
            sort_order: 0,
            subthemes: Vec::new(),
        }
    }
}

impl SubthemeNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            code: String::new(),
            name: name.into(),
            description: None,
            sort_order: 0,
        }
    }
}

/// A detached node of any tree level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "lowercase")]
pub enum TreeNode {
    Pillar(PillarNode),
    Theme(ThemeNode),
    Subtheme(SubthemeNode),
}

impl TreeNode {
    pub fn level(&self) -> Level {
        match self {
            TreeNode::Pillar(_) => Level::Pillar,
            TreeNode::Theme(_) => Level::Theme,
            TreeNode::Subtheme(_) => Level::Subtheme,
        }
    }
}

/// Index path into the tree; the empty path is the root (parent of pillars)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Level of the node this path points at; `None` for the root or paths deeper than sub-themes
    pub fn level(&self) -> Option<Level> {
        match self.0.len() {
            1 => Some(Level::Pillar),
            2 => Some(Level::Theme),
            3 => Some(Level::Subtheme),
            _ => None,
        }
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(path: Vec<usize>) -> Self {
        Self(path)
    }
}

/// Structural tree edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TreeEdit {
    /// Insert `node` as child number `position` of `parent`
    Insert {
        parent: NodePath,
        position: usize,
        node: TreeNode,
    },
    /// Remove the node (and its subtree) at `path`
    Remove { path: NodePath },
    /// Detach the node at `from` and insert it under `to_parent` at `position`.
    /// `position` is interpreted after the node has been detached.
    Move {
        from: NodePath,
        to_parent: NodePath,
        position: usize,
    },
}

/// Apply one edit, returning the edited copy of `tree`
pub fn apply_edit(tree: &FrameworkTree, edit: &TreeEdit) -> Result<FrameworkTree> {
    let mut next = tree.clone();
    match edit {
        TreeEdit::Insert {
            parent,
            position,
            node,
        } => put_node(&mut next, parent, *position, node.clone())?,
        TreeEdit::Remove { path } => {
            take_node(&mut next, path)?;
        }
        TreeEdit::Move {
            from,
            to_parent,
            position,
        } => {
            let node = take_node(&mut next, from)?;
            put_node(&mut next, to_parent, *position, node)?;
        }
    }
    Ok(next)
}

/// Apply edits in order; the first failing edit aborts the whole sequence
pub fn apply_edits(tree: &FrameworkTree, edits: &[TreeEdit]) -> Result<FrameworkTree> {
    edits
        .iter()
        .try_fold(tree.clone(), |current, edit| apply_edit(&current, edit))
}

fn out_of_range(path: &NodePath) -> Error {
    Error::Validation(format!("No node at path {:?}", path.0))
}

fn pillar_mut<'a>(tree: &'a mut FrameworkTree, i: usize, path: &NodePath) -> Result<&'a mut PillarNode> {
    tree.pillars.get_mut(i).ok_or_else(|| out_of_range(path))
}

fn theme_mut<'a>(
    tree: &'a mut FrameworkTree,
    i: usize,
    j: usize,
    path: &NodePath,
) -> Result<&'a mut ThemeNode> {
    pillar_mut(tree, i, path)?
        .themes
        .get_mut(j)
        .ok_or_else(|| out_of_range(path))
}

fn checked_remove<T>(items: &mut Vec<T>, index: usize, path: &NodePath) -> Result<T> {
    if index < items.len() {
        Ok(items.remove(index))
    } else {
        Err(out_of_range(path))
    }
}

fn checked_insert<T>(items: &mut Vec<T>, position: usize, item: T) -> Result<()> {
    if position > items.len() {
        return Err(Error::Validation(format!(
            "Insert position {} out of range (0..={})",
            position,
            items.len()
        )));
    }
    items.insert(position, item);
    Ok(())
}

fn take_node(tree: &mut FrameworkTree, path: &NodePath) -> Result<TreeNode> {
    match path.0.as_slice() {
        [i] => checked_remove(&mut tree.pillars, *i, path).map(TreeNode::Pillar),
        [i, j] => {
            let pillar = pillar_mut(tree, *i, path)?;
            checked_remove(&mut pillar.themes, *j, path).map(TreeNode::Theme)
        }
        [i, j, k] => {
            let theme = theme_mut(tree, *i, *j, path)?;
            checked_remove(&mut theme.subthemes, *k, path).map(TreeNode::Subtheme)
        }
        _ => Err(out_of_range(path)),
    }
}

fn put_node(tree: &mut FrameworkTree, parent: &NodePath, position: usize, node: TreeNode) -> Result<()> {
    match (parent.0.as_slice(), node) {
        ([], TreeNode::Pillar(pillar)) => checked_insert(&mut tree.pillars, position, pillar),
        ([i], TreeNode::Theme(theme)) => {
            let pillar = pillar_mut(tree, *i, parent)?;
            checked_insert(&mut pillar.themes, position, theme)
        }
        ([i, j], TreeNode::Subtheme(subtheme)) => {
            let theme = theme_mut(tree, *i, *j, parent)?;
            checked_insert(&mut theme.subthemes, position, subtheme)
        }
        (_, node) => Err(Error::Validation(format!(
            "A {} cannot be placed under path {:?}",
            node.level(),
            parent.0
        ))),
    }
}
