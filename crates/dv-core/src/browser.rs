//! People browser: a filterable tree of groups and their members with a
//! detail view for the current selection.
//!
//! The browser is a plain value built from one parse result. Reloading a
//! document means building a new browser, never patching an old one.

use crate::{GroupedNodes, NodeRecord};

/// A position in the tree. Members are addressed by their index inside the
/// owning group, so two records with the same label stay distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Group(usize),
    Member { group: usize, member: usize },
}

/// A group node of the visible tree and the members that pass the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeGroup {
    pub group: usize,
    pub name: String,
    pub members: Vec<usize>,
}

/// One line of the flattened tree as a front-end draws it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserRow {
    pub selection: Selection,
    pub text: String,
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserDetail<'a> {
    Empty,
    Group { name: &'a str },
    Member(&'a NodeRecord),
}

impl BrowserDetail<'_> {
    /// Heading shown above the detail text.
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Empty => "Select a person",
            Self::Group { name } => *name,
            Self::Member(record) => record.label.as_str(),
        }
    }

    /// Detail panel body, one entry per line.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Empty => Vec::new(),
            Self::Group { name } => vec![format!("Group: {name}")],
            Self::Member(record) => {
                let mut lines = vec![
                    format!("Name: {}", record.label),
                    format!("ID: {}", record.id),
                    String::new(),
                ];
                if record.work.is_empty() {
                    lines.push("Work: no data".to_string());
                } else {
                    lines.push("Work:".to_string());
                    lines.extend(record.work.iter().map(|item| format!(" • {item}")));
                }
                if let Some(link) = record.open_link() {
                    lines.push(String::new());
                    lines.push(format!("Link: {link}"));
                }
                lines
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Browser {
    grouped: GroupedNodes,
    filter: String,
    tree: Vec<TreeGroup>,
    selected: Option<Selection>,
}

impl Browser {
    #[must_use]
    pub fn new(grouped: GroupedNodes) -> Self {
        let mut browser = Self {
            grouped,
            filter: String::new(),
            tree: Vec::new(),
            selected: None,
        };
        browser.rebuild();
        browser
    }

    #[must_use]
    pub fn grouped(&self) -> &GroupedNodes {
        &self.grouped
    }

    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    #[must_use]
    pub fn tree(&self) -> &[TreeGroup] {
        &self.tree
    }

    #[must_use]
    pub fn selected(&self) -> Option<Selection> {
        self.selected
    }

    /// Replace the search text and rebuild the visible tree. A selection that
    /// is no longer visible is cleared.
    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
        self.rebuild();
        if let Some(selection) = self.selected {
            if !self.is_visible(selection) {
                self.selected = None;
            }
        }
    }

    pub fn push_filter_char(&mut self, ch: char) {
        let mut filter = std::mem::take(&mut self.filter);
        filter.push(ch);
        self.set_filter(filter);
    }

    pub fn pop_filter_char(&mut self) {
        let mut filter = std::mem::take(&mut self.filter);
        filter.pop();
        self.set_filter(filter);
    }

    /// Flattened visible tree: each group followed by its visible members.
    #[must_use]
    pub fn rows(&self) -> Vec<BrowserRow> {
        let mut rows = Vec::new();
        for tree_group in &self.tree {
            rows.push(BrowserRow {
                selection: Selection::Group(tree_group.group),
                text: tree_group.name.clone(),
                depth: 0,
            });
            let group = &self.grouped.groups()[tree_group.group];
            for &member in &tree_group.members {
                rows.push(BrowserRow {
                    selection: Selection::Member {
                        group: tree_group.group,
                        member,
                    },
                    text: group.members[member].label.clone(),
                    depth: 1,
                });
            }
        }
        rows
    }

    /// Select a visible row. Returns `false` and leaves the selection alone
    /// when the target is filtered out or does not exist.
    pub fn select(&mut self, selection: Selection) -> bool {
        if !self.is_visible(selection) {
            return false;
        }
        self.selected = Some(selection);
        true
    }

    pub fn select_next(&mut self) {
        self.step_selection(1);
    }

    pub fn select_prev(&mut self) {
        self.step_selection(-1);
    }

    /// Index of the selection in [`Browser::rows`].
    #[must_use]
    pub fn selected_row(&self) -> Option<usize> {
        let selected = self.selected?;
        self.rows().iter().position(|row| row.selection == selected)
    }

    #[must_use]
    pub fn detail(&self) -> BrowserDetail<'_> {
        match self.selected {
            None => BrowserDetail::Empty,
            Some(Selection::Group(group)) => self
                .grouped
                .groups()
                .get(group)
                .map_or(BrowserDetail::Empty, |group| BrowserDetail::Group {
                    name: &group.name,
                }),
            Some(Selection::Member { group, member }) => self
                .grouped
                .groups()
                .get(group)
                .and_then(|group| group.members.get(member))
                .map_or(BrowserDetail::Empty, BrowserDetail::Member),
        }
    }

    /// URL for the open-link action, enabled only for a selected member with
    /// a link.
    #[must_use]
    pub fn link_action(&self) -> Option<&str> {
        match self.detail() {
            BrowserDetail::Member(record) => record.open_link(),
            BrowserDetail::Empty | BrowserDetail::Group { .. } => None,
        }
    }

    fn rebuild(&mut self) {
        let needle = self.filter.trim().to_lowercase();
        self.tree = self
            .grouped
            .groups()
            .iter()
            .enumerate()
            .map(|(index, group)| TreeGroup {
                group: index,
                name: group.name.clone(),
                members: group
                    .members
                    .iter()
                    .enumerate()
                    .filter(|(_, record)| {
                        needle.is_empty() || record.search_text().contains(&needle)
                    })
                    .map(|(member, _)| member)
                    .collect(),
            })
            .collect();
    }

    fn is_visible(&self, selection: Selection) -> bool {
        match selection {
            Selection::Group(group) => self.tree.iter().any(|tree| tree.group == group),
            Selection::Member { group, member } => self
                .tree
                .iter()
                .any(|tree| tree.group == group && tree.members.contains(&member)),
        }
    }

    fn step_selection(&mut self, step: isize) {
        let rows = self.rows();
        if rows.is_empty() {
            self.selected = None;
            return;
        }
        let last = rows.len() - 1;
        let next = match self.selected_row() {
            None if step > 0 => 0,
            None => last,
            Some(current) => current.saturating_add_signed(step).min(last),
        };
        self.selected = Some(rows[next].selection);
    }
}
