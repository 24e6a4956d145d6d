#![forbid(unsafe_code)]

//! Shared data model for dotview: node records, cluster groups, the viewer's
//! pan/zoom state and the people browser model.

pub mod browser;
pub mod view;

pub use browser::{Browser, BrowserDetail, BrowserRow, Selection, TreeGroup};
pub use view::{MAX_SCALE, MIN_SCALE, ViewState, ZOOM_STEP};

use serde::{Deserialize, Serialize};

/// Name of the bucket that collects nodes declared outside any cluster block.
pub const OTHER_GROUP: &str = "Other";

/// A node declaration as matched in the source, before defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNode {
    pub id: String,
    pub label: Option<String>,
    pub work: Option<String>,
    pub link: Option<String>,
}

impl RawNode {
    /// Apply the record defaults: an empty or missing label falls back to the
    /// id, and the work attribute is split into a list.
    #[must_use]
    pub fn normalize(self) -> NodeRecord {
        let label = match self.label {
            Some(label) if !label.is_empty() => label,
            _ => self.id.clone(),
        };
        let work = self.work.as_deref().map(split_work).unwrap_or_default();
        NodeRecord {
            id: self.id,
            label,
            work,
            link: self.link,
        }
    }
}

/// One extracted graph entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub label: String,
    pub work: Vec<String>,
    pub link: Option<String>,
}

impl NodeRecord {
    /// Link usable by the open-link action. Empty strings count as absent.
    #[must_use]
    pub fn open_link(&self) -> Option<&str> {
        self.link.as_deref().filter(|link| !link.is_empty())
    }

    /// Lower-cased text the browser filter matches against.
    #[must_use]
    pub fn search_text(&self) -> String {
        let mut blob = self.label.clone();
        blob.push(' ');
        blob.push_str(&self.work.join(" "));
        blob.to_lowercase()
    }
}

/// Split a semicolon-delimited work attribute into trimmed, non-empty items.
#[must_use]
pub fn split_work(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub members: Vec<NodeRecord>,
}

impl Group {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_other(&self) -> bool {
        self.name == OTHER_GROUP
    }
}

/// Groups in first-seen order. The `"Other"` bucket, when present, is last.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupedNodes {
    groups: Vec<Group>,
}

impl GroupedNodes {
    /// Build from an ordered list. Empty `"Other"` buckets are dropped and a
    /// non-empty one is moved to the end.
    #[must_use]
    pub fn from_groups(groups: Vec<Group>) -> Self {
        let (other, mut named): (Vec<Group>, Vec<Group>) =
            groups.into_iter().partition(Group::is_other);
        let mut bucket = Group::new(OTHER_GROUP);
        for group in other {
            bucket.members.extend(group.members);
        }
        if !bucket.members.is_empty() {
            named.push(bucket);
        }
        Self { groups: named }
    }

    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.groups.iter().map(|group| group.members.len()).sum()
    }

    /// Every record paired with the name of the group that owns it.
    pub fn records(&self) -> impl Iterator<Item = (&str, &NodeRecord)> {
        self.groups.iter().flat_map(|group| {
            group
                .members
                .iter()
                .map(move |record| (group.name.as_str(), record))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, label: Option<&str>, work: Option<&str>) -> RawNode {
        RawNode {
            id: id.to_string(),
            label: label.map(str::to_string),
            work: work.map(str::to_string),
            link: None,
        }
    }

    #[test]
    fn normalize_defaults_label_to_id() {
        assert_eq!(raw("bob", None, None).normalize().label, "bob");
        assert_eq!(raw("bob", Some(""), None).normalize().label, "bob");
        assert_eq!(raw("bob", Some("Bob"), None).normalize().label, "Bob");
    }

    #[test]
    fn normalize_splits_work_items() {
        let record = raw("a", None, Some("a; b ;c")).normalize();
        assert_eq!(record.work, vec!["a", "b", "c"]);
        assert!(raw("a", None, None).normalize().work.is_empty());
        assert!(raw("a", None, Some(" ; ;")).normalize().work.is_empty());
    }

    #[test]
    fn other_bucket_moves_last_and_drops_when_empty() {
        let mut other = Group::new(OTHER_GROUP);
        other.members.push(raw("x", None, None).normalize());
        let grouped = GroupedNodes::from_groups(vec![other, Group::new("Team A")]);
        let names: Vec<&str> = grouped.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Team A", OTHER_GROUP]);

        let grouped = GroupedNodes::from_groups(vec![Group::new(OTHER_GROUP), Group::new("B")]);
        assert_eq!(grouped.len(), 1);
        assert!(grouped.get(OTHER_GROUP).is_none());
    }

    #[test]
    fn empty_link_is_not_openable() {
        let mut record = raw("a", None, None).normalize();
        assert_eq!(record.open_link(), None);
        record.link = Some(String::new());
        assert_eq!(record.open_link(), None);
        record.link = Some("https://example.org".to_string());
        assert_eq!(record.open_link(), Some("https://example.org"));
    }

    #[test]
    fn grouped_nodes_serialize_as_list() {
        let grouped = GroupedNodes::from_groups(vec![Group::new("A")]);
        let json = serde_json::to_string(&grouped).expect("serialize");
        assert_eq!(json, r#"[{"name":"A","members":[]}]"#);
    }
}
