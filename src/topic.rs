use std::{
    cmp::Ordering as CmpOrdering,
    collections::HashSet,
    fmt,
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

static NEXT_TOPIC_ID: AtomicU64 = AtomicU64::new(1);

/// A node of the topic hierarchy.
///
/// Topics are owned by the host application: the bus never creates them, it
/// only compares them. A topic may have several parents (think of a type
/// implementing several traits), so the hierarchy is a DAG.
///
/// Identity is the numeric id handed out at creation. Two topics with the
/// same name are still different topics.
#[derive(Clone)]
pub struct Topic {
    node: Arc<TopicNode>,
}

struct TopicNode {
    id: u64,
    name: Arc<str>,
    parents: Vec<Topic>,
}

////////////////////////////////////////////////////////////////////////////////
// Own methods
////////////////////////////////////////////////////////////////////////////////

impl Topic {
    /// Creates a topic without supertopics.
    pub fn root(name: impl Into<Arc<str>>) -> Self {
        Self::with_parents(name, &[])
    }

    /// Creates a topic that is a direct subtopic of every topic in `parents`.
    pub fn with_parents(
        name: impl Into<Arc<str>>,
        parents: &[&Topic],
    ) -> Self {
        let id = NEXT_TOPIC_ID.fetch_add(1, Ordering::Relaxed);
        let mut unique: Vec<Topic> = Vec::with_capacity(parents.len());
        for parent in parents {
            if !unique.contains(parent) {
                unique.push((*parent).clone());
            }
        }
        Self {
            node: Arc::new(TopicNode {
                id,
                name: name.into(),
                parents: unique,
            }),
        }
    }

    /// Creates a direct subtopic of `self`.
    pub fn subtopic(
        &self,
        name: impl Into<Arc<str>>,
    ) -> Self {
        Self::with_parents(name, &[self])
    }

    pub fn id(&self) -> u64 {
        self.node.id
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// Direct supertopics.
    pub fn parents(&self) -> &[Topic] {
        &self.node.parents
    }

    /// `true` if `self` is `other` or descends from it.
    ///
    /// Reflexive and transitive. A parent always exists before its children,
    /// so its id is strictly smaller; that prunes the walk. Each ancestor is
    /// visited at most once.
    pub fn is_subtopic_of(
        &self,
        other: &Topic,
    ) -> bool {
        if self == other {
            return true;
        }
        if other.id() > self.id() {
            return false;
        }

        let mut seen = HashSet::new();
        let mut stack: Vec<&Topic> = self.node.parents.iter().collect();
        while let Some(topic) = stack.pop() {
            if topic == other {
                return true;
            }
            if topic.id() < other.id() || !seen.insert(topic.id()) {
                continue;
            }
            stack.extend(topic.node.parents.iter());
        }
        false
    }

    /// `true` if `other` is `self` or descends from it.
    pub fn is_supertopic_of(
        &self,
        other: &Topic,
    ) -> bool {
        other.is_subtopic_of(self)
    }

    /// Every strict supertopic, nearest first, each reported once.
    pub fn ancestors(&self) -> Vec<Topic> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut frontier: Vec<Topic> = self.node.parents.clone();

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for topic in frontier {
                if seen.insert(topic.id()) {
                    next.extend(topic.node.parents.iter().cloned());
                    out.push(topic);
                }
            }
            frontier = next;
        }

        out
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl PartialEq for Topic {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.node.id == other.node.id
    }
}

impl Eq for Topic {}

impl Hash for Topic {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.node.id.hash(state);
    }
}

impl PartialOrd for Topic {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Topic {
    fn cmp(
        &self,
        other: &Self,
    ) -> CmpOrdering {
        self.node.id.cmp(&other.node.id)
    }
}

impl fmt::Debug for Topic {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Topic({}#{})", self.node.name, self.node.id)
    }
}

impl fmt::Display for Topic {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.node.name)
    }
}
