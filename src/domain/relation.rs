//! Typed relations between tasks
//!
//! A stored relation carries one flag per [`RelationKind`], mirroring how the
//! surrounding application records them. Only relations with exactly one flag
//! set are meaningful for scheduling; everything else is kept on disk but
//! ignored by the graph.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::id::TaskId;

#[derive(Debug, Error, PartialEq)]
pub enum RelationKindError {
    #[error("Unknown relation kind '{0}' (expected one of: hierarchy, follows, relates, duplicates, blocks, includes, requires)")]
    Unknown(String),
}

/// Kind of relation between two tasks
///
/// For `Follows`, `from` is scheduled after `to`. For `Hierarchy`, `from` is
/// the parent and `to` the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Hierarchy,
    Follows,
    Relates,
    Duplicates,
    Blocks,
    Includes,
    Requires,
}

impl RelationKind {
    /// All kinds, in storage column order
    pub const ALL: [RelationKind; 7] = [
        RelationKind::Hierarchy,
        RelationKind::Follows,
        RelationKind::Relates,
        RelationKind::Duplicates,
        RelationKind::Blocks,
        RelationKind::Includes,
        RelationKind::Requires,
    ];

    /// Returns the storage/display label
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Hierarchy => "hierarchy",
            RelationKind::Follows => "follows",
            RelationKind::Relates => "relates",
            RelationKind::Duplicates => "duplicates",
            RelationKind::Blocks => "blocks",
            RelationKind::Includes => "includes",
            RelationKind::Requires => "requires",
        }
    }

    /// Returns true if schedule changes travel along this kind
    pub fn affects_schedule(&self) -> bool {
        matches!(self, RelationKind::Hierarchy | RelationKind::Follows)
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RelationKind {
    type Err = RelationKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        RelationKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or(RelationKindError::Unknown(s))
    }
}

/// Set of kind flags recorded on a relation
///
/// Serialized as a list of kind names. A bare string is accepted when
/// reading, for hand-edited files: `"kinds": "follows"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KindSet(u8);

impl KindSet {
    /// Creates an empty set
    pub fn empty() -> Self {
        Self(0)
    }

    /// Creates a set holding one kind
    pub fn single(kind: RelationKind) -> Self {
        Self(kind.bit())
    }

    /// Adds a kind. Returns true if it was not present.
    pub fn insert(&mut self, kind: RelationKind) -> bool {
        let had = self.contains(kind);
        self.0 |= kind.bit();
        !had
    }

    /// Returns true if the kind flag is set
    pub fn contains(&self, kind: RelationKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Number of flags set
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Returns true if no flag is set
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates over the set kinds in storage order
    pub fn iter(&self) -> impl Iterator<Item = RelationKind> + '_ {
        RelationKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl FromIterator<RelationKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = RelationKind>>(iter: I) -> Self {
        let mut set = KindSet::empty();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl fmt::Display for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("(none)");
        }
        let names: Vec<_> = self.iter().map(|k| k.as_str()).collect();
        f.write_str(&names.join("+"))
    }
}

impl Serialize for KindSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let kinds: Vec<_> = self.iter().collect();
        kinds.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for KindSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{SeqAccess, Visitor};

        struct KindSetVisitor;

        impl<'de> Visitor<'de> for KindSetVisitor {
            type Value = KindSet;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a relation kind or a sequence of relation kinds")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let kind: RelationKind = v.parse().map_err(E::custom)?;
                Ok(KindSet::single(kind))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut set = KindSet::empty();
                while let Some(name) = seq.next_element::<String>()? {
                    let kind: RelationKind = name.parse().map_err(serde::de::Error::custom)?;
                    set.insert(kind);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_any(KindSetVisitor)
    }
}

/// A directed, typed relation between two tasks
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub from: TaskId,
    pub to: TaskId,
    #[serde(default)]
    pub kinds: KindSet,
}

impl Relation {
    /// Creates a well-formed relation of one kind
    pub fn new(from: TaskId, to: TaskId, kind: RelationKind) -> Self {
        Self {
            from,
            to,
            kinds: KindSet::single(kind),
        }
    }

    /// `follower` is scheduled after `followed`
    pub fn follows(follower: TaskId, followed: TaskId) -> Self {
        Self::new(follower, followed, RelationKind::Follows)
    }

    /// `parent` contains `child`
    pub fn hierarchy(parent: TaskId, child: TaskId) -> Self {
        Self::new(parent, child, RelationKind::Hierarchy)
    }

    /// Returns the kind if exactly one flag is set
    pub fn kind(&self) -> Option<RelationKind> {
        if self.kinds.len() == 1 {
            self.kinds.iter().next()
        } else {
            None
        }
    }

    /// Returns true if the relation has exactly one kind
    pub fn is_well_formed(&self) -> bool {
        self.kind().is_some()
    }

    /// Returns true if the task is either endpoint
    pub fn touches(&self, task: &TaskId) -> bool {
        &self.from == task || &self.to == task
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.from, self.kinds, self.to)
    }
}
