//! Discovery tree - the pre-resolved hierarchy the engine runs over
//!
//! Discovery itself (walking directories, registering test functions) happens
//! outside the engine. It hands over an arena of entries plus an ordered list
//! of test files; each file carries a loader producing its test cases.

use crate::error::LoadError;
use crate::handle::TestHandle;
use crate::modifier::{Modifier, ModifierChain};
use crate::types::TypeRef;
use crate::value::RaisedError;
use std::fmt;
use std::sync::Arc;

/// Index of an entry in a [`DiscoveryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

#[derive(Debug, Clone)]
pub struct Entry {
    name: String,
    parent: Option<EntryId>,
    kind: EntryKind,
    depth: usize,
}

impl Entry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<EntryId> {
        self.parent
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Body of a test unit.
pub type TestBody = Arc<dyn Fn(&mut TestHandle) -> Result<(), RaisedError> + Send + Sync>;

type Loader = Arc<dyn Fn() -> Result<Vec<TestCase>, LoadError> + Send + Sync>;

/// Descriptor of one runnable unit.
#[derive(Clone)]
pub struct TestCase {
    name: String,
    modifiers: ModifierChain,
    body: TestBody,
}

impl TestCase {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut TestHandle) -> Result<(), RaisedError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            modifiers: ModifierChain::default(),
            body: Arc::new(body),
        }
    }

    /// Attach a modifier. Modifiers attached first are the outermost.
    pub fn with(mut self, modifier: Modifier) -> Self {
        let mut modifiers: Vec<Modifier> = self.modifiers.iter().cloned().collect();
        modifiers.push(modifier);
        self.modifiers = ModifierChain::new(modifiers);
        self
    }

    pub fn revert(self) -> Self {
        self.with(Modifier::Revert)
    }

    pub fn raising(self, kind: &TypeRef) -> Self {
        self.with(Modifier::raising(kind))
    }

    pub fn skip(self) -> Self {
        self.with(Modifier::Skip(None))
    }

    pub fn skip_if(self, condition: bool) -> Self {
        self.with(Modifier::SkipIf(condition))
    }

    pub fn informal(self) -> Self {
        self.with(Modifier::Informal)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modifiers(&self) -> &ModifierChain {
        &self.modifiers
    }

    pub(crate) fn body(&self) -> &TestBody {
        &self.body
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("modifiers", &self.modifiers)
            .finish_non_exhaustive()
    }
}

/// A discovered file and the loader for its cases.
#[derive(Clone)]
pub struct TestFile {
    entry: EntryId,
    loader: Loader,
}

impl TestFile {
    pub fn entry(&self) -> EntryId {
        self.entry
    }

    pub fn load(&self) -> Result<Vec<TestCase>, LoadError> {
        (self.loader)()
    }
}

impl fmt::Debug for TestFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestFile")
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}

/// Ordered hierarchy of directories and test files.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryTree {
    entries: Vec<Entry>,
    files: Vec<TestFile>,
}

impl DiscoveryTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_entry(&mut self, parent: Option<EntryId>, name: String, kind: EntryKind) -> EntryId {
        let depth = parent.map_or(0, |p| self.entries[p.0].depth + 1);
        self.entries.push(Entry {
            name,
            parent,
            kind,
            depth,
        });
        EntryId(self.entries.len() - 1)
    }

    pub fn directory(&mut self, parent: Option<EntryId>, name: impl Into<String>) -> EntryId {
        self.push_entry(parent, name.into(), EntryKind::Directory)
    }

    /// Register a file whose cases are already known.
    pub fn file(
        &mut self,
        parent: Option<EntryId>,
        name: impl Into<String>,
        cases: Vec<TestCase>,
    ) -> EntryId {
        self.file_with_loader(parent, name, move || Ok(cases.clone()))
    }

    /// Register a file whose cases are produced when the engine loads it.
    pub fn file_with_loader<F>(
        &mut self,
        parent: Option<EntryId>,
        name: impl Into<String>,
        loader: F,
    ) -> EntryId
    where
        F: Fn() -> Result<Vec<TestCase>, LoadError> + Send + Sync + 'static,
    {
        let entry = self.push_entry(parent, name.into(), EntryKind::File);
        self.files.push(TestFile {
            entry,
            loader: Arc::new(loader),
        });
        entry
    }

    pub fn entry(&self, id: EntryId) -> &Entry {
        &self.entries[id.0]
    }

    pub fn files(&self) -> &[TestFile] {
        &self.files
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Ancestors of `id`, root first.
    pub fn iter_parents(&self, id: EntryId) -> impl Iterator<Item = EntryId> {
        let mut parents = Vec::new();
        let mut current = self.entry(id).parent;
        while let Some(parent) = current {
            parents.push(parent);
            current = self.entry(parent).parent;
        }
        parents.into_iter().rev()
    }

    /// Slash separated path of `id`.
    pub fn path(&self, id: EntryId) -> String {
        let mut parts: Vec<&str> = self
            .iter_parents(id)
            .map(|parent| self.entry(parent).name())
            .collect();
        parts.push(self.entry(id).name());
        parts.join("/")
    }

    /// Render one entry line into `buffer`, using `name` in place of the
    /// entry's own name when given.
    pub fn render_into(&self, id: EntryId, buffer: &mut String, name: Option<&str>) {
        let entry = self.entry(id);
        push_line(buffer);
        buffer.push_str(&"  ".repeat(entry.depth));
        buffer.push_str(name.unwrap_or(&entry.name));
        if entry.kind == EntryKind::Directory {
            buffer.push('/');
        }
    }

    /// Render a line nested under file `id`.
    pub fn render_case_into(&self, id: EntryId, buffer: &mut String, text: &str, is_last: bool) {
        let entry = self.entry(id);
        push_line(buffer);
        buffer.push_str(&"  ".repeat(entry.depth + 1));
        buffer.push_str(if is_last { "└─ " } else { "├─ " });
        buffer.push_str(text);
    }
}

fn push_line(buffer: &mut String) {
    if !buffer.is_empty() {
        buffer.push('\n');
    }
}

/// A file as seen after its load attempt.
#[derive(Debug, Clone, Copy)]
pub struct LoadedFile<'a> {
    tree: &'a DiscoveryTree,
    entry: EntryId,
    load_error: Option<&'a LoadError>,
}

impl<'a> LoadedFile<'a> {
    pub(crate) fn new(
        tree: &'a DiscoveryTree,
        entry: EntryId,
        load_error: Option<&'a LoadError>,
    ) -> Self {
        Self {
            tree,
            entry,
            load_error,
        }
    }

    pub fn tree(&self) -> &'a DiscoveryTree {
        self.tree
    }

    pub fn entry(&self) -> EntryId {
        self.entry
    }

    pub fn name(&self) -> &'a str {
        self.tree.entry(self.entry).name()
    }

    pub fn path(&self) -> String {
        self.tree.path(self.entry)
    }

    pub fn is_loaded_with_failure(&self) -> bool {
        self.load_error.is_some()
    }

    pub fn load_error(&self) -> Option<&'a LoadError> {
        self.load_error
    }

    pub fn iter_parents(&self) -> impl Iterator<Item = EntryId> {
        self.tree.iter_parents(self.entry)
    }
}
