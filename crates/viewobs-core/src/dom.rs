//! In-memory element tree with a small CSS selector subset.
//!
//! Headless hosts and tests need something that behaves like a DOM subtree:
//! elements with a tag, an id, classes, and a parent, and a `closest` lookup
//! driven by a selector string. [`DomTree`] is that, and nothing more: there is
//! no layout, no attributes beyond id/class, and no text.
//!
//! # Selector subset
//!
//! | Form | Example |
//! |------|---------|
//! | Type | `div` (ASCII case-insensitive) |
//! | Universal | `*` |
//! | Id | `#main` |
//! | Class | `.ancestor` |
//! | Compound | `section.scroller#feed` |
//! | Descendant | `.page .scroller` |
//! | List | `.a, #b` |
//!
//! Other combinators (`>`, `+`, `~`), attribute selectors, and pseudo-classes
//! are rejected with a [`SelectorError`]. Through [`ObservedElement::closest`]
//! a rejected selector simply matches nothing.
//!
//! # Invariants
//!
//! 1. Every node has at most one parent; `append_child` re-parents.
//! 2. A node is never its own ancestor (appending an ancestor under one of
//!    its descendants is ignored).
//! 3. `NodeRef` equality is identity: same tree, same node.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::element::ObservedElement;

/// Index of a node inside its [`DomTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Raw index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug)]
struct NodeData {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    parent: Option<NodeId>,
}

/// Arena of elements shared through `Rc`.
#[derive(Debug, Default)]
pub struct DomTree {
    nodes: RefCell<Vec<NodeData>>,
    by_id: RefCell<AHashMap<String, NodeId>>,
}

impl DomTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Create a detached element with the given tag name.
    pub fn create_element(self: &Rc<Self>, tag: &str) -> NodeRef {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId(nodes.len() as u32);
        nodes.push(NodeData {
            tag: tag.to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            parent: None,
        });
        NodeRef {
            tree: Rc::clone(self),
            id,
        }
    }

    /// Look up an element by its id attribute.
    #[must_use]
    pub fn get_element_by_id(self: &Rc<Self>, id: &str) -> Option<NodeRef> {
        self.by_id.borrow().get(id).map(|&node| NodeRef {
            tree: Rc::clone(self),
            id: node,
        })
    }

    /// Number of elements ever created in this tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    /// Whether the tree has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow()[node.0 as usize].parent
    }
}

/// Handle to one element of a [`DomTree`].
#[derive(Clone)]
pub struct NodeRef {
    tree: Rc<DomTree>,
    id: NodeId,
}

impl NodeRef {
    /// The node's index in its tree.
    #[must_use]
    pub fn node_id(&self) -> NodeId {
        self.id
    }

    /// Lowercased tag name.
    #[must_use]
    pub fn tag_name(&self) -> String {
        self.with_data(|data| data.tag.clone())
    }

    /// The id attribute, if set.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.with_data(|data| data.id.clone())
    }

    /// Whether the element carries `class`.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.with_data(|data| data.classes.iter().any(|c| c == class))
    }

    /// Builder form of [`set_id`](Self::set_id).
    #[must_use]
    pub fn with_id(self, id: &str) -> Self {
        self.set_id(id);
        self
    }

    /// Builder form of [`add_class`](Self::add_class).
    #[must_use]
    pub fn with_class(self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    /// Set (or replace) the id attribute.
    pub fn set_id(&self, id: &str) {
        let previous = {
            let mut nodes = self.tree.nodes.borrow_mut();
            nodes[self.index()].id.replace(id.to_owned())
        };
        let mut by_id = self.tree.by_id.borrow_mut();
        if let Some(previous) = previous
            && by_id.get(&previous) == Some(&self.id)
        {
            by_id.remove(&previous);
        }
        by_id.entry(id.to_owned()).or_insert(self.id);
    }

    /// Add a class if not already present.
    pub fn add_class(&self, class: &str) {
        let mut nodes = self.tree.nodes.borrow_mut();
        let classes = &mut nodes[self.index()].classes;
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_owned());
        }
    }

    /// Remove a class if present.
    pub fn remove_class(&self, class: &str) {
        let mut nodes = self.tree.nodes.borrow_mut();
        nodes[self.index()].classes.retain(|c| c != class);
    }

    /// Append `child` under this element, detaching it from any previous
    /// parent. Ignored for nodes of another tree and for cycles.
    pub fn append_child(&self, child: &NodeRef) {
        if !Rc::ptr_eq(&self.tree, &child.tree) {
            debug_assert!(false, "append_child across trees");
            return;
        }
        if child.is_inclusive_ancestor_of(self) {
            return;
        }
        self.tree.nodes.borrow_mut()[child.index()].parent = Some(self.id);
    }

    /// Detach this element from its parent.
    pub fn remove(&self) {
        self.tree.nodes.borrow_mut()[self.index()].parent = None;
    }

    /// The parent element, if attached.
    #[must_use]
    pub fn parent(&self) -> Option<NodeRef> {
        self.tree.parent_of(self.id).map(|id| NodeRef {
            tree: Rc::clone(&self.tree),
            id,
        })
    }

    /// Whether this element matches `selector`. Unsupported selectors never
    /// match.
    #[must_use]
    pub fn matches(&self, selector: &str) -> bool {
        Selector::parse(selector).is_ok_and(|sel| sel.matches(self))
    }

    fn is_inclusive_ancestor_of(&self, other: &NodeRef) -> bool {
        let mut cursor = Some(other.id);
        while let Some(node) = cursor {
            if node == self.id {
                return true;
            }
            cursor = self.tree.parent_of(node);
        }
        false
    }

    fn index(&self) -> usize {
        self.id.0 as usize
    }

    fn with_data<R>(&self, f: impl FnOnce(&NodeData) -> R) -> R {
        f(&self.tree.nodes.borrow()[self.index()])
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.tree, &other.tree) && self.id == other.id
    }
}

impl Eq for NodeRef {}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_data(|data| {
            f.write_str(&data.tag)?;
            if let Some(id) = &data.id {
                write!(f, "#{id}")?;
            }
            for class in &data.classes {
                write!(f, ".{class}")?;
            }
            Ok(())
        })
    }
}

impl ObservedElement for NodeRef {
    fn closest(&self, selector: &str) -> Option<Self> {
        let selector = match Selector::parse(selector) {
            Ok(selector) => selector,
            Err(_err) => {
                crate::logging::debug!(error = %_err, "unsupported selector");
                return None;
            }
        };
        let mut cursor = Some(self.clone());
        while let Some(node) = cursor {
            if selector.matches(&node) {
                return Some(node);
            }
            cursor = node.parent();
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// Why a selector string was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// Empty selector or empty entry in a selector list.
    Empty,
    /// `.` or `#` without a following name.
    MissingName { position: usize },
    /// A character outside the supported subset (`>`, `+`, `~`, `[`, `:`).
    Unsupported { character: char, position: usize },
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty selector"),
            Self::MissingName { position } => {
                write!(f, "expected a name after `.` or `#` at byte {position}")
            }
            Self::Unsupported {
                character,
                position,
            } => write!(f, "unsupported `{character}` at byte {position}"),
        }
    }
}

impl std::error::Error for SelectorError {}

#[derive(Debug, Clone, PartialEq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn matches(&self, data: &NodeData) -> bool {
        if let Some(tag) = &self.tag
            && !tag.eq_ignore_ascii_case(&data.tag)
        {
            return false;
        }
        if let Some(id) = &self.id
            && data.id.as_deref() != Some(id.as_str())
        {
            return false;
        }
        self.classes
            .iter()
            .all(|class| data.classes.iter().any(|c| c == class))
    }
}

/// Compounds joined by descendant combinators, outermost first.
#[derive(Debug, Clone, PartialEq)]
struct Complex {
    compounds: Vec<Compound>,
}

impl Complex {
    fn matches(&self, node: &NodeRef) -> bool {
        let Some((subject, outer)) = self.compounds.split_last() else {
            return false;
        };
        if !node.with_data(|data| subject.matches(data)) {
            return false;
        }
        // Nearest-first matching is exact when every combinator is descendant.
        let mut cursor = node.parent();
        'compounds: for compound in outer.iter().rev() {
            while let Some(current) = cursor {
                cursor = current.parent();
                if current.with_data(|data| compound.matches(data)) {
                    continue 'compounds;
                }
            }
            return false;
        }
        true
    }
}

/// Parsed selector list.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

impl Selector {
    /// Parse a selector in the supported subset.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError`] for empty input or anything outside the
    /// type/id/class/compound/descendant/list subset.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut alternatives = Vec::new();
        let mut offset = 0;
        for part in input.split(',') {
            alternatives.push(parse_complex(part, offset)?);
            offset += part.len() + 1;
        }
        Ok(Self { alternatives })
    }

    /// Whether `node` matches any alternative.
    #[must_use]
    pub fn matches(&self, node: &NodeRef) -> bool {
        self.alternatives.iter().any(|c| c.matches(node))
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn parse_complex(input: &str, base: usize) -> Result<Complex, SelectorError> {
    let mut compounds = Vec::new();
    let mut start = None;
    let end = std::iter::once((input.len(), ' '));
    for (pos, c) in input.char_indices().chain(end) {
        match (c.is_ascii_whitespace(), start) {
            (true, Some(from)) => {
                compounds.push(parse_compound(&input[from..pos], base + from)?);
                start = None;
            }
            (false, None) => start = Some(pos),
            _ => {}
        }
    }
    if compounds.is_empty() {
        return Err(SelectorError::Empty);
    }
    Ok(Complex { compounds })
}

fn parse_compound(input: &str, base: usize) -> Result<Compound, SelectorError> {
    if input.is_empty() {
        return Err(SelectorError::Empty);
    }
    let mut compound = Compound::default();
    let mut chars = input.char_indices().peekable();

    if let Some(&(_, first)) = chars.peek() {
        if first == '*' {
            chars.next();
        } else if is_name_char(first) {
            let mut tag = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if !is_name_char(c) {
                    break;
                }
                tag.push(c);
                chars.next();
            }
            compound.tag = Some(tag);
        }
    }

    while let Some((pos, c)) = chars.next() {
        let sigil = match c {
            '.' | '#' => c,
            other => {
                return Err(SelectorError::Unsupported {
                    character: other,
                    position: base + pos,
                });
            }
        };
        let mut name = String::new();
        while let Some(&(_, c)) = chars.peek() {
            if !is_name_char(c) {
                break;
            }
            name.push(c);
            chars.next();
        }
        if name.is_empty() {
            return Err(SelectorError::MissingName {
                position: base + pos,
            });
        }
        if sigil == '.' {
            compound.classes.push(name);
        } else {
            compound.id = Some(name);
        }
    }
    Ok(compound)
}
