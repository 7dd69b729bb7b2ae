//! Element AST.
//!
//! The parse-time tree shared by every instance of a component type. A
//! block is an element, a component reference or a slot placeholder;
//! text and interpolation leaves sit between blocks. Parents are
//! non-owning back-references; children are built by the parser as tags
//! close and are never mutated afterwards.

use crate::component::Recipe;
use crate::directive::DirectiveHooks;
use crate::expr::Expression;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

#[derive(Debug, Clone)]
pub enum TemplateNode {
    Block(Rc<BlockNode>),
    Text(String),
    Interpolation(Expression),
}

#[derive(Debug)]
pub enum BlockKind {
    Element,
    Component {
        recipe: Rc<Recipe>,
        /// Deterministic per-recipe seed (`tag#n`); loop iterations append
        /// `@<index>` to it at render time.
        id_seed: String,
    },
    Slot {
        name: String,
    },
}

pub struct BlockNode {
    pub tag: String,
    /// Static attributes in template order. On a component reference these
    /// are the prop values.
    pub attributes: Vec<(String, String)>,
    /// Interactive event attributes, parsed as expressions.
    pub events: Vec<(String, Expression)>,
    pub directives: Vec<Rc<dyn DirectiveHooks>>,
    pub children: RefCell<Vec<TemplateNode>>,
    pub parent: RefCell<Weak<BlockNode>>,
    pub kind: BlockKind,
}

impl BlockNode {
    pub fn is_component(&self) -> bool {
        matches!(self.kind, BlockKind::Component { .. })
    }

    pub fn component_recipe(&self) -> Option<&Rc<Recipe>> {
        match &self.kind {
            BlockKind::Component { recipe, .. } => Some(recipe),
            _ => None,
        }
    }

    pub fn parent_block(&self) -> Option<Rc<BlockNode>> {
        self.parent.borrow().upgrade()
    }

    /// Position of `child` among this block's children.
    pub fn index_of(&self, child: &Rc<BlockNode>) -> Option<usize> {
        self.children.borrow().iter().position(|node| match node {
            TemplateNode::Block(b) => Rc::ptr_eq(b, child),
            _ => false,
        })
    }

    /// Attach `child` under this block, wiring the back-reference.
    pub fn push_child(self: &Rc<Self>, child: TemplateNode) {
        if let TemplateNode::Block(block) = &child {
            *block.parent.borrow_mut() = Rc::downgrade(self);
        }
        self.children.borrow_mut().push(child);
    }
}

impl std::fmt::Debug for BlockNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockNode")
            .field("tag", &self.tag)
            .field("kind", &self.kind)
            .field("attributes", &self.attributes)
            .field("directives", &self.directives.len())
            .field("children", &self.children.borrow().len())
            .finish()
    }
}
