//! Render nodes.
//!
//! Turns the element AST plus a scope into virtual nodes. Every block
//! render pushes a fresh scope layer, drives its directives through the
//! hook phases, and produces one vnode; loops and slot passthrough emit
//! several, and a suppressed branch emits none.

use crate::ast::{BlockKind, BlockNode, TemplateNode};
use crate::component::{lookup_or_create_child, render_instance, InstanceRef, Recipe};
use crate::directive::{Control, DirectiveHooks, HookCx, PropsTarget};
use crate::error::Result;
use crate::html::normalize_boolean_attribute;
use crate::scope::Scope;
use crate::value::{Callable, Value};
use crate::vdom::{Properties, VElement, VNode};
use std::collections::BTreeMap;
use std::rc::Rc;

/// A block's contribution to its parent's child list.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Empty,
    Node(VNode),
    Fragment(Vec<VNode>),
}

impl Rendered {
    pub fn into_vec(self) -> Vec<VNode> {
        match self {
            Rendered::Empty => Vec::new(),
            Rendered::Node(vnode) => vec![vnode],
            Rendered::Fragment(vnodes) => vnodes,
        }
    }

    pub fn from_vec(mut vnodes: Vec<VNode>) -> Rendered {
        match vnodes.len() {
            0 => Rendered::Empty,
            1 => Rendered::Node(vnodes.remove(0)),
            _ => Rendered::Fragment(vnodes),
        }
    }
}

/// Per-invocation rendering options; the loop directive re-enters its own
/// block with `skip_loop` set and an `@<index>` id suffix.
#[derive(Debug, Clone, Default)]
pub struct RenderOpts {
    pub skip_loop: bool,
    pub id_suffix: Option<String>,
}

pub fn render_node(node: &TemplateNode, host: &InstanceRef, scope: &Rc<Scope>) -> Result<Rendered> {
    match node {
        TemplateNode::Text(text) => Ok(Rendered::Node(VNode::text(text.clone()))),
        TemplateNode::Interpolation(expression) => {
            let value = expression.eval(host, scope);
            Ok(Rendered::Node(VNode::text(value.display_string())))
        }
        TemplateNode::Block(block) => render_block(block, host, scope, &RenderOpts::default()),
    }
}

pub fn render_block(
    block: &Rc<BlockNode>,
    host: &InstanceRef,
    parent_scope: &Rc<Scope>,
    opts: &RenderOpts,
) -> Result<Rendered> {
    match &block.kind {
        BlockKind::Element => render_element(block, host, parent_scope, opts),
        BlockKind::Component { recipe, id_seed } => {
            render_component(block, recipe, id_seed, host, parent_scope, opts)
        }
        BlockKind::Slot { name } => render_slot(block, name, host, parent_scope, opts),
    }
}

/// Run one hook phase across every directive on the block. All hooks in
/// the phase run; the first replacement wins.
fn run_phase<F>(block: &Rc<BlockNode>, mut hook: F) -> Result<Option<Vec<VNode>>>
where
    F: FnMut(&Rc<dyn DirectiveHooks>) -> Result<Control>,
{
    let mut replacement = None;
    for directive in &block.directives {
        if let Control::Replace(vnodes) = hook(directive)? {
            if replacement.is_none() {
                replacement = Some(vnodes);
            }
        }
    }
    Ok(replacement)
}

fn render_children(
    block: &Rc<BlockNode>,
    host: &InstanceRef,
    scope: &Rc<Scope>,
) -> Result<Vec<VNode>> {
    let mut children = Vec::new();
    for child in block.children.borrow().iter() {
        match render_node(child, host, scope)? {
            Rendered::Empty => {}
            Rendered::Node(vnode) => children.push(vnode),
            Rendered::Fragment(vnodes) => children.extend(vnodes),
        }
    }
    Ok(children)
}

// ═══════════════════════════════════════════════════════════════════════════════
// ELEMENT
// ═══════════════════════════════════════════════════════════════════════════════

fn render_element(
    block: &Rc<BlockNode>,
    host: &InstanceRef,
    parent_scope: &Rc<Scope>,
    opts: &RenderOpts,
) -> Result<Rendered> {
    let scope = Scope::child(parent_scope);
    let cx = HookCx {
        host,
        scope: &scope,
        block,
    };

    if let Some(vnodes) = run_phase(block, |d| {
        if opts.skip_loop && d.is_loop() {
            Ok(Control::Continue)
        } else {
            d.initialised(&cx)
        }
    })? {
        return Ok(Rendered::from_vec(vnodes));
    }

    let mut properties = Properties::default();
    for (name, value) in &block.attributes {
        if let Some(normalized) = normalize_boolean_attribute(&block.tag, name, value) {
            properties.attributes.insert(name.clone(), normalized);
        }
    }
    for (name, expression) in &block.events {
        let event = name.trim_start_matches("on").to_string();
        match expression.eval(host, &scope) {
            Value::Function(handler) => {
                properties.handlers.insert(event, handler);
            }
            other => log::warn!(
                "`{}` expression `{}` is {}, not a function; dropped",
                name,
                expression.source,
                other.type_name()
            ),
        }
    }

    if let Some(vnodes) = run_phase(block, |d| {
        d.properties_populated(&cx, &mut PropsTarget::Element(&mut properties))
    })? {
        return Ok(Rendered::from_vec(vnodes));
    }

    let mut children = render_children(block, host, &scope)?;

    if let Some(vnodes) = run_phase(block, |d| d.children_rendered(&cx, &mut children))? {
        return Ok(Rendered::from_vec(vnodes));
    }

    Ok(Rendered::Node(VNode::Element(VElement {
        tag: block.tag.clone(),
        properties,
        children,
        key: None,
    })))
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT REFERENCE
// ═══════════════════════════════════════════════════════════════════════════════

fn render_component(
    block: &Rc<BlockNode>,
    recipe: &Rc<Recipe>,
    id_seed: &str,
    host: &InstanceRef,
    parent_scope: &Rc<Scope>,
    opts: &RenderOpts,
) -> Result<Rendered> {
    let scope = Scope::child(parent_scope);
    let cx = HookCx {
        host,
        scope: &scope,
        block,
    };

    if let Some(vnodes) = run_phase(block, |d| {
        if opts.skip_loop && d.is_loop() {
            Ok(Control::Continue)
        } else {
            d.initialised(&cx)
        }
    })? {
        return Ok(Rendered::from_vec(vnodes));
    }

    let mut events: BTreeMap<String, Callable> = BTreeMap::new();
    if let Some(vnodes) = run_phase(block, |d| d.events_prepared(&cx, &mut events))? {
        return Ok(Rendered::from_vec(vnodes));
    }

    // static attributes pass as literal string props; @bind overrides with
    // an evaluated value
    let mut props: BTreeMap<String, Value> = block
        .attributes
        .iter()
        .map(|(name, value)| (name.clone(), Value::Str(value.clone())))
        .collect();

    if let Some(vnodes) = run_phase(block, |d| {
        d.properties_populated(&cx, &mut PropsTarget::Component(&mut props))
    })? {
        return Ok(Rendered::from_vec(vnodes));
    }

    // fill content renders in the host's own context, not the child's
    let mut children = render_children(block, host, &scope)?;

    if let Some(vnodes) = run_phase(block, |d| d.children_rendered(&cx, &mut children))? {
        return Ok(Rendered::from_vec(vnodes));
    }

    let stable_id = match &opts.id_suffix {
        Some(suffix) => format!("{}{}", id_seed, suffix),
        None => id_seed.to_string(),
    };
    let child = lookup_or_create_child(host, recipe, &stable_id);

    if let Some(vnodes) = run_phase(block, |d| d.component_prepared(&cx, &child))? {
        return Ok(Rendered::from_vec(vnodes));
    }

    // `.native` listeners attach to the child's root element, the rest to
    // its event emitter
    let mut native: Vec<(String, Callable)> = Vec::new();
    let mut listeners: BTreeMap<String, Callable> = BTreeMap::new();
    for (key, handler) in events {
        match key.strip_prefix("native:") {
            Some(event) => native.push((event.to_string(), handler)),
            None => {
                listeners.insert(key, handler);
            }
        }
    }

    let fills = partition_fills(children, recipe);

    let mut vnode = render_instance(&child, props, listeners, fills)?;
    if let Some(el) = vnode.as_element_mut() {
        el.key = Some(stable_id.clone());
        el.properties
            .attributes
            .insert("id".to_string(), stable_id.clone());
        for (event, handler) in native {
            el.properties.handlers.insert(event, handler);
        }
    }
    Ok(Rendered::Node(vnode))
}

/// Group rendered fill content by each vnode's `slot` attribute, keeping
/// only slot names the child recipe declares.
fn partition_fills(children: Vec<VNode>, recipe: &Recipe) -> BTreeMap<String, Vec<VNode>> {
    let mut fills: BTreeMap<String, Vec<VNode>> = BTreeMap::new();
    for child in children {
        let slot_name = child
            .as_element()
            .and_then(|el| el.attribute("slot"))
            .unwrap_or("default")
            .to_string();
        if recipe.slots.contains(&slot_name) {
            fills.entry(slot_name).or_default().push(child);
        } else {
            log::warn!(
                "Component `{}` declares no slot `{}`; fill dropped",
                recipe.name,
                slot_name
            );
        }
    }
    fills
}

// ═══════════════════════════════════════════════════════════════════════════════
// SLOT
// ═══════════════════════════════════════════════════════════════════════════════

fn render_slot(
    block: &Rc<BlockNode>,
    name: &str,
    host: &InstanceRef,
    parent_scope: &Rc<Scope>,
    opts: &RenderOpts,
) -> Result<Rendered> {
    let scope = Scope::child(parent_scope);
    let cx = HookCx {
        host,
        scope: &scope,
        block,
    };

    if let Some(vnodes) = run_phase(block, |d| {
        if opts.skip_loop && d.is_loop() {
            Ok(Control::Continue)
        } else {
            d.initialised(&cx)
        }
    })? {
        return Ok(Rendered::from_vec(vnodes));
    }

    // slot attributes besides `name` carry no meaning
    let mut scratch = Properties::default();
    if let Some(vnodes) = run_phase(block, |d| {
        d.properties_populated(&cx, &mut PropsTarget::Element(&mut scratch))
    })? {
        return Ok(Rendered::from_vec(vnodes));
    }

    let mut children = render_children(block, host, &scope)?;

    if let Some(vnodes) = run_phase(block, |d| d.children_rendered(&cx, &mut children))? {
        return Ok(Rendered::from_vec(vnodes));
    }

    // the fill supplied by the host wins over the declared default content
    let fill = host.borrow().fills.get(name).cloned();
    match fill {
        Some(vnodes) if !vnodes.is_empty() => Ok(Rendered::from_vec(vnodes)),
        _ => Ok(Rendered::from_vec(children)),
    }
}
