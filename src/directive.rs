//! Directive system.
//!
//! Directives are parsed from `@command:target.param…` attributes and
//! attached to a block at compile time. The renderer drives every
//! directive on a block through five phases in a fixed order:
//!
//!   1. `initialised`          structural inclusion, exclusion, loops
//!   2. `events_prepared`      component blocks only, fills the event map
//!   3. `properties_populated` mutates the in-progress property map
//!   4. `children_rendered`    observes the rendered child list
//!   5. `component_prepared`   component blocks only, observes the child
//!
//! Any hook may replace the block's contribution with an explicit vnode
//! list (empty meaning "render nothing"), which ends the block's own
//! rendering. The built-in commands form a closed set selected by
//! exhaustive match; custom commands come in through registered
//! factories.

use crate::ast::BlockNode;
use crate::component::{set_data_path, InstanceRef};
use crate::error::{
    Result, WeftError, ERR_DIR_MODEL_PATH, ERR_DIR_MODEL_REACTIVE, ERR_DIR_ORPHAN_BRANCH,
    ERR_DIR_ROOT_STRUCTURAL, ERR_PARSE_BAD_DIRECTIVE,
};
use crate::expr::{is_valid_identifier, Expression};
use crate::html::normalize_boolean_attribute;
use crate::render::{render_block, RenderOpts};
use crate::scope::Scope;
use crate::value::{Callable, Value};
use crate::vdom::{Properties, VNode};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

// ═══════════════════════════════════════════════════════════════════════════════
// HOOK PROTOCOL
// ═══════════════════════════════════════════════════════════════════════════════

/// Raw pieces of one `@command:target.param…` attribute.
#[derive(Debug, Clone)]
pub struct DirectiveSpec {
    pub command: String,
    pub target: String,
    pub params: Vec<String>,
    pub source: String,
}

/// Outcome of one hook invocation.
pub enum Control {
    Continue,
    /// Replace the block's contribution with these vnodes and stop.
    Replace(Vec<VNode>),
}

/// Per-invocation context shared by every hook.
pub struct HookCx<'a> {
    pub host: &'a InstanceRef,
    pub scope: &'a Rc<Scope>,
    pub block: &'a Rc<BlockNode>,
}

/// Phase-3 mutation target: string attributes on a plain element, typed
/// prop values on a component reference.
pub enum PropsTarget<'a> {
    Element(&'a mut Properties),
    Component(&'a mut BTreeMap<String, Value>),
}

/// Branch bookkeeping for `if`/`elif`/`else` sibling chains. The truth
/// value is stashed on the directive instance for the current render pass
/// so later siblings can scan backward over it.
pub struct BranchState {
    pub role: BranchRole,
    pub matched: Cell<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchRole {
    If,
    Elif,
    Else,
}

pub trait DirectiveHooks {
    fn initialised(&self, cx: &HookCx) -> Result<Control> {
        let _ = cx;
        Ok(Control::Continue)
    }

    fn events_prepared(
        &self,
        cx: &HookCx,
        events: &mut BTreeMap<String, Callable>,
    ) -> Result<Control> {
        let _ = (cx, events);
        Ok(Control::Continue)
    }

    fn properties_populated(&self, cx: &HookCx, target: &mut PropsTarget) -> Result<Control> {
        let _ = (cx, target);
        Ok(Control::Continue)
    }

    fn children_rendered(&self, cx: &HookCx, children: &mut Vec<VNode>) -> Result<Control> {
        let _ = (cx, children);
        Ok(Control::Continue)
    }

    fn component_prepared(&self, cx: &HookCx, child: &InstanceRef) -> Result<Control> {
        let _ = (cx, child);
        Ok(Control::Continue)
    }

    /// True for the loop directive; the renderer skips it when re-entering
    /// a block for a single iteration.
    fn is_loop(&self) -> bool {
        false
    }

    fn branch_state(&self) -> Option<&BranchState> {
        None
    }
}

/// Constructor for user-registered commands.
pub type DirectiveFactory = Rc<dyn Fn(DirectiveSpec) -> Result<Rc<dyn DirectiveHooks>>>;

// ═══════════════════════════════════════════════════════════════════════════════
// BUILT-IN SET
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    If,
    Elif,
    Else,
    For,
    Bind,
    On,
    Var,
    Show,
    Html,
    Model,
}

pub fn builtin_kind(command: &str) -> Option<DirectiveKind> {
    match command {
        "if" => Some(DirectiveKind::If),
        "elif" => Some(DirectiveKind::Elif),
        "else" => Some(DirectiveKind::Else),
        "for" => Some(DirectiveKind::For),
        "bind" => Some(DirectiveKind::Bind),
        "on" => Some(DirectiveKind::On),
        "var" => Some(DirectiveKind::Var),
        "show" => Some(DirectiveKind::Show),
        "html" => Some(DirectiveKind::Html),
        "model" => Some(DirectiveKind::Model),
        _ => None,
    }
}

/// Build a built-in directive from its parsed attribute pieces.
pub fn builtin(kind: DirectiveKind, spec: DirectiveSpec) -> Result<Rc<dyn DirectiveHooks>> {
    let directive: Rc<dyn DirectiveHooks> = match kind {
        DirectiveKind::If => Rc::new(IfDirective {
            expression: required_expression(&spec)?,
            state: BranchState {
                role: BranchRole::If,
                matched: Cell::new(false),
            },
        }),
        DirectiveKind::Elif => Rc::new(ElifDirective {
            expression: required_expression(&spec)?,
            state: BranchState {
                role: BranchRole::Elif,
                matched: Cell::new(false),
            },
        }),
        DirectiveKind::Else => Rc::new(ElseDirective {
            state: BranchState {
                role: BranchRole::Else,
                matched: Cell::new(false),
            },
        }),
        DirectiveKind::For => Rc::new(ForDirective {
            target: required_target(&spec)?,
            expression: required_expression(&spec)?,
        }),
        DirectiveKind::Bind => Rc::new(BindDirective {
            target: required_target(&spec)?,
            expression: required_expression(&spec)?,
        }),
        DirectiveKind::On => Rc::new(OnDirective {
            target: required_target(&spec)?,
            native: spec.params.iter().any(|p| p == "native"),
            expression: required_expression(&spec)?,
        }),
        DirectiveKind::Var => Rc::new(VarDirective {
            target: required_target(&spec)?,
            expression: required_expression(&spec)?,
        }),
        DirectiveKind::Show => Rc::new(ShowDirective {
            expression: required_expression(&spec)?,
        }),
        DirectiveKind::Html => Rc::new(HtmlDirective {
            expression: required_expression(&spec)?,
        }),
        DirectiveKind::Model => Rc::new(ModelDirective::build(&spec)?),
    };
    Ok(directive)
}

fn required_expression(spec: &DirectiveSpec) -> Result<Expression> {
    if spec.source.trim().is_empty() {
        return Err(WeftError::new(
            ERR_PARSE_BAD_DIRECTIVE,
            format!("Directive `@{}` requires an expression value", spec.command),
        ));
    }
    Expression::parse(&spec.source)
}

fn required_target(spec: &DirectiveSpec) -> Result<String> {
    if !is_valid_identifier(&spec.target) {
        return Err(WeftError::new(
            ERR_PARSE_BAD_DIRECTIVE,
            format!(
                "Directive `@{}` requires a target: @{}:name",
                spec.command, spec.command
            ),
        ));
    }
    Ok(spec.target.clone())
}

// ═══════════════════════════════════════════════════════════════════════════════
// BRANCH CHAIN (if / elif / else)
// ═══════════════════════════════════════════════════════════════════════════════

/// Scan backward from `block` over its element siblings to the chain's
/// `if`. Returns whether any earlier branch in the chain already matched.
fn earlier_branch_matched(block: &Rc<BlockNode>, command: &str) -> Result<bool> {
    let parent = block.parent_block().ok_or_else(|| {
        WeftError::new(
            ERR_DIR_ROOT_STRUCTURAL,
            format!("Cannot use `{}` on the template root", command),
        )
    })?;
    let position = parent.index_of(block).unwrap_or(0);

    let children = parent.children.borrow();
    for node in children[..position].iter().rev() {
        let sibling = match node {
            crate::ast::TemplateNode::Block(b) => b,
            _ => continue,
        };
        let state = sibling
            .directives
            .iter()
            .find_map(|directive| directive.branch_state());
        match state {
            Some(state) if state.matched.get() => return Ok(true),
            Some(state) if state.role == BranchRole::If => return Ok(false),
            Some(_) => continue,
            // a sibling without a branch directive breaks the chain
            None => break,
        }
    }
    Err(WeftError::new(
        ERR_DIR_ORPHAN_BRANCH,
        format!("`{}` has no preceding sibling `if`", command),
    ))
}

struct IfDirective {
    expression: Expression,
    state: BranchState,
}

impl DirectiveHooks for IfDirective {
    fn initialised(&self, cx: &HookCx) -> Result<Control> {
        let value = self.expression.eval(cx.host, cx.scope).truthy();
        self.state.matched.set(value);
        if value {
            Ok(Control::Continue)
        } else {
            Ok(Control::Replace(Vec::new()))
        }
    }

    fn branch_state(&self) -> Option<&BranchState> {
        Some(&self.state)
    }
}

struct ElifDirective {
    expression: Expression,
    state: BranchState,
}

impl DirectiveHooks for ElifDirective {
    fn initialised(&self, cx: &HookCx) -> Result<Control> {
        // the truth value is recorded even when an earlier branch wins, so
        // a later `else` sees the whole chain
        let value = self.expression.eval(cx.host, cx.scope).truthy();
        self.state.matched.set(value);

        if earlier_branch_matched(cx.block, "elif")? || !value {
            return Ok(Control::Replace(Vec::new()));
        }
        Ok(Control::Continue)
    }

    fn branch_state(&self) -> Option<&BranchState> {
        Some(&self.state)
    }
}

struct ElseDirective {
    state: BranchState,
}

impl DirectiveHooks for ElseDirective {
    fn initialised(&self, cx: &HookCx) -> Result<Control> {
        if earlier_branch_matched(cx.block, "else")? {
            self.state.matched.set(false);
            return Ok(Control::Replace(Vec::new()));
        }
        self.state.matched.set(true);
        Ok(Control::Continue)
    }

    fn branch_state(&self) -> Option<&BranchState> {
        Some(&self.state)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOOP
// ═══════════════════════════════════════════════════════════════════════════════

struct ForDirective {
    target: String,
    expression: Expression,
}

impl DirectiveHooks for ForDirective {
    fn initialised(&self, cx: &HookCx) -> Result<Control> {
        if cx.block.parent_block().is_none() {
            return Err(WeftError::new(
                ERR_DIR_ROOT_STRUCTURAL,
                "Cannot apply `for` to the template root",
            ));
        }

        let items = match self.expression.eval(cx.host, cx.scope) {
            Value::List(items) => items,
            // anything non-list renders the block once, untouched
            _ => return Ok(Control::Continue),
        };

        // elements lack a component id seed, so iteration keys carry the
        // loop site's tag and sibling position to keep two loops under one
        // parent distinguishable to a keyed differ
        let site = cx
            .block
            .parent_block()
            .and_then(|parent| parent.index_of(cx.block))
            .map(|position| format!("{}#{}", cx.block.tag, position))
            .unwrap_or_else(|| cx.block.tag.clone());

        let mut vnodes = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            let layer = Scope::child(cx.scope);
            layer.set(self.target.clone(), item);
            layer.set("$index", Value::Number(index as f64));

            let opts = RenderOpts {
                skip_loop: true,
                id_suffix: Some(format!("@{}", index)),
            };
            let rendered = render_block(cx.block, cx.host, &layer, &opts)?;
            for mut vnode in rendered.into_vec() {
                if let Some(el) = vnode.as_element_mut() {
                    if el.key.is_none() {
                        el.key = Some(format!("{}@{}", site, index));
                    }
                }
                vnodes.push(vnode);
            }
        }
        Ok(Control::Replace(vnodes))
    }

    fn is_loop(&self) -> bool {
        true
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTY DIRECTIVES
// ═══════════════════════════════════════════════════════════════════════════════

struct BindDirective {
    target: String,
    expression: Expression,
}

impl DirectiveHooks for BindDirective {
    fn properties_populated(&self, cx: &HookCx, target: &mut PropsTarget) -> Result<Control> {
        let value = self.expression.eval(cx.host, cx.scope);
        match target {
            PropsTarget::Element(properties) => {
                if self.target == "class" {
                    // a map of class name -> condition; truthy keys join
                    let classes = match &value {
                        Value::Object(map) => map
                            .iter()
                            .filter(|(_, v)| v.truthy())
                            .map(|(k, _)| k.as_str())
                            .collect::<Vec<_>>()
                            .join(" "),
                        other => other.display_string(),
                    };
                    properties.attributes.insert("class".to_string(), classes);
                } else if value.is_null() {
                    properties.attributes.remove(&self.target);
                } else {
                    // boolean attributes follow presence semantics, so a
                    // bound false must remove the attribute rather than
                    // stringify into a present `disabled="false"`
                    let rendered = value.display_string();
                    match normalize_boolean_attribute(&cx.block.tag, &self.target, &rendered) {
                        Some(normalized) => {
                            properties.attributes.insert(self.target.clone(), normalized);
                        }
                        None => {
                            properties.attributes.remove(&self.target);
                        }
                    }
                }
            }
            PropsTarget::Component(props) => {
                props.insert(self.target.clone(), value);
            }
        }
        Ok(Control::Continue)
    }
}

struct OnDirective {
    target: String,
    native: bool,
    expression: Expression,
}

impl DirectiveHooks for OnDirective {
    fn events_prepared(
        &self,
        cx: &HookCx,
        events: &mut BTreeMap<String, Callable>,
    ) -> Result<Control> {
        match self.expression.eval(cx.host, cx.scope) {
            Value::Function(handler) => {
                // `.native` handlers attach to the child's root element
                // rather than its event emitter
                let key = if self.native {
                    format!("native:{}", self.target)
                } else {
                    self.target.clone()
                };
                events.insert(key, handler);
            }
            other => log::warn!(
                "`@on:{}` expression `{}` is {}, not a function; dropped",
                self.target,
                self.expression.source,
                other.type_name()
            ),
        }
        Ok(Control::Continue)
    }

    fn properties_populated(&self, cx: &HookCx, target: &mut PropsTarget) -> Result<Control> {
        let properties = match target {
            PropsTarget::Element(properties) => properties,
            PropsTarget::Component(_) => return Ok(Control::Continue),
        };
        if !crate::html::is_event_attribute(&format!("on{}", self.target)) {
            log::warn!("`@on:{}` does not name a known event; dropped", self.target);
            return Ok(Control::Continue);
        }
        match self.expression.eval(cx.host, cx.scope) {
            Value::Function(handler) => {
                properties.handlers.insert(self.target.clone(), handler);
            }
            other => log::warn!(
                "`@on:{}` expression `{}` is {}, not a function; dropped",
                self.target,
                self.expression.source,
                other.type_name()
            ),
        }
        Ok(Control::Continue)
    }
}

struct VarDirective {
    target: String,
    expression: Expression,
}

impl DirectiveHooks for VarDirective {
    fn initialised(&self, cx: &HookCx) -> Result<Control> {
        let value = self.expression.eval(cx.host, cx.scope);
        cx.scope.set(self.target.clone(), value);
        Ok(Control::Continue)
    }
}

struct ShowDirective {
    expression: Expression,
}

impl DirectiveHooks for ShowDirective {
    fn properties_populated(&self, cx: &HookCx, target: &mut PropsTarget) -> Result<Control> {
        if let PropsTarget::Element(properties) = target {
            if self.expression.eval(cx.host, cx.scope).truthy() {
                properties.style.remove("display");
            } else {
                properties
                    .style
                    .insert("display".to_string(), "none".to_string());
            }
        }
        Ok(Control::Continue)
    }
}

struct HtmlDirective {
    expression: Expression,
}

impl DirectiveHooks for HtmlDirective {
    fn properties_populated(&self, cx: &HookCx, target: &mut PropsTarget) -> Result<Control> {
        if let PropsTarget::Element(properties) = target {
            let value = self.expression.eval(cx.host, cx.scope);
            properties.inner_html = Some(value.display_string());
        }
        Ok(Control::Continue)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TWO-WAY MODEL
// ═══════════════════════════════════════════════════════════════════════════════

struct ModelDirective {
    expression: Expression,
    path: Vec<String>,
}

impl ModelDirective {
    fn build(spec: &DirectiveSpec) -> Result<ModelDirective> {
        let expression = required_expression(spec)?;
        let path = expression.identifier_path().ok_or_else(|| {
            WeftError::new(
                ERR_DIR_MODEL_PATH,
                format!(
                    "`@model` supports identifier paths only, got `{}`",
                    spec.source
                ),
            )
        })?;
        Ok(ModelDirective { expression, path })
    }
}

impl DirectiveHooks for ModelDirective {
    fn properties_populated(&self, cx: &HookCx, target: &mut PropsTarget) -> Result<Control> {
        let properties = match target {
            PropsTarget::Element(properties) => properties,
            PropsTarget::Component(_) => return Ok(Control::Continue),
        };

        // binding a tracked field would feed the write-back straight into
        // another tick
        if cx.host.borrow().recipe.reactive_fields.contains(&self.path[0]) {
            return Err(WeftError::new(
                ERR_DIR_MODEL_REACTIVE,
                format!(
                    "`@model` target `{}` is reactively tracked",
                    self.expression.source
                ),
            ));
        }

        let value = self.expression.eval(cx.host, cx.scope);
        properties
            .attributes
            .insert("value".to_string(), value.display_string());

        let weak_host = Rc::downgrade(cx.host);
        let path = self.path.clone();
        properties.handlers.insert(
            "input".to_string(),
            Rc::new(move |args: &[Value]| {
                if let Some(host) = weak_host.upgrade() {
                    let payload = args.first().cloned().unwrap_or(Value::Null);
                    set_data_path(&host, &path, payload);
                }
                Value::Null
            }),
        );
        Ok(Control::Continue)
    }
}
