//! Template parser.
//!
//! Consumes the token stream from `lexer.rs` and builds the element AST
//! for one component recipe: a stack-based tree builder that classifies
//! attributes into directives, event bindings and plain attributes,
//! resolves custom tags against the component registries, splits text
//! into literal and `{{ expr }}` leaves, and enforces the single-root
//! and matched-close invariants.

use crate::ast::{BlockKind, BlockNode, TemplateNode};
use crate::component::{Recipe, Registry};
use crate::directive::{builtin, builtin_kind, DirectiveFactory, DirectiveHooks, DirectiveSpec};
use crate::error::{
    Result, WeftError, ERR_PARSE_BAD_DIRECTIVE, ERR_PARSE_DUPLICATE_SLOT, ERR_PARSE_MALFORMED,
    ERR_PARSE_MISMATCHED_TAG, ERR_PARSE_MULTIPLE_ROOTS, ERR_PARSE_NO_ROOT,
    ERR_PARSE_UNKNOWN_DIRECTIVE, ERR_PARSE_UNRESOLVED_TAG,
};
use crate::expr::Expression;
use crate::html::{is_event_attribute, is_html_tag, is_known_attribute};
use crate::lexer::{tokenize, MarkupToken};
use lazy_static::lazy_static;
use regex::Regex;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

lazy_static! {
    /// `@command` or `@command:target.param1.param2…`
    static ref DIRECTIVE_ATTRIBUTE: Regex =
        Regex::new(r"^@(\w+)(?::(\w+)((?:\.\w+)*))?$").unwrap();
    static ref INTERPOLATION: Regex = Regex::new(r"\{\{([^{}]*)\}\}").unwrap();
}

/// Registries visible while parsing one recipe's template.
pub struct ParseCx<'a> {
    pub components: &'a BTreeMap<String, Rc<Recipe>>,
    pub directives: &'a BTreeMap<String, DirectiveFactory>,
    pub registry: &'a Registry,
}

pub struct ParsedTemplate {
    pub root: Rc<BlockNode>,
    /// Slot names the template declares, in no particular order.
    pub slots: HashSet<String>,
}

pub fn parse(template: &str, cx: &ParseCx) -> Result<ParsedTemplate> {
    let mut builder = TreeBuilder {
        cx,
        stack: Vec::new(),
        roots: Vec::new(),
        slots: HashSet::new(),
        component_ordinal: 0,
    };

    for token in tokenize(template.trim())? {
        match token {
            MarkupToken::OpenTag {
                name,
                attributes,
                self_closing,
            } => builder.open(name, attributes, self_closing)?,
            MarkupToken::CloseTag { name } => builder.close(&name)?,
            MarkupToken::Text(text) => builder.text(&text)?,
        }
    }
    builder.finish()
}

struct TreeBuilder<'a> {
    cx: &'a ParseCx<'a>,
    stack: Vec<Rc<BlockNode>>,
    roots: Vec<Rc<BlockNode>>,
    slots: HashSet<String>,
    component_ordinal: usize,
}

impl TreeBuilder<'_> {
    fn open(
        &mut self,
        name: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    ) -> Result<()> {
        log::debug!("<{}>", name);
        let block = self.build_block(&name, attributes)?;
        if self_closing {
            self.attach(block)
        } else {
            self.stack.push(block);
            Ok(())
        }
    }

    fn close(&mut self, name: &str) -> Result<()> {
        log::debug!("</{}>", name);
        let block = self.stack.pop().ok_or_else(|| {
            WeftError::new(
                ERR_PARSE_MISMATCHED_TAG,
                format!("Close tag </{}> with no open tag", name),
            )
        })?;
        if !block.tag.eq_ignore_ascii_case(name) {
            return Err(WeftError::new(
                ERR_PARSE_MISMATCHED_TAG,
                format!("Expected </{}>, found </{}>", block.tag, name),
            ));
        }
        self.attach(block)
    }

    fn attach(&mut self, block: Rc<BlockNode>) -> Result<()> {
        match self.stack.last() {
            Some(parent) => {
                parent.push_child(TemplateNode::Block(block));
                Ok(())
            }
            None => {
                if !self.roots.is_empty() {
                    return Err(WeftError::new(
                        ERR_PARSE_MULTIPLE_ROOTS,
                        format!("Second root element <{}>", block.tag),
                    ));
                }
                self.roots.push(block);
                Ok(())
            }
        }
    }

    fn text(&mut self, text: &str) -> Result<()> {
        let parent = match self.stack.last() {
            Some(parent) => Rc::clone(parent),
            None => {
                if text.trim().is_empty() {
                    return Ok(());
                }
                return Err(WeftError::new(
                    ERR_PARSE_MALFORMED,
                    format!("Text outside the root element: `{}`", text.trim()),
                ));
            }
        };

        for leaf in segment_text(text)? {
            parent.push_child(leaf);
        }
        Ok(())
    }

    fn finish(mut self) -> Result<ParsedTemplate> {
        if let Some(open) = self.stack.last() {
            return Err(WeftError::new(
                ERR_PARSE_MISMATCHED_TAG,
                format!("Tag <{}> is never closed", open.tag),
            ));
        }
        match self.roots.len() {
            1 => Ok(ParsedTemplate {
                root: self.roots.remove(0),
                slots: self.slots,
            }),
            0 => Err(WeftError::new(
                ERR_PARSE_NO_ROOT,
                "Template contains no root element",
            )),
            _ => unreachable!("guarded in attach"),
        }
    }

    fn build_block(&mut self, name: &str, attributes: Vec<(String, String)>) -> Result<Rc<BlockNode>> {
        let lower = name.to_ascii_lowercase();

        let kind = if lower == "slot" {
            let slot_name = attributes
                .iter()
                .find(|(attr, _)| attr == "name")
                .map(|(_, value)| value.clone())
                .unwrap_or_else(|| "default".to_string());
            if !self.slots.insert(slot_name.clone()) {
                return Err(WeftError::new(
                    ERR_PARSE_DUPLICATE_SLOT,
                    format!("Slot `{}` is declared twice", slot_name),
                ));
            }
            BlockKind::Slot { name: slot_name }
        } else if is_html_tag(&lower) {
            BlockKind::Element
        } else {
            let recipe = self
                .cx
                .components
                .get(name)
                .cloned()
                .or_else(|| self.cx.registry.component(name));
            match recipe {
                Some(recipe) => {
                    let id_seed = format!("{}#{}", name, self.component_ordinal);
                    self.component_ordinal += 1;
                    BlockKind::Component { recipe, id_seed }
                }
                None => {
                    return Err(WeftError::new(
                        ERR_PARSE_UNRESOLVED_TAG,
                        format!("Cannot resolve custom tag <{}> to a component", name),
                    ))
                }
            }
        };

        let tag = match &kind {
            BlockKind::Component { .. } => name.to_string(),
            _ => lower,
        };

        let mut plain = Vec::new();
        let mut events = Vec::new();
        let mut directives: Vec<Rc<dyn DirectiveHooks>> = Vec::new();

        for (attr_name, attr_value) in attributes {
            if attr_name.starts_with('@') {
                directives.push(self.build_directive(&attr_name, &attr_value)?);
                continue;
            }
            match &kind {
                BlockKind::Component { recipe, .. } => {
                    if recipe.props.iter().any(|p| p.name == attr_name) {
                        plain.push((attr_name, attr_value));
                    } else {
                        log::warn!(
                            "Unknown prop `{}` for component `{}`; dropped",
                            attr_name,
                            recipe.name
                        );
                    }
                }
                _ => {
                    let attr_lower = attr_name.to_ascii_lowercase();
                    if is_event_attribute(&attr_lower) {
                        events.push((attr_lower, Expression::parse(&attr_value)?));
                    } else if is_known_attribute(&tag, &attr_lower) {
                        plain.push((attr_lower, attr_value));
                    } else {
                        log::warn!(
                            "Illegal attribute `{}` for tag `{}`; dropped",
                            attr_name,
                            tag
                        );
                    }
                }
            }
        }

        Ok(Rc::new(BlockNode {
            tag,
            attributes: plain,
            events,
            directives,
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(std::rc::Weak::new()),
            kind,
        }))
    }

    fn build_directive(&self, attr_name: &str, attr_value: &str) -> Result<Rc<dyn DirectiveHooks>> {
        let captures = DIRECTIVE_ATTRIBUTE.captures(attr_name).ok_or_else(|| {
            WeftError::new(
                ERR_PARSE_BAD_DIRECTIVE,
                format!("Illegal directive attribute `{}`", attr_name),
            )
        })?;

        let command = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let target = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
        let params: Vec<String> = captures
            .get(3)
            .map(|m| {
                m.as_str()
                    .split('.')
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let spec = DirectiveSpec {
            command: command.to_ascii_lowercase(),
            target: target.to_string(),
            params,
            source: attr_value.to_string(),
        };

        // recipe-local factories shadow framework-wide ones; the built-in
        // set is the final fallback
        let factory = self
            .cx
            .directives
            .get(&spec.command)
            .cloned()
            .or_else(|| self.cx.registry.directive(&spec.command));
        if let Some(factory) = factory {
            return factory(spec);
        }
        match builtin_kind(&spec.command) {
            Some(kind) => builtin(kind, spec),
            None => Err(WeftError::new(
                ERR_PARSE_UNKNOWN_DIRECTIVE,
                format!("No directive registered for `@{}`", spec.command),
            )),
        }
    }
}

/// Split text content into literal and interpolation leaves. Segments that
/// are nothing but whitespace are dropped.
fn segment_text(text: &str) -> Result<Vec<TemplateNode>> {
    let mut leaves = Vec::new();
    let mut cursor = 0;
    for captures in INTERPOLATION.captures_iter(text) {
        let whole = match captures.get(0) {
            Some(m) => m,
            None => continue,
        };
        let literal = &text[cursor..whole.start()];
        if !literal.trim().is_empty() {
            leaves.push(TemplateNode::Text(literal.to_string()));
        }
        let source = captures.get(1).map(|m| m.as_str()).unwrap_or_default().trim();
        if !source.is_empty() {
            leaves.push(TemplateNode::Interpolation(Expression::parse(source)?));
        }
        cursor = whole.end();
    }
    let tail = &text[cursor..];
    if !tail.trim().is_empty() {
        leaves.push(TemplateNode::Text(tail.to_string()));
    }
    Ok(leaves)
}
