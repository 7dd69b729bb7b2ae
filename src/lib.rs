//! # Weft Component Framework Core
//!
//! Template compilation and directive-driven rendering: a component type
//! is declared as a template string plus plain data, compiled once into an
//! element AST, and re-rendered into virtual nodes on every data change.
//!
//! ## Rendering Invariants
//!
//! 1. **One compile per type**: a `Recipe` parses its template exactly once,
//!    at `Recipe::compile`. A failed compile leaves nothing registered.
//!
//! 2. **Single root**: every template parses to exactly one root element
//!    (W-ERR-PARSE-001/007), and every instance render must yield exactly
//!    one root vnode (W-ERR-DIR-002).
//!
//! 3. **Attribute classification order**: directive (`@command`) first,
//!    then known event attributes (parsed as expressions), then plain
//!    attributes; unknown names warn and drop, never fail.
//!
//! 4. **Directive phases**: every directive on a block runs through
//!    `initialised`, `events_prepared`, `properties_populated`,
//!    `children_rendered`, `component_prepared`, in that order. Any phase
//!    may replace the block's contribution with explicit vnodes.
//!
//! 5. **Scope isolation**: loop variables and `@var` bindings live in the
//!    current scope layer only; expression lookup falls through layers and
//!    finally to the host instance's props, data and methods. An absent
//!    identifier evaluates to null, never an error.
//!
//! 6. **Instance stability**: child instances are keyed by a stable id
//!    (`tag#ordinal`, loop iterations appending `@index`) and reused across
//!    renders; ids absent from a render pass are evicted afterwards.
//!
//! 7. **Hosts own children**: the instance tree is an arena rooted at the
//!    mount root; host back-references are weak and never owning.

mod ast;
mod component;
mod directive;
mod error;
mod expr;
mod html;
mod lexer;
mod parse;
mod render;
mod runtime;
mod scope;
mod value;
mod vdom;

#[cfg(test)]
mod component_tests;
#[cfg(test)]
mod parse_tests;

pub use ast::{BlockKind, BlockNode, TemplateNode};
pub use component::{
    emit, lookup_in_host, on, render_instance, set_data_path, Instance, InstanceRef, Method,
    PropSpec, Recipe, RecipeOptions, Registry,
};
pub use directive::{
    builtin, builtin_kind, BranchRole, BranchState, Control, DirectiveFactory, DirectiveHooks,
    DirectiveKind, DirectiveSpec, HookCx, PropsTarget,
};
pub use error::{Result, WeftError};
pub use expr::{Expr, Expression};
pub use render::{render_block, render_node, RenderOpts, Rendered};
pub use runtime::{DisplayBackend, NodeHandle, PatchSet, Reactor, Runtime};
pub use scope::Scope;
pub use value::{Callable, Value};
pub use vdom::{Properties, VElement, VNode};
