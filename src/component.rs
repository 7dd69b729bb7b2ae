//! Component runtime.
//!
//! A `Recipe` is the compiled, immutable description of a component type:
//! declared props, events, slots, local registries and the parsed
//! template. `Instance` is one mounted occurrence, owned by its host
//! through the child registry and identified by a stable id. The
//! `Registry` is an explicitly constructed framework instance; there is
//! no ambient global state, so independent registries can coexist in one
//! process.

use crate::directive::DirectiveFactory;
use crate::error::{Result, WeftError, ERR_DIR_ROOT_STRUCTURAL, ERR_EVENT_UNDECLARED};
use crate::parse::{parse, ParseCx};
use crate::render::{render_block, RenderOpts, Rendered};
use crate::runtime::NodeHandle;
use crate::scope::Scope;
use crate::value::{Callable, Value};
use crate::vdom::VNode;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

/// A component method: receives its own instance and the call arguments.
/// Expression evaluation hands these out auto-bound to the instance.
pub type Method = Rc<dyn Fn(&InstanceRef, &[Value]) -> Value>;

pub type InstanceRef = Rc<RefCell<Instance>>;

// ═══════════════════════════════════════════════════════════════════════════════
// RECIPE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct PropSpec {
    pub name: String,
    /// One of `any`, `string`, `number`, `boolean`, `list`, `object`,
    /// `function`.
    pub prop_type: String,
    pub default: Value,
    pub required: bool,
}

impl PropSpec {
    fn accepts(&self, value: &Value) -> bool {
        if self.prop_type == "any" || self.prop_type.is_empty() || value.is_null() {
            return true;
        }
        value.type_name() == self.prop_type
    }
}

/// Declaration surface for one component type; consumed by
/// `Recipe::compile` exactly once.
pub struct RecipeOptions {
    name: String,
    template: String,
    props: Vec<PropSpec>,
    events: HashSet<String>,
    components: BTreeMap<String, Rc<Recipe>>,
    directives: BTreeMap<String, DirectiveFactory>,
    data: serde_json::Value,
    methods: BTreeMap<String, Method>,
    reactive_fields: HashSet<String>,
}

impl RecipeOptions {
    pub fn new(name: impl Into<String>) -> RecipeOptions {
        RecipeOptions {
            name: name.into(),
            template: "<div></div>".to_string(),
            props: Vec::new(),
            events: HashSet::new(),
            components: BTreeMap::new(),
            directives: BTreeMap::new(),
            data: serde_json::Value::Null,
            methods: BTreeMap::new(),
            reactive_fields: HashSet::new(),
        }
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn prop(mut self, name: impl Into<String>) -> Self {
        self.props.push(PropSpec {
            name: name.into(),
            prop_type: "any".to_string(),
            default: Value::Null,
            required: false,
        });
        self
    }

    pub fn prop_spec(mut self, spec: PropSpec) -> Self {
        self.props.push(spec);
        self
    }

    pub fn event(mut self, name: impl Into<String>) -> Self {
        self.events.insert(name.into());
        self
    }

    pub fn component(mut self, tag: impl Into<String>, recipe: Rc<Recipe>) -> Self {
        self.components.insert(tag.into(), recipe);
        self
    }

    pub fn directive(mut self, command: impl Into<String>, factory: DirectiveFactory) -> Self {
        self.directives.insert(command.into(), factory);
        self
    }

    /// Initial component data, declared as a JSON object.
    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn method(mut self, name: impl Into<String>, method: Method) -> Self {
        self.methods.insert(name.into(), method);
        self
    }

    /// Mark a data field as reactively tracked; `@model` refuses to bind
    /// to these.
    pub fn reactive(mut self, field: impl Into<String>) -> Self {
        self.reactive_fields.insert(field.into());
        self
    }
}

pub struct Recipe {
    pub name: String,
    pub props: Vec<PropSpec>,
    pub events: HashSet<String>,
    pub components: BTreeMap<String, Rc<Recipe>>,
    pub directives: BTreeMap<String, DirectiveFactory>,
    pub data: serde_json::Value,
    pub methods: BTreeMap<String, Method>,
    pub reactive_fields: HashSet<String>,
    pub slots: HashSet<String>,
    pub template: Rc<crate::ast::BlockNode>,
}

impl Recipe {
    /// Parse the template and freeze the type description. A failed parse
    /// leaves nothing behind.
    pub fn compile(options: RecipeOptions, registry: &Registry) -> Result<Rc<Recipe>> {
        let RecipeOptions {
            name,
            template,
            props,
            events,
            components,
            directives,
            data,
            methods,
            reactive_fields,
        } = options;

        let parsed = parse(
            &template,
            &ParseCx {
                components: &components,
                directives: &directives,
                registry,
            },
        )?;

        log::debug!("compiled recipe `{}`", name);
        Ok(Rc::new(Recipe {
            name,
            props,
            events,
            components,
            directives,
            data,
            methods,
            reactive_fields,
            slots: parsed.slots,
            template: parsed.root,
        }))
    }
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipe")
            .field("name", &self.name)
            .field("props", &self.props)
            .field("events", &self.events)
            .field("slots", &self.slots)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Framework-wide registries, dependency-injected rather than ambient.
/// Recipe-local registrations shadow these.
#[derive(Default)]
pub struct Registry {
    components: RefCell<HashMap<String, Rc<Recipe>>>,
    directives: RefCell<HashMap<String, DirectiveFactory>>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    pub fn register_component(&self, tag: impl Into<String>, recipe: Rc<Recipe>) {
        self.components.borrow_mut().insert(tag.into(), recipe);
    }

    pub fn component(&self, tag: &str) -> Option<Rc<Recipe>> {
        self.components.borrow().get(tag).cloned()
    }

    pub fn register_directive(&self, command: impl Into<String>, factory: DirectiveFactory) {
        self.directives.borrow_mut().insert(command.into(), factory);
    }

    pub fn directive(&self, command: &str) -> Option<DirectiveFactory> {
        self.directives.borrow().get(command).cloned()
    }

    /// Compile a recipe and register it under `tag` in one step.
    pub fn define(&self, tag: impl Into<String>, options: RecipeOptions) -> Result<Rc<Recipe>> {
        let recipe = Recipe::compile(options, self)?;
        self.register_component(tag, Rc::clone(&recipe));
        Ok(recipe)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INSTANCE
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Instance {
    pub recipe: Rc<Recipe>,
    pub id: String,
    /// Non-owning link to the host instance; `None` only for a mount root.
    pub host: Option<Weak<RefCell<Instance>>>,
    pub data: BTreeMap<String, Value>,
    pub props: BTreeMap<String, Value>,
    /// Realized child instances, owned exclusively by this host.
    pub children: HashMap<String, InstanceRef>,
    /// Child ids referenced during the current render pass.
    touched: HashSet<String>,
    pub fills: BTreeMap<String, Vec<VNode>>,
    pub listeners: BTreeMap<String, Vec<Callable>>,
    pub last_tree: Option<VNode>,
    pub handle: Option<NodeHandle>,
    pub mounted: bool,
}

impl Instance {
    pub fn create(recipe: &Rc<Recipe>, id: impl Into<String>, host: Option<&InstanceRef>) -> InstanceRef {
        let data = match Value::from_json(&recipe.data) {
            Value::Object(map) => map,
            _ => BTreeMap::new(),
        };
        Rc::new(RefCell::new(Instance {
            recipe: Rc::clone(recipe),
            id: id.into(),
            host: host.map(Rc::downgrade),
            data,
            props: BTreeMap::new(),
            children: HashMap::new(),
            touched: HashSet::new(),
            fills: BTreeMap::new(),
            listeners: BTreeMap::new(),
            last_tree: None,
            handle: None,
            mounted: false,
        }))
    }

    pub fn is_root(&self) -> bool {
        self.host.is_none()
    }

    /// The mount root, found by walking host links upward.
    pub fn root(instance: &InstanceRef) -> InstanceRef {
        let mut current = Rc::clone(instance);
        loop {
            let host = current.borrow().host.as_ref().and_then(Weak::upgrade);
            match host {
                Some(host) => current = host,
                None => return current,
            }
        }
    }

    fn assign_props(&mut self, mut provided: BTreeMap<String, Value>) {
        let recipe = Rc::clone(&self.recipe);
        let mut assigned = BTreeMap::new();
        for spec in &recipe.props {
            match provided.remove(&spec.name) {
                Some(value) => {
                    if !spec.accepts(&value) {
                        log::warn!(
                            "Prop `{}` of `{}` expects {}, got {}",
                            spec.name,
                            recipe.name,
                            spec.prop_type,
                            value.type_name()
                        );
                    }
                    assigned.insert(spec.name.clone(), value);
                }
                None => {
                    if spec.required {
                        log::warn!(
                            "Missing required prop `{}` of `{}`",
                            spec.name,
                            recipe.name
                        );
                    }
                    assigned.insert(spec.name.clone(), spec.default.clone());
                }
            }
        }
        for name in provided.keys() {
            log::warn!("Unknown prop `{}` for `{}`; dropped", name, recipe.name);
        }
        self.props = assigned;
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("recipe", &self.recipe.name)
            .field("id", &self.id)
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Find or lazily create the child instance for a stable id, marking it as
/// live for this render pass.
pub fn lookup_or_create_child(host: &InstanceRef, recipe: &Rc<Recipe>, id: &str) -> InstanceRef {
    {
        let mut inst = host.borrow_mut();
        inst.touched.insert(id.to_string());
        if let Some(existing) = inst.children.get(id) {
            return Rc::clone(existing);
        }
    }
    log::debug!("new instance `{}` of `{}`", id, recipe.name);
    let child = Instance::create(recipe, id, Some(host));
    host.borrow_mut()
        .children
        .insert(id.to_string(), Rc::clone(&child));
    child
}

/// Identifier fallback for expression evaluation once the scope chain has
/// missed: props, then data, then recipe methods bound to the instance.
pub fn lookup_in_host(host: &InstanceRef, name: &str) -> Option<Value> {
    let inst = host.borrow();
    if let Some(value) = inst.props.get(name) {
        return Some(value.clone());
    }
    if let Some(value) = inst.data.get(name) {
        return Some(value.clone());
    }
    if let Some(method) = inst.recipe.methods.get(name) {
        let method = Rc::clone(method);
        let weak = Rc::downgrade(host);
        return Some(Value::Function(Rc::new(move |args: &[Value]| {
            match weak.upgrade() {
                Some(instance) => method(&instance, args),
                None => Value::Null,
            }
        })));
    }
    None
}

/// Write `value` into the instance's data at a dotted path, materializing
/// intermediate objects.
pub fn set_data_path(host: &InstanceRef, path: &[String], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };
    let mut inst = host.borrow_mut();
    if rest.is_empty() {
        inst.data.insert(first.clone(), value);
        return;
    }
    let slot = inst
        .data
        .entry(first.clone())
        .or_insert_with(|| Value::Object(BTreeMap::new()));
    assign_nested(slot, rest, value);
}

fn assign_nested(target: &mut Value, path: &[String], value: Value) {
    if !matches!(target, Value::Object(_)) {
        *target = Value::Object(BTreeMap::new());
    }
    let Value::Object(map) = target else {
        return;
    };
    match path {
        [last] => {
            map.insert(last.clone(), value);
        }
        [head, rest @ ..] => {
            let next = map
                .entry(head.clone())
                .or_insert_with(|| Value::Object(BTreeMap::new()));
            assign_nested(next, rest, value);
        }
        [] => {}
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDER PASS
// ═══════════════════════════════════════════════════════════════════════════════

/// One full render of an instance: assign props, replace the listener
/// table, store slot fills, render the template root and evict children
/// the pass no longer references. The root must yield exactly one vnode.
pub fn render_instance(
    instance: &InstanceRef,
    props: BTreeMap<String, Value>,
    listeners: BTreeMap<String, Callable>,
    fills: BTreeMap<String, Vec<VNode>>,
) -> Result<VNode> {
    {
        let mut inst = instance.borrow_mut();
        inst.assign_props(props);
        inst.listeners = listeners
            .into_iter()
            .map(|(event, handler)| (event, vec![handler]))
            .collect();
        inst.fills = fills;
        inst.touched.clear();
    }

    let template = Rc::clone(&instance.borrow().recipe.template);
    let rendered = render_block(&template, instance, &Scope::root(), &RenderOpts::default())?;

    let vnode = match rendered {
        Rendered::Node(vnode) => vnode,
        Rendered::Empty => {
            let name = instance.borrow().recipe.name.clone();
            return Err(WeftError::new(
                ERR_DIR_ROOT_STRUCTURAL,
                format!("Template root of `{}` rendered nothing", name),
            ));
        }
        Rendered::Fragment(_) => {
            let name = instance.borrow().recipe.name.clone();
            return Err(WeftError::new(
                ERR_DIR_ROOT_STRUCTURAL,
                format!("Template root of `{}` rendered more than one node", name),
            ));
        }
    };

    {
        let mut inst = instance.borrow_mut();
        let stale: Vec<String> = inst
            .children
            .keys()
            .filter(|id| !inst.touched.contains(*id))
            .cloned()
            .collect();
        for id in stale {
            log::debug!("evicting instance `{}`", id);
            inst.children.remove(&id);
        }
        inst.last_tree = Some(vnode.clone());
    }
    Ok(vnode)
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Register an external listener for a declared event. Undeclared events
/// are dropped with a warning.
pub fn on(instance: &InstanceRef, event: &str, listener: Callable) {
    let mut inst = instance.borrow_mut();
    if inst.recipe.events.contains(event) {
        inst.listeners
            .entry(event.to_string())
            .or_default()
            .push(listener);
    } else {
        log::warn!(
            "Component `{}` declares no event `{}`; listener dropped",
            inst.recipe.name,
            event
        );
    }
}

/// Fire a declared event toward the host's registered listeners. Emitting
/// an undeclared event is an error.
pub fn emit(instance: &InstanceRef, event: &str, args: &[Value]) -> Result<()> {
    let listeners = {
        let inst = instance.borrow();
        if !inst.recipe.events.contains(event) {
            return Err(WeftError::new(
                ERR_EVENT_UNDECLARED,
                format!(
                    "No event `{}` declaration in component `{}`",
                    event, inst.recipe.name
                ),
            ));
        }
        inst.listeners.get(event).cloned().unwrap_or_default()
    };
    for listener in listeners {
        listener(args);
    }
    Ok(())
}
