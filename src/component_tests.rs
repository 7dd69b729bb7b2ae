#[cfg(test)]
mod tests {
    use crate::component::{
        emit, on, render_instance, set_data_path, Instance, InstanceRef, PropSpec, Recipe,
        RecipeOptions, Registry,
    };
    use crate::error::{
        Result, ERR_EVENT_UNDECLARED, ERR_MOUNT_NON_ROOT, ERR_MOUNT_NO_TARGET, ERR_MOUNT_TWICE,
    };
    use crate::runtime::{DisplayBackend, NodeHandle, PatchSet, Reactor, Runtime};
    use crate::value::Value;
    use crate::vdom::VNode;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    fn render(inst: &InstanceRef) -> Result<VNode> {
        render_instance(inst, BTreeMap::new(), BTreeMap::new(), BTreeMap::new())
    }

    /// Registry with a `card` child component: one `title` prop, rendered
    /// into a div.
    fn registry_with_card() -> Registry {
        let registry = Registry::new();
        registry
            .define(
                "card",
                RecipeOptions::new("Card")
                    .template("<div>{{ title }}</div>")
                    .prop("title"),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_component_props_flow() {
        let registry = registry_with_card();
        let recipe = Recipe::compile(
            RecipeOptions::new("App").template(r#"<main><card title="hi"></card></main>"#),
            &registry,
        )
        .unwrap();
        let root = Instance::create(&recipe, "root", None);

        let vnode = render(&root).unwrap();
        let card = vnode.as_element().unwrap().children[0].as_element().unwrap();
        assert_eq!(card.tag, "div");
        assert_eq!(card.key.as_deref(), Some("card#0"));
        assert_eq!(card.attribute("id"), Some("card#0"));
        assert_eq!(VNode::Element(card.clone()).text_content(), "hi");
    }

    #[test]
    fn test_bind_overrides_static_prop() {
        let registry = registry_with_card();
        let recipe = Recipe::compile(
            RecipeOptions::new("App")
                .template(r#"<main><card @bind:title="t"></card></main>"#)
                .data(json!({"t": "dynamic"})),
            &registry,
        )
        .unwrap();
        let root = Instance::create(&recipe, "root", None);
        assert_eq!(render(&root).unwrap().text_content(), "dynamic");
    }

    #[test]
    fn test_prop_default_applied() {
        let registry = Registry::new();
        registry
            .define(
                "card",
                RecipeOptions::new("Card")
                    .template("<div>{{ title }}</div>")
                    .prop_spec(PropSpec {
                        name: "title".to_string(),
                        prop_type: "string".to_string(),
                        default: Value::from("fallback"),
                        required: false,
                    }),
            )
            .unwrap();
        let recipe = Recipe::compile(
            RecipeOptions::new("App").template("<main><card></card></main>"),
            &registry,
        )
        .unwrap();
        let root = Instance::create(&recipe, "root", None);
        assert_eq!(render(&root).unwrap().text_content(), "fallback");
    }

    #[test]
    fn test_for_loop_stable_ids_and_reuse() {
        let registry = registry_with_card();
        let recipe = Recipe::compile(
            RecipeOptions::new("App")
                .template(r#"<ul><card @for:item="items" @bind:title="item"></card></ul>"#)
                .data(json!({"items": ["a", "b", "c"]})),
            &registry,
        )
        .unwrap();
        let root = Instance::create(&recipe, "root", None);

        let vnode = render(&root).unwrap();
        let keys: Vec<Option<String>> = vnode
            .as_element()
            .unwrap()
            .children
            .iter()
            .map(|c| c.as_element().and_then(|el| el.key.clone()))
            .collect();
        assert_eq!(
            keys,
            vec![
                Some("card#0@0".to_string()),
                Some("card#0@1".to_string()),
                Some("card#0@2".to_string()),
            ]
        );

        let before: Vec<InstanceRef> = (0..3)
            .map(|i| {
                Rc::clone(
                    root.borrow()
                        .children
                        .get(&format!("card#0@{}", i))
                        .unwrap(),
                )
            })
            .collect();

        render(&root).unwrap();
        for (i, instance) in before.iter().enumerate() {
            let after = Rc::clone(
                root.borrow()
                    .children
                    .get(&format!("card#0@{}", i))
                    .unwrap(),
            );
            assert!(Rc::ptr_eq(instance, &after));
        }
    }

    #[test]
    fn for_loop_shrink_evicts_instances() {
        let registry = registry_with_card();
        let recipe = Recipe::compile(
            RecipeOptions::new("App")
                .template(r#"<ul><card @for:item="items" @bind:title="item"></card></ul>"#)
                .data(json!({"items": ["a", "b", "c"]})),
            &registry,
        )
        .unwrap();
        let root = Instance::create(&recipe, "root", None);

        render(&root).unwrap();
        assert_eq!(root.borrow().children.len(), 3);

        set_data_path(&root, &["items".to_string()], Value::List(vec![Value::from("a")]));
        render(&root).unwrap();

        let inst = root.borrow();
        assert_eq!(inst.children.len(), 1);
        assert!(inst.children.contains_key("card#0@0"));
    }

    #[test]
    fn test_slot_fallback_and_fill() {
        let registry = Registry::new();
        registry
            .define(
                "panel",
                RecipeOptions::new("Panel").template("<div><slot>default text</slot></div>"),
            )
            .unwrap();

        let fallback = Recipe::compile(
            RecipeOptions::new("App").template("<main><panel></panel></main>"),
            &registry,
        )
        .unwrap();
        let root = Instance::create(&fallback, "root", None);
        assert_eq!(render(&root).unwrap().text_content(), "default text");

        let filled = Recipe::compile(
            RecipeOptions::new("App").template("<main><panel><p>filled</p></panel></main>"),
            &registry,
        )
        .unwrap();
        let root = Instance::create(&filled, "root", None);
        assert_eq!(render(&root).unwrap().text_content(), "filled");
    }

    #[test]
    fn test_named_slot_fill() {
        let registry = Registry::new();
        registry
            .define(
                "panel",
                RecipeOptions::new("Panel")
                    .template(r#"<div><slot name="header">no header</slot><slot>body</slot></div>"#),
            )
            .unwrap();
        let recipe = Recipe::compile(
            RecipeOptions::new("App")
                .template(r#"<main><panel><p slot="header">H</p></panel></main>"#),
            &registry,
        )
        .unwrap();
        let root = Instance::create(&recipe, "root", None);
        // the header fill replaces the declared default, the body slot
        // keeps its own content
        assert_eq!(render(&root).unwrap().text_content(), "Hbody");
    }

    #[test]
    fn test_fill_for_undeclared_slot_is_dropped() {
        let registry = Registry::new();
        registry
            .define(
                "panel",
                RecipeOptions::new("Panel").template("<div>own</div>"),
            )
            .unwrap();
        let recipe = Recipe::compile(
            RecipeOptions::new("App")
                .template(r#"<main><panel><p slot="nope">x</p></panel></main>"#),
            &registry,
        )
        .unwrap();
        let root = Instance::create(&recipe, "root", None);
        assert_eq!(render(&root).unwrap().text_content(), "own");
    }

    #[test]
    fn test_component_event_listener() {
        let registry = Registry::new();
        registry
            .define(
                "panel",
                RecipeOptions::new("Panel")
                    .template("<div>p</div>")
                    .event("saved"),
            )
            .unwrap();
        let recipe = Recipe::compile(
            RecipeOptions::new("App")
                .template(r#"<main><panel @on:saved="onSaved"></panel></main>"#)
                .method(
                    "onSaved",
                    Rc::new(|inst, args| {
                        let payload = args.first().cloned().unwrap_or(Value::Null);
                        set_data_path(inst, &["seen".to_string()], payload);
                        Value::Null
                    }),
                ),
            &registry,
        )
        .unwrap();
        let root = Instance::create(&recipe, "root", None);
        render(&root).unwrap();

        let panel = Rc::clone(root.borrow().children.get("panel#0").unwrap());
        emit(&panel, "saved", &[Value::from("yes")]).unwrap();
        assert_eq!(root.borrow().data.get("seen"), Some(&Value::from("yes")));

        let err = emit(&panel, "nope", &[]).unwrap_err();
        assert_eq!(err.code, ERR_EVENT_UNDECLARED);
    }

    #[test]
    fn test_external_listener_registration() {
        let registry = Registry::new();
        registry
            .define(
                "panel",
                RecipeOptions::new("Panel")
                    .template("<div>p</div>")
                    .event("saved"),
            )
            .unwrap();
        let recipe = Recipe::compile(
            RecipeOptions::new("App").template("<main><panel></panel></main>"),
            &registry,
        )
        .unwrap();
        let root = Instance::create(&recipe, "root", None);
        render(&root).unwrap();
        let panel = Rc::clone(root.borrow().children.get("panel#0").unwrap());

        let hits = Rc::new(std::cell::Cell::new(0));
        let counter = Rc::clone(&hits);
        on(
            &panel,
            "saved",
            Rc::new(move |_args: &[Value]| {
                counter.set(counter.get() + 1);
                Value::Null
            }),
        );
        emit(&panel, "saved", &[]).unwrap();
        assert_eq!(hits.get(), 1);

        // listeners for undeclared events are dropped
        on(&panel, "nope", Rc::new(|_: &[Value]| Value::Null));
        assert!(!panel.borrow().listeners.contains_key("nope"));
    }

    #[test]
    fn test_root_walks_host_links_to_the_top() {
        let registry = Registry::new();
        registry
            .define("panel", RecipeOptions::new("Panel").template("<div>p</div>"))
            .unwrap();
        let recipe = Recipe::compile(
            RecipeOptions::new("App").template("<main><panel></panel></main>"),
            &registry,
        )
        .unwrap();
        let root = Instance::create(&recipe, "root", None);
        render(&root).unwrap();

        let panel = Rc::clone(root.borrow().children.get("panel#0").unwrap());
        let leaf_recipe = Rc::clone(&panel.borrow().recipe);
        let leaf = Instance::create(&leaf_recipe, "leaf", Some(&panel));

        assert!(Rc::ptr_eq(&Instance::root(&panel), &root));
        assert!(Rc::ptr_eq(&Instance::root(&leaf), &root));
        assert!(Rc::ptr_eq(&Instance::root(&root), &root));
    }

    #[test]
    fn test_native_listener_attaches_to_child_root() {
        let registry = Registry::new();
        registry
            .define("panel", RecipeOptions::new("Panel").template("<div>p</div>"))
            .unwrap();
        let recipe = Recipe::compile(
            RecipeOptions::new("App")
                .template(r#"<main><panel @on:click.native="go"></panel></main>"#)
                .method("go", Rc::new(|_, _| Value::Null)),
            &registry,
        )
        .unwrap();
        let root = Instance::create(&recipe, "root", None);

        let vnode = render(&root).unwrap();
        let panel_root = vnode.as_element().unwrap().children[0].as_element().unwrap();
        assert!(panel_root.properties.handlers.contains_key("click"));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MOUNT DRIVER
    // ═══════════════════════════════════════════════════════════════════════════

    #[derive(Default)]
    struct MockDisplay {
        created: Vec<VNode>,
        appended: Vec<(NodeHandle, NodeHandle)>,
        patched: usize,
        next: u64,
    }

    impl DisplayBackend for MockDisplay {
        fn locate(&mut self, selector: &str) -> Option<NodeHandle> {
            if selector == "#app" {
                Some(NodeHandle(1))
            } else {
                None
            }
        }

        fn create(&mut self, tree: &VNode) -> NodeHandle {
            self.created.push(tree.clone());
            self.next += 1;
            NodeHandle(100 + self.next)
        }

        fn append_child(&mut self, parent: NodeHandle, child: NodeHandle) {
            self.appended.push((parent, child));
        }

        fn diff(&mut self, old: &VNode, new: &VNode) -> PatchSet {
            PatchSet::new((old.clone(), new.clone()))
        }

        fn apply(&mut self, handle: NodeHandle, _patches: PatchSet) -> NodeHandle {
            self.patched += 1;
            handle
        }
    }

    /// Runs the effect once on `autorun` and again on every `tick` call,
    /// standing in for the reactive primitive.
    #[derive(Default)]
    struct ManualReactor {
        effect: Option<Box<dyn FnMut() -> Result<()>>>,
        last: Option<Result<()>>,
    }

    impl ManualReactor {
        fn tick(&mut self) {
            if let Some(effect) = self.effect.as_mut() {
                self.last = Some(effect());
            }
        }
    }

    impl Reactor for ManualReactor {
        fn autorun(&mut self, mut effect: Box<dyn FnMut() -> Result<()>>) {
            self.last = Some(effect());
            self.effect = Some(effect);
        }
    }

    fn counter_instance() -> InstanceRef {
        let registry = Registry::new();
        let recipe = Recipe::compile(
            RecipeOptions::new("Counter")
                .template("<p>{{ n }}</p>")
                .data(json!({"n": 1})),
            &registry,
        )
        .unwrap();
        Instance::create(&recipe, "root", None)
    }

    #[test]
    fn test_mount_first_tick_creates_and_appends() {
        let display = Rc::new(RefCell::new(MockDisplay::default()));
        let reactor = Rc::new(RefCell::new(ManualReactor::default()));
        let runtime = Runtime::new(display.clone(), reactor.clone());

        let root = counter_instance();
        runtime.mount(&root, "#app").unwrap();

        let backend = display.borrow();
        assert_eq!(backend.created.len(), 1);
        assert_eq!(backend.created[0].text_content(), "1");
        assert_eq!(backend.appended, vec![(NodeHandle(1), NodeHandle(101))]);
        assert_eq!(root.borrow().handle, Some(NodeHandle(101)));
    }

    #[test]
    fn test_later_ticks_diff_and_patch() {
        let display = Rc::new(RefCell::new(MockDisplay::default()));
        let reactor = Rc::new(RefCell::new(ManualReactor::default()));
        let runtime = Runtime::new(display.clone(), reactor.clone());

        let root = counter_instance();
        runtime.mount(&root, "#app").unwrap();

        set_data_path(&root, &["n".to_string()], Value::Number(2.0));
        reactor.borrow_mut().tick();
        assert!(matches!(reactor.borrow().last, Some(Ok(()))));

        let backend = display.borrow();
        assert_eq!(backend.created.len(), 1);
        assert_eq!(backend.patched, 1);
        assert_eq!(
            root.borrow().last_tree.as_ref().map(|t| t.text_content()),
            Some("2".to_string())
        );
    }

    #[test]
    fn test_double_mount_is_an_error() {
        let display = Rc::new(RefCell::new(MockDisplay::default()));
        let reactor = Rc::new(RefCell::new(ManualReactor::default()));
        let runtime = Runtime::new(display.clone(), reactor.clone());

        let root = counter_instance();
        runtime.mount(&root, "#app").unwrap();
        let err = runtime.mount(&root, "#app").unwrap_err();
        assert_eq!(err.code, ERR_MOUNT_TWICE);
    }

    #[test]
    fn test_mounting_a_child_is_an_error() {
        let display = Rc::new(RefCell::new(MockDisplay::default()));
        let reactor = Rc::new(RefCell::new(ManualReactor::default()));
        let runtime = Runtime::new(display.clone(), reactor.clone());

        let root = counter_instance();
        let recipe = Rc::clone(&root.borrow().recipe);
        let child = Instance::create(&recipe, "child", Some(&root));
        let err = runtime.mount(&child, "#app").unwrap_err();
        assert_eq!(err.code, ERR_MOUNT_NON_ROOT);
    }

    #[test]
    fn test_missing_mount_target() {
        let display = Rc::new(RefCell::new(MockDisplay::default()));
        let reactor = Rc::new(RefCell::new(ManualReactor::default()));
        let runtime = Runtime::new(display.clone(), reactor.clone());

        let root = counter_instance();
        let err = runtime.mount(&root, "#nope").unwrap_err();
        assert_eq!(err.code, ERR_MOUNT_NO_TARGET);
    }
}
