#[cfg(test)]
mod tests {
    use crate::ast::{BlockKind, TemplateNode};
    use crate::component::{Recipe, RecipeOptions, Registry};
    use crate::error::{
        ERR_PARSE_BAD_DIRECTIVE, ERR_PARSE_DUPLICATE_SLOT, ERR_PARSE_MISMATCHED_TAG,
        ERR_PARSE_MULTIPLE_ROOTS, ERR_PARSE_NO_ROOT, ERR_PARSE_UNKNOWN_DIRECTIVE,
        ERR_PARSE_UNRESOLVED_TAG,
    };
    use std::rc::Rc;

    fn compile(template: &str) -> crate::error::Result<Rc<Recipe>> {
        let registry = Registry::new();
        Recipe::compile(RecipeOptions::new("Test").template(template), &registry)
    }

    #[test]
    fn test_single_root_shape() {
        let recipe = compile(r#"<div class="app"><p>hi</p></div>"#).unwrap();
        let root = &recipe.template;
        assert_eq!(root.tag, "div");
        assert!(matches!(root.kind, BlockKind::Element));
        assert_eq!(
            root.attributes,
            vec![("class".to_string(), "app".to_string())]
        );

        let children = root.children.borrow();
        assert_eq!(children.len(), 1);
        match &children[0] {
            TemplateNode::Block(p) => {
                assert_eq!(p.tag, "p");
                assert!(p.parent_block().is_some());
            }
            other => panic!("unexpected child: {:?}", other),
        }
    }

    #[test]
    fn test_two_roots_rejected() {
        let err = compile("<div></div><span></span>").unwrap_err();
        assert_eq!(err.code, ERR_PARSE_MULTIPLE_ROOTS);
    }

    #[test]
    fn test_mismatched_close_tag() {
        let err = compile("<div><p></div>").unwrap_err();
        assert_eq!(err.code, ERR_PARSE_MISMATCHED_TAG);
    }

    #[test]
    fn test_unclosed_tag() {
        let err = compile("<div><p></p>").unwrap_err();
        assert_eq!(err.code, ERR_PARSE_MISMATCHED_TAG);
    }

    #[test]
    fn test_empty_template() {
        let err = compile("   ").unwrap_err();
        assert_eq!(err.code, ERR_PARSE_NO_ROOT);
    }

    #[test]
    fn test_interpolation_segmentation() {
        let recipe = compile("<p>Hello {{ name }}!</p>").unwrap();
        let children = recipe.template.children.borrow();
        assert_eq!(children.len(), 3);
        assert!(matches!(&children[0], TemplateNode::Text(t) if t == "Hello "));
        assert!(
            matches!(&children[1], TemplateNode::Interpolation(e) if e.source == "name")
        );
        assert!(matches!(&children[2], TemplateNode::Text(t) if t == "!"));
    }

    #[test]
    fn test_whitespace_only_literals_dropped() {
        let recipe = compile("<div>\n  {{ a }}\n</div>").unwrap();
        let children = recipe.template.children.borrow();
        assert_eq!(children.len(), 1);
        assert!(matches!(&children[0], TemplateNode::Interpolation(_)));
    }

    #[test]
    fn test_event_attribute_parsed_as_expression() {
        let recipe = compile(r#"<button onclick="save">Go</button>"#).unwrap();
        let root = &recipe.template;
        assert!(root.attributes.is_empty());
        assert_eq!(root.events.len(), 1);
        assert_eq!(root.events[0].0, "onclick");
        assert_eq!(root.events[0].1.source, "save");
    }

    #[test]
    fn test_unknown_attribute_dropped() {
        // href is not legal on div; dropped with a warning, not an error
        let recipe = compile(r#"<div href="x" id="ok"></div>"#).unwrap();
        assert_eq!(
            recipe.template.attributes,
            vec![("id".to_string(), "ok".to_string())]
        );
    }

    #[test]
    fn test_custom_tag_resolves_through_registry() {
        let registry = Registry::new();
        registry
            .define(
                "todo-item",
                RecipeOptions::new("TodoItem")
                    .template("<li>{{ title }}</li>")
                    .prop("title"),
            )
            .unwrap();

        let recipe = Recipe::compile(
            RecipeOptions::new("App")
                .template(r#"<ul><todo-item title="a" bogus="b"></todo-item></ul>"#),
            &registry,
        )
        .unwrap();

        let children = recipe.template.children.borrow();
        match &children[0] {
            TemplateNode::Block(block) => {
                assert!(block.is_component());
                match &block.kind {
                    BlockKind::Component { recipe, id_seed } => {
                        assert_eq!(recipe.name, "TodoItem");
                        assert_eq!(id_seed, "todo-item#0");
                    }
                    other => panic!("unexpected kind: {:?}", other),
                }
                // declared prop kept, unknown prop dropped
                assert_eq!(
                    block.attributes,
                    vec![("title".to_string(), "a".to_string())]
                );
            }
            other => panic!("unexpected child: {:?}", other),
        }
    }

    #[test]
    fn test_component_ids_are_ordinal() {
        let registry = Registry::new();
        registry
            .define("item", RecipeOptions::new("Item").template("<li></li>"))
            .unwrap();
        let recipe = Recipe::compile(
            RecipeOptions::new("App").template("<ul><item></item><item></item></ul>"),
            &registry,
        )
        .unwrap();

        let children = recipe.template.children.borrow();
        let seeds: Vec<String> = children
            .iter()
            .filter_map(|node| match node {
                TemplateNode::Block(b) => match &b.kind {
                    BlockKind::Component { id_seed, .. } => Some(id_seed.clone()),
                    _ => None,
                },
                _ => None,
            })
            .collect();
        assert_eq!(seeds, vec!["item#0".to_string(), "item#1".to_string()]);
    }

    #[test]
    fn test_unresolved_custom_tag() {
        let err = compile("<widget></widget>").unwrap_err();
        assert_eq!(err.code, ERR_PARSE_UNRESOLVED_TAG);
    }

    #[test]
    fn test_unknown_directive_command() {
        let err = compile(r#"<div @zap="x"></div>"#).unwrap_err();
        assert_eq!(err.code, ERR_PARSE_UNKNOWN_DIRECTIVE);
    }

    #[test]
    fn test_directive_requires_target() {
        let err = compile(r#"<div @bind="x"></div>"#).unwrap_err();
        assert_eq!(err.code, ERR_PARSE_BAD_DIRECTIVE);
    }

    #[test]
    fn test_directive_with_params() {
        let registry = Registry::new();
        registry
            .define(
                "panel",
                RecipeOptions::new("Panel")
                    .template("<div><slot></slot></div>")
                    .event("save"),
            )
            .unwrap();
        let recipe = Recipe::compile(
            RecipeOptions::new("App")
                .template(r#"<div><panel @on:save.native="handler"></panel></div>"#),
            &registry,
        )
        .unwrap();
        let children = recipe.template.children.borrow();
        match &children[0] {
            TemplateNode::Block(block) => assert_eq!(block.directives.len(), 1),
            other => panic!("unexpected child: {:?}", other),
        }
    }

    #[test]
    fn test_slot_declarations_recorded() {
        let recipe =
            compile(r#"<div><slot name="header"></slot><slot>fallback</slot></div>"#).unwrap();
        assert!(recipe.slots.contains("header"));
        assert!(recipe.slots.contains("default"));

        let children = recipe.template.children.borrow();
        match &children[0] {
            TemplateNode::Block(block) => {
                assert!(matches!(&block.kind, BlockKind::Slot { name } if name == "header"));
            }
            other => panic!("unexpected child: {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_slot_name() {
        let err = compile("<div><slot></slot><slot></slot></div>").unwrap_err();
        assert_eq!(err.code, ERR_PARSE_DUPLICATE_SLOT);
    }

    #[test]
    fn test_bad_expression_fails_at_compile() {
        let err = compile("<p>{{ 1 + }}</p>").unwrap_err();
        assert!(err.is_parse());
    }
}
