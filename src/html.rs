//! HTML vocabulary tables.
//!
//! Tag and attribute whitelists used by the markup parser and the element
//! renderer: known tags, interactive event attributes, global and per-tag
//! attributes, the boolean-attribute normalization table and void tags.

use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

lazy_static! {
    /// Known HTML tags. Anything else is a custom tag and must resolve to a
    /// component recipe (or be the special `slot` tag).
    pub static ref HTML_TAGS: HashSet<&'static str> = {
        [
            "a", "abbr", "acronym", "address", "applet", "area", "article", "aside", "audio",
            "b", "base", "basefont", "bdi", "bdo", "big", "blockquote", "body", "br", "button",
            "canvas", "caption", "center", "cite", "code", "col", "colgroup", "datalist", "dd",
            "del", "details", "dfn", "dialog", "dir", "div", "dl", "dt", "em", "embed",
            "fieldset", "figcaption", "figure", "font", "footer", "form", "frame", "frameset",
            "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hr", "html", "i", "iframe",
            "img", "input", "ins", "kbd", "label", "legend", "li", "link", "main", "map",
            "mark", "menu", "menuitem", "meta", "meter", "nav", "noframes", "noscript",
            "object", "ol", "optgroup", "option", "output", "p", "param", "picture", "pre",
            "progress", "q", "rp", "rt", "ruby", "s", "samp", "script", "section", "select",
            "small", "source", "span", "strike", "strong", "style", "sub", "summary", "sup",
            "table", "tbody", "td", "textarea", "tfoot", "th", "thead", "time", "title", "tr",
            "track", "tt", "u", "ul", "var", "video", "wbr",
        ]
        .into_iter()
        .collect()
    };

    /// Interactive event attributes. Values of these parse as expressions,
    /// not literal strings.
    pub static ref HTML_EVENT_ATTRIBUTES: HashSet<&'static str> = {
        [
            "onblur", "onchange", "oncontextmenu", "onfocus", "oninput", "oninvalid",
            "onreset", "onsearch", "onselect", "onsubmit", "onkeydown", "onkeypress",
            "onkeyup", "onclick", "ondblclick", "onmousedown", "onmousemove", "onmouseout",
            "onmouseover", "onmouseup", "onwheel", "ondrag", "ondragend", "ondragenter",
            "ondragleave", "ondragover", "ondragstart", "ondrop", "onscroll", "oncopy",
            "oncut", "onpaste",
        ]
        .into_iter()
        .collect()
    };

    /// Attributes legal on every tag.
    pub static ref HTML_GLOBAL_ATTRIBUTES: HashSet<&'static str> = {
        [
            "accesskey", "class", "contextmenu", "contenteditable", "draggable", "dropzone",
            "dir", "hidden", "id", "itemprop", "lang", "slot", "spellcheck", "style",
            "tabindex", "title",
        ]
        .into_iter()
        .collect()
    };

    /// Attribute name -> tags it is legal on.
    pub static ref HTML_TAG_ATTRIBUTES: HashMap<&'static str, &'static [&'static str]> = {
        let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        m.insert("accept", &["form", "input"]);
        m.insert("accept-charset", &["form"]);
        m.insert("action", &["form"]);
        m.insert("align", &["applet", "caption", "col", "colgroup", "hr", "iframe", "img", "table", "tbody", "td", "tfoot", "th", "thead", "tr"]);
        m.insert("alt", &["applet", "area", "img", "input"]);
        m.insert("async", &["script"]);
        m.insert("autocomplete", &["form", "input"]);
        m.insert("autofocus", &["button", "input", "keygen", "select", "textarea"]);
        m.insert("autoplay", &["audio", "video"]);
        m.insert("bgcolor", &["body", "col", "colgroup", "marquee", "table", "tbody", "tfoot", "td", "th", "tr"]);
        m.insert("border", &["img", "object", "table"]);
        m.insert("charset", &["meta", "script"]);
        m.insert("checked", &["command", "input"]);
        m.insert("cite", &["blockquote", "del", "ins", "q"]);
        m.insert("color", &["basefont", "font", "hr"]);
        m.insert("cols", &["textarea"]);
        m.insert("colspan", &["td", "th"]);
        m.insert("content", &["meta"]);
        m.insert("controls", &["audio", "video"]);
        m.insert("coords", &["area"]);
        m.insert("crossorigin", &["audio", "img", "link", "script", "video"]);
        m.insert("data", &["object"]);
        m.insert("datetime", &["del", "ins", "time"]);
        m.insert("default", &["track"]);
        m.insert("defer", &["script"]);
        m.insert("dirname", &["input", "textarea"]);
        m.insert("disabled", &["button", "command", "fieldset", "input", "keygen", "optgroup", "option", "select", "textarea"]);
        m.insert("download", &["a", "area"]);
        m.insert("enctype", &["form"]);
        m.insert("for", &["label", "output"]);
        m.insert("form", &["button", "fieldset", "input", "keygen", "label", "meter", "object", "output", "progress", "select", "textarea"]);
        m.insert("formaction", &["input", "button"]);
        m.insert("headers", &["td", "th"]);
        m.insert("height", &["canvas", "embed", "iframe", "img", "input", "object", "video"]);
        m.insert("high", &["meter"]);
        m.insert("href", &["a", "area", "base", "link"]);
        m.insert("hreflang", &["a", "area", "link"]);
        m.insert("http-equiv", &["meta"]);
        m.insert("integrity", &["link", "script"]);
        m.insert("ismap", &["img"]);
        m.insert("kind", &["track"]);
        m.insert("label", &["track"]);
        m.insert("language", &["script"]);
        m.insert("list", &["input"]);
        m.insert("loop", &["audio", "bgsound", "marquee", "video"]);
        m.insert("low", &["meter"]);
        m.insert("max", &["input", "meter", "progress"]);
        m.insert("maxlength", &["input", "textarea"]);
        m.insert("minlength", &["input", "textarea"]);
        m.insert("media", &["a", "area", "link", "source", "style"]);
        m.insert("method", &["form"]);
        m.insert("min", &["input", "meter"]);
        m.insert("multiple", &["input", "select"]);
        m.insert("muted", &["audio", "video"]);
        m.insert("name", &["button", "form", "fieldset", "iframe", "input", "keygen", "object", "output", "select", "textarea", "map", "meta", "param", "slot"]);
        m.insert("novalidate", &["form"]);
        m.insert("open", &["details"]);
        m.insert("optimum", &["meter"]);
        m.insert("pattern", &["input"]);
        m.insert("ping", &["a", "area"]);
        m.insert("placeholder", &["input", "textarea"]);
        m.insert("poster", &["video"]);
        m.insert("preload", &["audio", "video"]);
        m.insert("readonly", &["input", "textarea"]);
        m.insert("rel", &["a", "area", "link"]);
        m.insert("required", &["input", "select", "textarea"]);
        m.insert("reversed", &["ol"]);
        m.insert("rows", &["textarea"]);
        m.insert("rowspan", &["td", "th"]);
        m.insert("sandbox", &["iframe"]);
        m.insert("shape", &["a", "area"]);
        m.insert("size", &["input", "select"]);
        m.insert("sizes", &["link", "img", "source"]);
        m.insert("span", &["col", "colgroup"]);
        m.insert("src", &["audio", "embed", "iframe", "img", "input", "script", "source", "track", "video"]);
        m.insert("srcdoc", &["iframe"]);
        m.insert("srclang", &["track"]);
        m.insert("srcset", &["img"]);
        m.insert("start", &["ol"]);
        m.insert("step", &["input"]);
        m.insert("summary", &["table"]);
        m.insert("target", &["a", "area", "base", "form"]);
        m.insert("type", &["button", "input", "command", "embed", "object", "script", "source", "style", "menu"]);
        m.insert("usemap", &["img", "input", "object"]);
        m.insert("value", &["button", "option", "input", "li", "meter", "progress", "param"]);
        m.insert("width", &["canvas", "embed", "iframe", "img", "input", "object", "video"]);
        m.insert("wrap", &["textarea"]);
        m
    };

    /// (attribute, tag) pairs with boolean presence semantics.
    pub static ref BOOLEAN_ATTRIBUTES: HashSet<(&'static str, &'static str)> = {
        [
            ("checked", "input"),
            ("selected", "option"),
            ("disabled", "input"),
            ("disabled", "textarea"),
            ("disabled", "button"),
            ("disabled", "select"),
            ("disabled", "option"),
            ("disabled", "optgroup"),
            ("autofocus", "input"),
            ("readonly", "input"),
            ("readonly", "textarea"),
            ("multiple", "select"),
            ("ismap", "img"),
            ("ismap", "input"),
            ("defer", "script"),
            ("noresize", "frame"),
            ("nowrap", "td"),
            ("nowrap", "th"),
            ("noshade", "hr"),
            ("compact", "ul"),
            ("compact", "ol"),
            ("compact", "dl"),
            ("compact", "menu"),
            ("compact", "dir"),
        ]
        .into_iter()
        .collect()
    };

    /// Tags that never take children and close implicitly.
    pub static ref VOID_TAGS: HashSet<&'static str> = {
        [
            "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta",
            "param", "source", "track", "wbr",
        ]
        .into_iter()
        .collect()
    };
}

pub fn is_html_tag(tag: &str) -> bool {
    HTML_TAGS.contains(tag)
}

pub fn is_event_attribute(name: &str) -> bool {
    HTML_EVENT_ATTRIBUTES.contains(name)
}

pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(tag)
}

/// Whether `name` is a legal plain attribute for `tag`, per the global list
/// plus the per-tag table. `data-*` attributes always pass.
pub fn is_known_attribute(tag: &str, name: &str) -> bool {
    if HTML_GLOBAL_ATTRIBUTES.contains(name) || name.starts_with("data-") {
        return true;
    }
    HTML_TAG_ATTRIBUTES
        .get(name)
        .map(|tags| tags.contains(&tag))
        .unwrap_or(false)
}

/// Normalize boolean HTML attributes: a falsy literal drops the attribute,
/// anything else (including the bare form) normalizes to the attribute name.
pub fn normalize_boolean_attribute(tag: &str, name: &str, value: &str) -> Option<String> {
    if !BOOLEAN_ATTRIBUTES.contains(&(name, tag)) {
        return Some(value.to_string());
    }
    match value {
        "false" | "0" => None,
        _ => Some(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_lookup() {
        assert!(is_html_tag("div"));
        assert!(!is_html_tag("todo-item"));
    }

    #[test]
    fn test_event_attribute() {
        assert!(is_event_attribute("onclick"));
        assert!(!is_event_attribute("class"));
    }

    #[test]
    fn test_known_attribute() {
        assert!(is_known_attribute("a", "href"));
        assert!(is_known_attribute("div", "class"));
        assert!(is_known_attribute("span", "data-test"));
        assert!(!is_known_attribute("div", "href"));
    }

    #[test]
    fn test_boolean_normalization() {
        assert_eq!(
            normalize_boolean_attribute("input", "checked", ""),
            Some("checked".to_string())
        );
        assert_eq!(normalize_boolean_attribute("input", "checked", "false"), None);
        assert_eq!(
            normalize_boolean_attribute("div", "title", "x"),
            Some("x".to_string())
        );
    }
}
