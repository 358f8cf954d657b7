//! Reduces a rendered page to a minimal, explicitly marked text skeleton.
//!
//! The transformation is a pure function over [`Document`]: the browser
//! hands over its rendered DOM as HTML, the tree is rewritten here, and the
//! result is written back into the page before printing.

pub mod tree;

pub use tree::{Document, Element, Node};

/// Tags removed together with their whole subtree.
const BLOCKED_TAGS: &[&str] = &[
    "img", "picture", "svg", "canvas", "video", "audio", "source", "track", "object", "embed",
    "script", "noscript", "style", "link", "iframe", "frame", "nav", "header", "footer", "aside",
];

/// ARIA roles equivalent to the blocked landmarks and overlays.
const BLOCKED_ROLES: &[&str] = &[
    "img",
    "navigation",
    "banner",
    "contentinfo",
    "complementary",
    "dialog",
    "alertdialog",
];

/// Class-name fragments that mark ads, share widgets, comments and overlays.
const BLOCKED_CLASS_HOOKS: &[&str] = &[
    "banner", "share", "social", "comment", "popup", "modal", "advert",
];

/// Words that mark ads only when they stand alone inside a class name.
const BLOCKED_CLASS_WORDS: &[&str] = &["ad", "ads"];

const URL_MARKER: &str = "[URL] ";

/// Marker text prepended to the given tag, if any.
fn prefix_for(name: &str, inside_pre: bool) -> Option<&'static str> {
    match name {
        "h1" => Some("[H1] "),
        "h2" => Some("[H2] "),
        "h3" => Some("[H3] "),
        "h4" => Some("[H4] "),
        "p" => Some("[P] "),
        "pre" => Some("[CODE] "),
        "code" if !inside_pre => Some("[CODE] "),
        "li" => Some("[LI] "),
        _ => None,
    }
}

/// A page after sanitization, ready to be written back and printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedDocument {
    pub url: String,
    pub document: Document,
}

impl SanitizedDocument {
    pub fn to_html(&self) -> String {
        self.document.to_html()
    }
}

/// Parse `html` and sanitize it.
pub fn sanitize_html(html: &str, url: &str) -> SanitizedDocument {
    SanitizedDocument {
        url: url.to_string(),
        document: sanitize(Document::parse(html), url),
    }
}

/// Apply every sanitization step, in order, to a parsed document.
pub fn sanitize(mut doc: Document, url: &str) -> Document {
    for nodes in [&mut doc.head, &mut doc.body] {
        remove_blocked(nodes);
        strip_attributes(nodes);
        prune_empty(nodes);
    }
    add_prefixes(&mut doc.body, false);
    insert_url_marker(&mut doc.body, url);
    collapse_whitespace(&mut doc.head);
    collapse_whitespace(&mut doc.body);
    doc
}

fn is_blocked(el: &Element) -> bool {
    if BLOCKED_TAGS.contains(&el.name.as_str()) {
        return true;
    }

    el.attrs.iter().any(|(name, value)| match name.as_str() {
        "role" => {
            let role = value.trim().to_ascii_lowercase();
            BLOCKED_ROLES.contains(&role.as_str())
        }
        "class" => value.split_whitespace().any(is_blocked_class),
        _ => false,
    })
}

fn is_blocked_class(class: &str) -> bool {
    let class = class.to_ascii_lowercase();
    if BLOCKED_CLASS_HOOKS.iter().any(|hook| class.contains(hook)) {
        return true;
    }
    class
        .split(['-', '_'])
        .any(|word| BLOCKED_CLASS_WORDS.contains(&word))
}

fn remove_blocked(nodes: &mut Vec<Node>) {
    nodes.retain(|node| match node {
        Node::Element(el) => !is_blocked(el),
        Node::Text(_) => true,
    });
    for node in nodes.iter_mut() {
        if let Node::Element(el) = node {
            remove_blocked(&mut el.children);
        }
    }
}

/// Drop every attribute. Event handlers and `data-*` go with the rest.
fn strip_attributes(nodes: &mut [Node]) {
    for node in nodes {
        if let Node::Element(el) = node {
            el.attrs.clear();
            strip_attributes(&mut el.children);
        }
    }
}

/// Depth-first: children are resolved before their parent is judged.
fn prune_empty(nodes: &mut Vec<Node>) {
    for node in nodes.iter_mut() {
        if let Node::Element(el) = node {
            prune_empty(&mut el.children);
        }
    }
    nodes.retain(|node| match node {
        Node::Element(el) => el.name == "br" || !node.text_content().trim().is_empty(),
        Node::Text(_) => true,
    });
}

fn add_prefixes(nodes: &mut [Node], inside_pre: bool) {
    for node in nodes {
        let Node::Element(el) = node else {
            continue;
        };
        let child_inside_pre = inside_pre || el.name == "pre";
        add_prefixes(&mut el.children, child_inside_pre);

        let Some(prefix) = prefix_for(&el.name, inside_pre) else {
            continue;
        };
        // Only the element's own leading text counts; a nested element of the
        // same tag carries its own marker.
        let marker = prefix.trim_end();
        let own_text = match el.children.first() {
            Some(Node::Text(first)) => first.trim_start(),
            _ => "",
        };
        if own_text.starts_with(marker) {
            continue;
        }
        match el.children.first_mut() {
            Some(Node::Text(first)) => {
                *first = format!("{prefix}{}", first.trim_start());
            }
            _ => el.children.insert(0, Node::text(prefix)),
        }
    }
}

fn insert_url_marker(body: &mut Vec<Node>, url: &str) {
    let marker = format!("{URL_MARKER}{url}");
    let present = matches!(
        body.first(),
        Some(Node::Element(el)) if el.name == "div" && el.text_content().trim() == marker
    );
    if !present {
        body.insert(0, Node::element("div", vec![Node::text(marker)]));
    }
}

/// Collapse whitespace runs to one space and drop whitespace-only text between tags.
fn collapse_whitespace(nodes: &mut Vec<Node>) {
    nodes.retain_mut(|node| match node {
        Node::Text(text) => {
            if text.trim().is_empty() {
                return false;
            }
            *text = collapse_runs(text);
            true
        }
        Node::Element(el) => {
            collapse_whitespace(&mut el.children);
            true
        }
    });
}

fn collapse_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
