use scraper::{ElementRef, Html};
use std::fmt::Write;

/// Elements that never carry a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// A node of the parsed document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// A loaded page reduced to its `<head>` and `<body>` content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub head: Vec<Node>,
    pub body: Vec<Node>,
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn element(name: &str, children: Vec<Node>) -> Self {
        Node::Element(Element {
            name: name.to_string(),
            attrs: Vec::new(),
            children,
        })
    }

    /// Concatenated text of this node and all of its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => el.collect_text(out),
        }
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Text(text) => escape_into(text, out),
            Node::Element(el) => {
                let _ = write!(out, "<{}", el.name);
                for (name, value) in &el.attrs {
                    let _ = write!(out, " {name}=\"");
                    escape_into(value, out);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&el.name.as_str()) {
                    return;
                }
                for child in &el.children {
                    child.write_html(out);
                }
                let _ = write!(out, "</{}>", el.name);
            }
        }
    }
}

impl Element {
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            child.collect_text(out);
        }
    }
}

impl Document {
    /// Parse an HTML string into a tree, dropping comments and doctype nodes.
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut doc = Document::default();

        for child in parsed.root_element().children() {
            let Some(el) = ElementRef::wrap(child) else {
                continue;
            };
            match el.value().name() {
                "head" => doc.head = convert_children(el),
                "body" => doc.body = convert_children(el),
                _ => {}
            }
        }

        doc
    }

    /// Serialize back to a complete HTML document.
    pub fn to_html(&self) -> String {
        let mut out = String::from("<!DOCTYPE html><html><head>");
        for node in &self.head {
            node.write_html(&mut out);
        }
        out.push_str("</head><body>");
        for node in &self.body {
            node.write_html(&mut out);
        }
        out.push_str("</body></html>");
        out
    }

    /// Serialized `<body>` content only.
    pub fn body_html(&self) -> String {
        let mut out = String::new();
        for node in &self.body {
            node.write_html(&mut out);
        }
        out
    }
}

fn convert_children(element: ElementRef<'_>) -> Vec<Node> {
    element
        .children()
        .filter_map(|child| match child.value() {
            scraper::Node::Text(text) => Some(Node::Text(String::from(&**text))),
            scraper::Node::Element(_) => ElementRef::wrap(child).map(convert_element),
            _ => None,
        })
        .collect()
}

fn convert_element(element: ElementRef<'_>) -> Node {
    let value = element.value();
    Node::Element(Element {
        name: value.name().to_string(),
        attrs: value
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        children: convert_children(element),
    })
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_head_and_body() {
        let doc = Document::parse(
            "<html><head><title>T</title></head><body><!-- c --><p class=\"x\">Hi</p></body></html>",
        );
        assert_eq!(doc.head, vec![Node::element("title", vec![Node::text("T")])]);
        match &doc.body[..] {
            [Node::Element(p)] => {
                assert_eq!(p.name, "p");
                assert_eq!(p.attrs, vec![("class".to_string(), "x".to_string())]);
                assert_eq!(p.children, vec![Node::text("Hi")]);
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_serialize_escapes_and_voids() {
        let doc = Document {
            head: Vec::new(),
            body: vec![Node::element(
                "p",
                vec![
                    Node::text("a < b & c"),
                    Node::element("br", Vec::new()),
                ],
            )],
        };
        assert_eq!(doc.body_html(), "<p>a &lt; b &amp; c<br></p>");
        assert_eq!(
            doc.to_html(),
            "<!DOCTYPE html><html><head></head><body><p>a &lt; b &amp; c<br></p></body></html>"
        );
    }

    #[test]
    fn test_text_content_is_recursive() {
        let node = Node::element(
            "div",
            vec![
                Node::text("one "),
                Node::element("b", vec![Node::text("two")]),
            ],
        );
        assert_eq!(node.text_content(), "one two");
    }
}
