//! Renderer for the discussion platform's structured content model: a typed
//! node tree walked recursively into markdown. Pure transformation; anything
//! unparsable falls back to `None` so callers can use the flat raw content.

use serde_json::Value;

#[derive(Debug)]
enum DocNode {
    Doc(Vec<DocNode>),
    Paragraph(Vec<DocNode>),
    Text { text: String, marks: Vec<Mark> },
    Image { url: Option<String> },
    BulletList(Vec<DocNode>),
    OrderedList(Vec<DocNode>),
    ListItem(Vec<DocNode>),
    CodeBlock(Vec<DocNode>),
    OpenGraph { url: Option<String> },
}

#[derive(Debug)]
enum Mark {
    Strong,
    Em,
    Link(String),
}

/// Parse and render a serialized document model. Returns `None` when the
/// model is absent, unparsable, or renders to nothing.
pub fn render_model(json_model: &str) -> Option<String> {
    let value: Value = serde_json::from_str(json_model).ok()?;
    let root = from_value(&value)?;
    let rendered = render_block(&root, 0);
    let trimmed = rendered.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn children(value: &Value) -> Vec<DocNode> {
    value["content"]
        .as_array()
        .map(|nodes| nodes.iter().filter_map(from_value).collect())
        .unwrap_or_default()
}

fn from_value(value: &Value) -> Option<DocNode> {
    let node = match value["type"].as_str()? {
        "doc" => DocNode::Doc(children(value)),
        "paragraph" => DocNode::Paragraph(children(value)),
        "text" => DocNode::Text {
            text: value["text"].as_str().unwrap_or_default().to_string(),
            marks: value["marks"]
                .as_array()
                .map(|marks| marks.iter().filter_map(mark_from_value).collect())
                .unwrap_or_default(),
        },
        "image" => DocNode::Image {
            url: attr_url(value),
        },
        "bulletList" => DocNode::BulletList(children(value)),
        "orderedList" => DocNode::OrderedList(children(value)),
        "listItem" => DocNode::ListItem(children(value)),
        "code_block" | "codeBlock" => DocNode::CodeBlock(children(value)),
        "openGraph" => DocNode::OpenGraph {
            url: attr_url(value),
        },
        // Unknown node kinds are skipped, not fatal.
        _ => return None,
    };
    Some(node)
}

fn attr_url(value: &Value) -> Option<String> {
    value["attrs"]["url"]
        .as_str()
        .or_else(|| value["attrs"]["src"].as_str())
        .map(|url| url.to_string())
}

fn mark_from_value(value: &Value) -> Option<Mark> {
    match value["type"].as_str()? {
        "strong" => Some(Mark::Strong),
        "em" => Some(Mark::Em),
        "link" => value["attrs"]["href"]
            .as_str()
            .map(|href| Mark::Link(href.to_string())),
        // Mentions already carry their display text in the text node.
        "mention" => None,
        _ => None,
    }
}

fn render_inline<'a, I>(nodes: I) -> String
where
    I: IntoIterator<Item = &'a DocNode>,
{
    let mut out = String::new();
    for node in nodes {
        match node {
            DocNode::Text { text, marks } => {
                let mut piece = text.clone();
                for mark in marks {
                    piece = match mark {
                        Mark::Strong => format!("**{piece}**"),
                        Mark::Em => format!("*{piece}*"),
                        Mark::Link(href) => format!("[{piece}]({href})"),
                    };
                }
                out.push_str(&piece);
            }
            DocNode::Image { url: Some(url) } | DocNode::OpenGraph { url: Some(url) } => {
                out.push_str(url);
            }
            DocNode::Image { url: None } | DocNode::OpenGraph { url: None } => {}
            _ => out.push_str(&render_block(node, 0)),
        }
    }
    out
}

fn render_block(node: &DocNode, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    match node {
        DocNode::Doc(nodes) => nodes
            .iter()
            .map(|n| render_block(n, indent))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        DocNode::Paragraph(nodes) => {
            let line = render_inline(nodes);
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        }
        DocNode::Text { .. } | DocNode::Image { .. } | DocNode::OpenGraph { .. } => {
            let line = render_inline(std::slice::from_ref(node));
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        }
        DocNode::BulletList(items) => items
            .iter()
            .map(|item| format!("{pad}- {}", render_item(item, indent)))
            .collect::<Vec<_>>()
            .join("\n"),
        DocNode::OrderedList(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| format!("{pad}{}. {}", i + 1, render_item(item, indent)))
            .collect::<Vec<_>>()
            .join("\n"),
        DocNode::ListItem(nodes) => render_inline(nodes),
        DocNode::CodeBlock(nodes) => {
            format!("```\n{}\n```", render_inline(nodes))
        }
    }
}

fn render_item(item: &DocNode, indent: usize) -> String {
    match item {
        DocNode::ListItem(nodes) => {
            // Nested lists inside an item continue on their own lines.
            let (inline, nested): (Vec<&DocNode>, Vec<&DocNode>) = nodes
                .iter()
                .partition(|n| !matches!(n, DocNode::BulletList(_) | DocNode::OrderedList(_)));
            let mut line = render_inline(inline);
            for list in nested {
                line.push('\n');
                line.push_str(&render_block(list, indent + 1));
            }
            line
        }
        other => render_block(other, indent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraph_with_marks() {
        let model = serde_json::json!({
            "type": "doc",
            "content": [{
                "type": "paragraph",
                "content": [
                    {"type": "text", "text": "plain "},
                    {"type": "text", "text": "bold", "marks": [{"type": "strong"}]},
                    {"type": "text", "text": " and "},
                    {"type": "text", "text": "linked",
                     "marks": [{"type": "link", "attrs": {"href": "https://example.org"}}]}
                ]
            }]
        });
        assert_eq!(
            render_model(&model.to_string()).unwrap(),
            "plain **bold** and [linked](https://example.org)"
        );
    }

    #[test]
    fn lists_render_with_markers() {
        let model = serde_json::json!({
            "type": "doc",
            "content": [{
                "type": "orderedList",
                "content": [
                    {"type": "listItem", "content": [{"type": "text", "text": "first"}]},
                    {"type": "listItem", "content": [{"type": "text", "text": "second"}]}
                ]
            }]
        });
        assert_eq!(render_model(&model.to_string()).unwrap(), "1. first\n2. second");
    }

    #[test]
    fn code_block_is_fenced() {
        let model = serde_json::json!({
            "type": "doc",
            "content": [{
                "type": "code_block",
                "content": [{"type": "text", "text": "let x = 1;"}]
            }]
        });
        assert_eq!(
            render_model(&model.to_string()).unwrap(),
            "```\nlet x = 1;\n```"
        );
    }

    #[test]
    fn unknown_nodes_are_skipped() {
        let model = serde_json::json!({
            "type": "doc",
            "content": [
                {"type": "videoEmbed", "attrs": {"id": 12}},
                {"type": "paragraph", "content": [{"type": "text", "text": "kept"}]}
            ]
        });
        assert_eq!(render_model(&model.to_string()).unwrap(), "kept");
    }

    #[test]
    fn garbage_input_is_none() {
        assert_eq!(render_model("not json"), None);
        assert_eq!(render_model("{\"type\":\"doc\",\"content\":[]}"), None);
    }
}
