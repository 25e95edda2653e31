use crate::models::{Block, Inline};

/// Longest auto-derived title, in characters.
pub const DERIVED_TITLE_MAX_CHARS: usize = 50;

/// Decode a stored `content` string.
///
/// The editor writes a JSON array of blocks. Anything else is older markdown/plain
/// text and becomes one paragraph per line.
pub fn parse_content(raw: &str) -> Vec<Block> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    if let Ok(blocks) = serde_json::from_str::<Vec<Block>>(raw) {
        return blocks;
    }

    raw.lines().map(Block::paragraph).collect()
}

pub fn serialize_content(blocks: &[Block]) -> Result<String, serde_json::Error> {
    serde_json::to_string(blocks)
}

/// Plain text of a block sequence, one line per block.
pub fn plain_text(blocks: &[Block]) -> String {
    let mut out = String::new();
    for b in blocks {
        push_block_text(b, &mut out);
    }
    out
}

fn push_block_text(block: &Block, out: &mut String) {
    match block {
        Block::Paragraph { children } | Block::Heading { children, .. } => {
            push_inline_text(children, out);
            out.push('\n');
        }
        Block::List { items, .. } => {
            for item in items {
                for b in item {
                    push_block_text(b, out);
                }
            }
        }
        Block::Image { alt, .. } => {
            if !alt.trim().is_empty() {
                out.push_str(alt);
                out.push('\n');
            }
        }
    }
}

fn push_inline_text(inlines: &[Inline], out: &mut String) {
    for i in inlines {
        match i {
            Inline::Text { text } => out.push_str(text),
            Inline::Link { children, .. } => push_inline_text(children, out),
        }
    }
}

/// First non-blank line of the content, trimmed and capped. `None` when the content
/// has no text at all.
pub fn derive_title(blocks: &[Block]) -> Option<String> {
    let text = plain_text(blocks);
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    Some(line.chars().take(DERIVED_TITLE_MAX_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_block_json() {
        let raw = r#"[{"type":"heading","level":1,"children":[{"type":"text","text":"Intro"}]},
                      {"type":"image","src":"/f/1.png"}]"#;
        let blocks = parse_content(raw);
        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[1], Block::Image { .. }));
    }

    #[test]
    fn test_parse_legacy_text() {
        let blocks = parse_content("# Title\n\nbody");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], Block::paragraph("# Title"));
        assert!(parse_content("   ").is_empty());
    }

    #[test]
    fn test_plain_text_walks_lists_and_links() {
        let blocks = vec![
            Block::List {
                ordered: false,
                items: vec![
                    vec![Block::paragraph("one")],
                    vec![Block::Paragraph {
                        children: vec![Inline::Link {
                            href: "https://arxiv.org".to_string(),
                            children: vec![Inline::Text {
                                text: "two".to_string(),
                            }],
                        }],
                    }],
                ],
            },
            Block::Image {
                src: "x.png".to_string(),
                alt: String::new(),
            },
        ];
        assert_eq!(plain_text(&blocks), "one\ntwo\n");
    }

    #[test]
    fn test_derive_title_skips_blank_lines_and_caps_length() {
        let long = "字".repeat(80);
        let blocks = vec![Block::empty_paragraph(), Block::paragraph(format!("  {long}  "))];
        let title = derive_title(&blocks).expect("has text");
        assert_eq!(title.chars().count(), DERIVED_TITLE_MAX_CHARS);
        assert_eq!(derive_title(&[Block::empty_paragraph()]), None);
    }
}
