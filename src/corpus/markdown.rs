use pulldown_cmark::{Event, Parser, Tag, TagEnd};

/// Collect the prose of a markdown document, one document per block
/// (skip code blocks and inline code)
pub fn documents(content: &str) -> Vec<String> {
    let mut docs = Vec::new();
    let mut current = String::new();
    let mut in_code_block = false;

    for event in Parser::new(content) {
        match event {
            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
            }
            Event::Text(text) if !in_code_block => {
                current.push_str(&text);
            }
            Event::SoftBreak | Event::HardBreak => {
                current.push(' ');
            }
            Event::End(TagEnd::Paragraph)
            | Event::End(TagEnd::Heading(_))
            | Event::End(TagEnd::Item) => {
                flush(&mut current, &mut docs);
            }
            _ => {}
        }
    }

    flush(&mut current, &mut docs);
    docs
}

fn flush(current: &mut String, docs: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs_and_headings() {
        let content = "# عنوان\n\nفقرة اولى\nتكملة\n\n- عنصر\n";
        let docs = documents(content);
        assert_eq!(docs, vec!["عنوان", "فقرة اولى تكملة", "عنصر"]);
    }

    #[test]
    fn test_code_blocks_are_skipped() {
        let content = "نص\n\n```\nlet x = 1;\n```\n\nنهاية";
        let docs = documents(content);
        assert_eq!(docs, vec!["نص", "نهاية"]);
    }
}
