//! Code-block extraction from markdown-ish chat text
//!
//! Assistant replies arrive as prose with fenced code blocks. This
//! pulls the blocks out with their language tags so the frontend can
//! offer to run them.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::LanguageId;

static FENCE_RES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"(?s)```(\w+)?\n?(.*?)```").expect("backtick fence pattern is valid"),
        Regex::new(r"(?s)~~~(\w+)?\n?(.*?)~~~").expect("tilde fence pattern is valid"),
    ]
});

/// One extracted code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Parsed language when the fence tag names a supported one
    pub language: Option<LanguageId>,

    /// The raw fence tag, lowercased ("python" when untagged)
    pub tag: String,

    /// Block contents, trimmed
    pub code: String,
}

/// Extract fenced code blocks (``` and ~~~) from text.
///
/// Untagged fences default to python, matching how chat replies are
/// usually written for this tool.
pub fn extract_code_blocks(text: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();

    for fence in FENCE_RES.iter() {
        for caps in fence.captures_iter(text) {
            let tag = caps
                .get(1)
                .map(|m| m.as_str().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "python".to_owned());
            let code = caps
                .get(2)
                .map(|m| m.as_str().trim().to_owned())
                .unwrap_or_default();

            blocks.push(CodeBlock {
                language: tag.parse().ok(),
                tag,
                code,
            });
        }
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_tagged_block() {
        let text = "Here you go:\n```python\nprint('hi')\n```\nEnjoy!";
        let blocks = extract_code_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, Some(LanguageId::Python));
        assert_eq!(blocks[0].code, "print('hi')");
    }

    #[test]
    fn untagged_block_defaults_to_python() {
        let blocks = extract_code_blocks("```\nx = 1\n```");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].tag, "python");
        assert_eq!(blocks[0].language, Some(LanguageId::Python));
    }

    #[test]
    fn unknown_tag_keeps_raw_tag() {
        let blocks = extract_code_blocks("```rust\nfn main() {}\n```");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, None);
        assert_eq!(blocks[0].tag, "rust");
    }

    #[test]
    fn extracts_multiple_blocks() {
        let text = "```c\nint main() {}\n```\ntext\n```go\npackage main\n```";
        let blocks = extract_code_blocks(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].language, Some(LanguageId::C));
        assert_eq!(blocks[1].language, Some(LanguageId::Go));
    }

    #[test]
    fn tilde_fences_work_too() {
        let blocks = extract_code_blocks("~~~cpp\nint x;\n~~~");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, Some(LanguageId::Cpp));
    }

    #[test]
    fn no_fences_yields_nothing() {
        assert!(extract_code_blocks("just prose, no code").is_empty());
    }
}
