//! `source_code_hash` computation.
//!
//! Strips comments, removes tokens equal to the definition's own name, and
//! normalizes whitespace before hashing, so a rename-only edit does not
//! change the hash (see the "Hash stability under rename" testable
//! property).

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

static BLOCK_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\*[\s\S]*?\*/").unwrap());
static LINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"//[^\n]*").unwrap());
static HASH_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"#[^\n]*").unwrap());

/// Strip comments for languages that use C-style `//` and `/* */` comments
/// (JavaScript, TypeScript, Rust, Go, C, C++, C#). Python-family languages
/// use `#` line comments instead; other languages fall through unchanged,
/// matching the conservative, language-dispatched approach of the original
/// comment stripper.
pub fn strip_comments(language: &str, source: &str) -> String {
    match language {
        "javascript" | "typescript" | "tsx" | "jsx" | "rust" | "go" | "c" | "cpp" | "csharp" => {
            let without_block = BLOCK_COMMENT.replace_all(source, "");
            LINE_COMMENT.replace_all(&without_block, "").into_owned()
        }
        "python" => HASH_COMMENT.replace_all(source, "").into_owned(),
        _ => source.to_string(),
    }
}

/// Compute the stable content hash for a definition.
///
/// `def_name` of `"anonymous"` is treated as having no name to strip (an
/// anonymous definition's hash is sensitive to every identifier it uses,
/// including any literal occurrence of the word "anonymous").
pub fn hash_source_code(def_name: &str, source_code_cleaned: &str) -> String {
    let normalized = normalize_whitespace(source_code_cleaned);
    let body = if def_name == "anonymous" {
        normalized
    } else {
        strip_name_tokens(&normalized, def_name)
    };
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn strip_name_tokens(source: &str, name: &str) -> String {
    let pattern = format!(r"\b{}\b", regex::escape(name));
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(source, "").into_owned(),
        Err(_) => source.to_string(),
    }
}

fn normalize_whitespace(source: &str) -> String {
    source
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_without_body_change_preserves_hash() {
        let h1 = hash_source_code("foo", &strip_comments("javascript", "function foo() { return 1; }"));
        let h2 = hash_source_code("bar", &strip_comments("javascript", "function bar() { return 1; }"));
        assert_eq!(h1, h2);
    }

    #[test]
    fn body_change_changes_hash() {
        let h1 = hash_source_code("bar", &strip_comments("javascript", "function bar() { return 1; }"));
        let h3 = hash_source_code("bar", &strip_comments("javascript", "function bar() { return 2; }"));
        assert_ne!(h1, h3);
    }

    #[test]
    fn comments_do_not_affect_hash() {
        let h1 = hash_source_code(
            "foo",
            &strip_comments("javascript", "function foo() { return 1; }"),
        );
        let h2 = hash_source_code(
            "foo",
            &strip_comments(
                "javascript",
                "// a helpful comment\nfunction foo() { return 1; } /* trailing */",
            ),
        );
        assert_eq!(h1, h2);
    }

    #[test]
    fn crlf_is_normalized() {
        let h1 = hash_source_code("foo", &strip_comments("python", "def foo():\n    return 1\n"));
        let h2 = hash_source_code(
            "foo",
            &strip_comments("python", "def foo():\r\n    return 1\r\n"),
        );
        assert_eq!(h1, h2);
    }
}
