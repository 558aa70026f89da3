//! Parses a language model's response into `(short, full)` summaries.
//!
//! The model is instructed to emit a short gist delimited by `<gist>` and
//! `</gist>`, followed by a markdown body. Absence of the delimiters is a
//! failure, propagated to the caller's retry policy.

use std::collections::HashMap;

use ingest_core::Id;

use crate::error::{Result, SummarizerError};

/// Splits `response` into `(text_between_gist_tags, text_after_closing_gist_tag)`.
pub fn parse_gist(response: &str) -> Result<(String, String)> {
    let after_open = response
        .split_once("<gist>")
        .ok_or(SummarizerError::MalformedResponse)?
        .1;
    let (short, rest) = after_open
        .split_once("</gist>")
        .ok_or(SummarizerError::MalformedResponse)?;

    Ok((short.trim().to_string(), rest.trim().to_string()))
}

/// Parses a joint response covering a whole SCC group: one
/// `<entity id="ID">...<gist>...</gist>...body...</entity>` section per
/// member of `ids`. Used when a group of size > 1 is summarized with a
/// single prompt instead of one call per member.
pub fn parse_joint_gist(response: &str, ids: &[Id]) -> Result<HashMap<Id, (String, String)>> {
    let mut out = HashMap::with_capacity(ids.len());

    for &id in ids {
        let open_tag = format!("<entity id=\"{id}\">");
        let after_open = response
            .split_once(&open_tag)
            .ok_or(SummarizerError::MissingJointSection(id))?
            .1;
        let section = after_open
            .split_once("</entity>")
            .ok_or(SummarizerError::MissingJointSection(id))?
            .0;
        out.insert(id, parse_gist(section)?);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_gist_and_body() {
        let response = "<gist>\nshort summary\n</gist>\n\n### Summary\nfull body here";
        let (short, full) = parse_gist(response).unwrap();
        assert_eq!(short, "short summary");
        assert_eq!(full, "### Summary\nfull body here");
    }

    #[test]
    fn missing_open_tag_fails() {
        assert!(parse_gist("no tags here").is_err());
    }

    #[test]
    fn missing_close_tag_fails() {
        assert!(parse_gist("<gist>unterminated").is_err());
    }

    #[test]
    fn joint_response_splits_by_entity() {
        let response = r#"
<entity id="1">
<gist>caller gist</gist>
caller body
</entity>
<entity id="2">
<gist>callee gist</gist>
callee body
</entity>
"#;
        let parsed = parse_joint_gist(response, &[1, 2]).unwrap();
        assert_eq!(parsed.get(&1).unwrap().0, "caller gist");
        assert_eq!(parsed.get(&2).unwrap().0, "callee gist");
        assert_eq!(parsed.get(&2).unwrap().1, "callee body");
    }

    #[test]
    fn joint_response_missing_a_member_section_fails() {
        let response = r#"<entity id="1"><gist>only one</gist>body</entity>"#;
        assert!(parse_joint_gist(response, &[1, 2]).is_err());
    }
}
