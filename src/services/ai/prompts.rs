//! Prompt construction for the authoring assistant and light cleanup of
//! what comes back.

use crate::{markdown::strip_tags, models::tags::split_tags};

/// How much of a post body is quoted into a prompt.
pub const CONTENT_EXCERPT_CHARS: usize = 1000;

pub const META_DESCRIPTION_MAX_CHARS: usize = 155;

pub fn article_prompt(title: &str, keyword: &str, specs: &str) -> String {
    format!(
        "Write a 100-word SEO-optimized article in English about: {title}\n\
         Focus keyword: {keyword}\n\
         Product specifications: {specs}\n\
         \n\
         Requirements:\n\
         - Use H1, H2, H3, H4 headings (15+ total)\n\
         - Include tables for outline and article\n\
         - Add pros/cons table\n\
         - Include 5 unique FAQs\n\
         - Write in conversational tone with humor\n\
         - Add disclaimer about pricing variations\n\
         - Include Amazon disclosure\n"
    )
}

pub fn meta_description_prompt(content: &str) -> String {
    format!(
        "Write an SEO meta description of at most {META_DESCRIPTION_MAX_CHARS} characters \
         for the following blog post. Reply with the description only, as plain text \
         without quotes.\n\n{}",
        content_excerpt(content)
    )
}

pub fn tag_suggestion_prompt(content: &str) -> String {
    format!(
        "Suggest 5 to 7 short tags for the following blog post. Reply with the tags \
         only, as a single comma-separated line.\n\n{}",
        content_excerpt(content)
    )
}

/// Plain text of an HTML body, cut to `CONTENT_EXCERPT_CHARS` characters.
pub fn content_excerpt(content: &str) -> String {
    strip_tags(content)
        .trim()
        .chars()
        .take(CONTENT_EXCERPT_CHARS)
        .collect()
}

/// Trims model output and drops stray markup and surrounding quotes.
pub fn clean_output(raw: &str) -> String {
    strip_tags(raw)
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '“' | '”'))
        .trim()
        .to_string()
}

/// Comma-separated tag line from a suggestion, one tag per entry.
pub fn parse_tag_suggestion(raw: &str) -> Vec<String> {
    let cleaned = clean_output(raw).replace('\n', ",");
    let mut tags: Vec<String> = Vec::new();
    for tag in split_tags(&cleaned) {
        let tag = tag
            .trim_start_matches(|c: char| c == '#' || c == '-' || c == '*')
            .trim_matches(|c| matches!(c, '"' | '\''))
            .trim()
            .to_string();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Existing tags followed by the suggested ones not already present.
pub fn merge_tags(existing: &str, suggested: &[String]) -> String {
    let mut merged = split_tags(existing);
    for tag in suggested {
        if !merged.contains(tag) {
            merged.push(tag.clone());
        }
    }
    merged.join(", ")
}
