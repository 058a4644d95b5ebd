//! `sitemap.xml` rendering for the public site.

use chrono::{DateTime, Utc};

use crate::models::{posts::PostWithTags, tags::TagWithCount};

struct Entry {
    loc: String,
    last_modified: DateTime<Utc>,
    change_frequency: &'static str,
    priority: f32,
}

/// Home page, tag index, every published post and every public tag page.
pub fn render(
    base_url: &str,
    posts: &[PostWithTags],
    tags: &[TagWithCount],
    now: DateTime<Utc>,
) -> String {
    let mut entries = vec![
        Entry {
            loc: base_url.to_string(),
            last_modified: now,
            change_frequency: "daily",
            priority: 1.0,
        },
        Entry {
            loc: format!("{base_url}/tags"),
            last_modified: now,
            change_frequency: "weekly",
            priority: 0.5,
        },
    ];

    entries.extend(posts.iter().map(|p| Entry {
        loc: format!("{base_url}/blog/{}", p.post.slug),
        last_modified: p.post.updated_at,
        change_frequency: "weekly",
        priority: 0.8,
    }));

    entries.extend(tags.iter().map(|t| Entry {
        loc: format!("{base_url}/tags/{}", urlencoding::encode(&t.name)),
        last_modified: now,
        change_frequency: "weekly",
        priority: 0.6,
    }));

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries {
        xml.push_str(&format!(
            "<url>\n<loc>{}</loc>\n<lastmod>{}</lastmod>\n<changefreq>{}</changefreq>\n<priority>{:.1}</priority>\n</url>\n",
            escape(&entry.loc),
            entry.last_modified.to_rfc3339(),
            entry.change_frequency,
            entry.priority,
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::posts::Post;

    #[test]
    fn lists_pages_posts_and_encoded_tags() {
        let now = Utc::now();
        let post = PostWithTags {
            post: Post {
                id: Uuid::now_v7(),
                title: "Hello".into(),
                slug: "hello-abc123".into(),
                content: String::new(),
                published: true,
                image_url: None,
                meta_description: None,
                created_at: now,
                updated_at: now,
            },
            tags: Vec::new(),
        };
        let tag = TagWithCount {
            id: Uuid::now_v7(),
            name: "c++ & rust".into(),
            post_count: 1,
        };

        let xml = render("https://blog.test", &[post], &[tag], now);

        assert!(xml.contains("<loc>https://blog.test</loc>"));
        assert!(xml.contains("<loc>https://blog.test/tags</loc>"));
        assert!(xml.contains("<loc>https://blog.test/blog/hello-abc123</loc>"));
        assert!(xml.contains("<loc>https://blog.test/tags/c%2B%2B%20%26%20rust</loc>"));
        assert!(xml.contains("<priority>0.8</priority>"));
        assert_eq!(xml.matches("<url>").count(), 4);
    }
}
