//! Dataview index page template.

/// Folder used when none is given.
pub const DEFAULT_INDEX_FOLDER: &str = "collections";

/// File name of the index page inside its folder.
pub const INDEX_FILE_NAME: &str = "_index.md";

/// Title derived from a folder name: dashes become spaces, each word is
/// capitalized, and ` Index` is appended.
///
/// `finviz-stock` becomes `Finviz Stock Index`.
pub fn default_index_title(folder: &str) -> String {
    let mut title = String::with_capacity(folder.len() + 6);
    let mut word_start = true;
    for c in folder.replace('-', " ").chars() {
        if c.is_alphabetic() {
            if word_start {
                title.extend(c.to_uppercase());
            } else {
                title.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            title.push(c);
            word_start = true;
        }
    }
    title.push_str(" Index");
    title
}

/// Vault path of the index page for `folder`.
pub fn index_path(folder: &str) -> String {
    format!("{}/{INDEX_FILE_NAME}", folder.trim_end_matches('/'))
}

/// Markdown for an index page listing every non-index note in `folder`.
pub fn render_index_page(folder: &str, title: &str) -> String {
    format!(
        r#"---
title: {title}
type: index
---

# 📚 {title}

```dataview
TABLE date AS "日期", category AS "分類", source AS "來源"
FROM "{folder}"
WHERE type != "index"
SORT date DESC
```
"#
    )
}
