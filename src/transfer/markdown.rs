//! Markdown rendition of the prompt library, for the human-readable export.

use std::collections::HashSet;

use crate::models::{CollectionNode, PromptDetail};
use crate::store::prompts::PromptFilter;
use crate::store::{Store, StoreResult};

/// Render the whole library: collections as nested headings in tree order,
/// each prompt as a titled fenced block, unassigned prompts at the end.
pub fn render_library(store: &Store) -> StoreResult<String> {
    let tree = store.collection_tree()?;
    let prompts = store.list_prompts(None, &PromptFilter::default())?;

    let mut out = String::from("# PromptHive export\n");
    let mut assigned: HashSet<String> = HashSet::new();

    for node in &tree {
        render_node(&mut out, node, &prompts, 2, &mut assigned);
    }

    let unassigned: Vec<&PromptDetail> = prompts
        .iter()
        .filter(|p| !assigned.contains(&p.prompt.id))
        .collect();
    if !unassigned.is_empty() {
        out.push_str("\n## Unassigned\n");
        for prompt in unassigned {
            render_prompt(&mut out, prompt);
        }
    }

    Ok(out)
}

fn render_node(
    out: &mut String,
    node: &CollectionNode,
    prompts: &[PromptDetail],
    depth: usize,
    assigned: &mut HashSet<String>,
) {
    let level = depth.min(6);
    out.push('\n');
    out.push_str(&"#".repeat(level));
    out.push(' ');
    out.push_str(&node.collection.name);
    out.push('\n');
    if !node.collection.description.is_empty() {
        out.push_str(&node.collection.description);
        out.push('\n');
    }

    for prompt in prompts {
        if prompt.collection_ids.contains(&node.collection.id) {
            assigned.insert(prompt.prompt.id.clone());
            render_prompt(out, prompt);
        }
    }

    for child in &node.children {
        render_node(out, child, prompts, depth + 1, assigned);
    }
}

fn render_prompt(out: &mut String, prompt: &PromptDetail) {
    out.push_str("\n**");
    out.push_str(&prompt.prompt.title);
    out.push_str("**\n");
    if !prompt.tags.is_empty() {
        out.push_str("Tags: ");
        out.push_str(&prompt.tags.join(", "));
        out.push('\n');
    }
    if let Some(short) = prompt.head.short_content.as_deref() {
        if !short.is_empty() {
            out.push('_');
            out.push_str(short);
            out.push_str("_\n");
        }
    }
    out.push_str("```\n");
    out.push_str(&prompt.head.content);
    if !prompt.head.content.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("```\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::store::prompts::NewPrompt;

    fn seeded() -> (Store, String) {
        let store = Store::open_in_memory().unwrap();
        let user = store
            .create_user("alice", "alice@example.com", "hash", Role::Admin)
            .unwrap();
        (store, user.id)
    }

    #[test]
    fn test_renders_tree_order_and_unassigned() {
        let (store, owner) = seeded();
        let parent = store.create_collection(&owner, "Writing", "Long form", None).unwrap();
        let child = store
            .create_collection(&owner, "Blog", "", Some(&parent.id))
            .unwrap();
        store
            .create_prompt(
                &owner,
                NewPrompt {
                    title: "Outline".into(),
                    content: "Write an outline.".into(),
                    collection_ids: vec![child.id],
                    tags: vec!["structure".into()],
                    ..NewPrompt::default()
                },
            )
            .unwrap();
        store
            .create_prompt(
                &owner,
                NewPrompt { title: "Loose".into(), content: "No home.".into(), ..NewPrompt::default() },
            )
            .unwrap();

        let markdown = render_library(&store).unwrap();

        let writing = markdown.find("## Writing").unwrap();
        let blog = markdown.find("### Blog").unwrap();
        let outline = markdown.find("**Outline**").unwrap();
        let unassigned = markdown.find("## Unassigned").unwrap();
        assert!(writing < blog && blog < outline && outline < unassigned);
        assert!(markdown.contains("Long form"));
        assert!(markdown.contains("Tags: structure"));
        assert!(markdown.contains("```\nWrite an outline.\n```"));
        assert!(markdown.contains("**Loose**"));
    }

    #[test]
    fn test_deep_nesting_caps_heading_level() {
        let (store, owner) = seeded();
        let mut parent: Option<String> = None;
        for i in 0..7 {
            let collection = store
                .create_collection(&owner, &format!("Level{i}"), "", parent.as_deref())
                .unwrap();
            parent = Some(collection.id);
        }

        let markdown = render_library(&store).unwrap();
        assert!(markdown.contains("###### Level6"));
        assert!(!markdown.contains("####### "));
    }
}
