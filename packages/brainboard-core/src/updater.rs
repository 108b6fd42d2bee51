/// Applies a column's completion semantics to an item's source document:
/// toggling the checkbox marker for task lines, or setting the tracking
/// property for whole-file notes.
///
/// This call is decoupled from the store's own maps. The two may disagree
/// until the next scan; the reconciliation pass repairs that.
use std::fs;
use std::path::Path;

use crate::scanner::frontmatter_block;
use crate::store::board_store::atomic_write;
use crate::store::StoreError;
use crate::types::{BoardItem, ColumnDef, ItemKind};

pub const TASK_UNCHECKED: &str = "- [ ]";
pub const TASK_CHECKED: &str = "- [x]";
const TASK_CHECKED_UPPER: &str = "- [X]";

/// Update `item`'s source document under `root` to match `column`.
pub fn apply_column(
    root: &Path,
    item: &BoardItem,
    column: &ColumnDef,
    tracking_property: &str,
) -> Result<(), StoreError> {
    let path = root.join(&item.file_path);
    match item.kind {
        ItemKind::File => set_tracking_property(&path, tracking_property, &column.id),
        ItemKind::Task => toggle_checkbox(&path, item, column),
    }
}

fn toggle_checkbox(path: &Path, item: &BoardItem, column: &ColumnDef) -> Result<(), StoreError> {
    let should_complete = column.completes_task && !item.completed;
    let should_uncomplete = !column.completes_task && item.completed;
    if !should_complete && !should_uncomplete {
        return Ok(());
    }

    let Some(line_no) = item.line else {
        return Ok(());
    };
    let content = fs::read_to_string(path)?;
    let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();

    // A stale line number is a silent no-op; the next scan repairs the
    // disagreement between document and store.
    let Some(line) = (line_no as usize)
        .checked_sub(1)
        .and_then(|idx| lines.get_mut(idx))
    else {
        return Ok(());
    };

    if should_complete && line.contains(TASK_UNCHECKED) {
        *line = line.replacen(TASK_UNCHECKED, TASK_CHECKED, 1);
    } else if should_uncomplete && line.contains(TASK_CHECKED) {
        *line = line.replacen(TASK_CHECKED, TASK_UNCHECKED, 1);
    } else if should_uncomplete && line.contains(TASK_CHECKED_UPPER) {
        *line = line.replacen(TASK_CHECKED_UPPER, TASK_UNCHECKED, 1);
    } else {
        return Ok(());
    }

    atomic_write(path, &lines.join("\n"))?;
    Ok(())
}

/// Set (or insert) the tracking property in the file's frontmatter block,
/// creating the block when the file has none.
fn set_tracking_property(path: &Path, property: &str, value: &str) -> Result<(), StoreError> {
    let content = fs::read_to_string(path)?;
    let property_line = format!("{}: {}", property, value);

    let updated = match frontmatter_block(&content) {
        Some(block) => {
            let prefix = format!("{}:", property);
            let new_block: Vec<String> = if block
                .lines()
                .any(|line| line.trim_start().starts_with(&prefix))
            {
                block
                    .lines()
                    .map(|line| {
                        if line.trim_start().starts_with(&prefix) {
                            property_line.clone()
                        } else {
                            line.to_string()
                        }
                    })
                    .collect()
            } else {
                let mut lines: Vec<String> = block.lines().map(str::to_string).collect();
                lines.push(property_line.clone());
                lines
            };
            // `block` is a subslice of `content`; splice the rewritten
            // lines between the untouched delimiters.
            let block_start = block.as_ptr() as usize - content.as_ptr() as usize;
            let head = &content[..block_start];
            let body = &content[block_start + block.len()..];
            format!("{}{}{}", head, new_block.join("\n"), body)
        }
        None => format!("---\n{}\n---\n{}", property_line, content),
    };

    atomic_write(path, &updated)?;
    Ok(())
}
