//! Forest reconstruction from flat nested-set rows

use serde::Serialize;

use logistics_core::{InventoryError, IntervalRelation, Item, ItemId, Result};

/// An item with its direct children attached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemNode {
    #[serde(flatten)]
    pub item: Item,
    pub children: Vec<ItemNode>,
}

impl ItemNode {
    pub fn id(&self) -> ItemId {
        self.item.id
    }

    /// Number of nodes in this subtree, including this one
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(ItemNode::size).sum::<usize>()
    }

    /// Find a node anywhere in this subtree
    pub fn find(&self, id: ItemId) -> Option<&ItemNode> {
        if self.item.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// For items sorted by `left`, compute the index of each item's innermost
/// enclosing item within the same slice.
///
/// Fails fast when two intervals cross without nesting, share bounds, or
/// when an interval is malformed.
pub(crate) fn enclosing_indices(sorted: &[&Item]) -> Result<Vec<Option<usize>>> {
    let mut stack: Vec<usize> = Vec::new();
    let mut parents = Vec::with_capacity(sorted.len());

    for (idx, item) in sorted.iter().enumerate() {
        let interval = item.interval;
        if !interval.is_well_formed() {
            return Err(InventoryError::DataIntegrity(format!(
                "item {} has malformed interval {interval}",
                item.id
            )));
        }

        while let Some(&top) = stack.last() {
            let enclosing = sorted[top];
            match enclosing.interval.relation(&interval) {
                IntervalRelation::Contains => break,
                IntervalRelation::Disjoint => {
                    stack.pop();
                }
                _ => {
                    return Err(InventoryError::DataIntegrity(format!(
                        "items {} {} and {} {interval} overlap without nesting",
                        enclosing.id, enclosing.interval, item.id
                    )));
                }
            }
        }

        parents.push(stack.last().copied());
        stack.push(idx);
    }

    Ok(parents)
}

/// Build the forest of top-level items with their children attached,
/// recursively.
///
/// The input is any flat subset of a universe (for example the items of one
/// container). An item becomes a root when no other item of the subset
/// strictly contains it; every remaining item is attached to its innermost
/// enclosing item. Siblings keep interval order. Crossing intervals are a
/// `DataIntegrity` error.
pub fn build_forest<'a, I>(items: I) -> Result<Vec<ItemNode>>
where
    I: IntoIterator<Item = &'a Item>,
{
    let mut sorted: Vec<&Item> = items.into_iter().collect();
    sorted.sort_by_key(|item| (item.interval.left, item.interval.right));

    let parents = enclosing_indices(&sorted)?;

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); sorted.len()];
    let mut roots = Vec::new();
    for (idx, parent) in parents.iter().enumerate() {
        match parent {
            Some(p) => children[*p].push(idx),
            None => roots.push(idx),
        }
    }

    Ok(roots
        .into_iter()
        .map(|root| assemble(root, &sorted, &children))
        .collect())
}

fn assemble(idx: usize, sorted: &[&Item], children: &[Vec<usize>]) -> ItemNode {
    ItemNode {
        item: sorted[idx].clone(),
        children: children[idx]
            .iter()
            .map(|&child| assemble(child, sorted, children))
            .collect(),
    }
}
