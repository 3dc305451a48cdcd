//! Inventory view derived from one snapshot.

use trawler_types::{InventoryItem, WorldSnapshot};

use crate::classify::classify_item;
use crate::config::SiteConfig;

/// What the carried items mean for the active site.
///
/// Item lists are in inventory slot order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryView<'a> {
    /// Every slot is occupied.
    pub full: bool,
    /// At least one required tool is carried.
    pub has_tool: bool,
    /// Gathered resource stacks.
    pub resources: Vec<&'a InventoryItem>,
    /// Overflow stacks that may be dropped.
    pub overflow: Vec<&'a InventoryItem>,
}

impl<'a> InventoryView<'a> {
    /// Classify every carried item.
    pub fn new(snapshot: &'a WorldSnapshot, site: &SiteConfig, capacity: usize) -> Self {
        let mut items: Vec<&InventoryItem> = snapshot.inventory.iter().collect();
        items.sort_by_key(|i| i.slot);

        let mut view = Self {
            full: snapshot.occupied_slots() >= capacity,
            has_tool: false,
            resources: Vec::new(),
            overflow: Vec::new(),
        };
        for item in items {
            let class = classify_item(&item.name, site);
            view.has_tool |= class.tool;
            if class.resource {
                view.resources.push(item);
            }
            if class.overflow {
                view.overflow.push(item);
            }
        }
        view
    }

    /// Total gathered resources carried, summed over stacks.
    pub fn resource_count(&self) -> u64 {
        self.resources
            .iter()
            .fold(0_u64, |acc, i| acc.saturating_add(u64::from(i.count)))
    }
}
