use std::collections::BTreeMap;

use tracing::debug;

use crate::entities::Layout;
use crate::models::{LayoutFeed, RawLayout};
use crate::normalize::{clean_text, parse_area, parse_int};

pub const BUILDING_SPACE_TYPE: &str = "Building";
pub const DEFAULT_FLOOR_LEVEL: &str = "1st Floor";

/// Built layouts in feed order. `parents[i]` is the index of the building
/// layout that contains `layouts[i]`, if any.
#[derive(Debug, Clone, Default)]
pub struct LayoutPlan {
    pub layouts: Vec<Layout>,
    pub parents: Vec<Option<usize>>,
}

impl LayoutPlan {
    pub fn is_building(&self, index: usize) -> bool {
        self.layouts
            .get(index)
            .is_some_and(|layout| layout.space_type == BUILDING_SPACE_TYPE)
    }

    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.parents
            .iter()
            .enumerate()
            .filter(|(_, parent)| parent.is_none())
            .map(|(index, _)| index)
    }

    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.parents
            .iter()
            .enumerate()
            .filter_map(|(child, parent)| parent.map(|parent| (parent, child)))
    }
}

fn declared_floor(raw: &RawLayout) -> Option<String> {
    clean_text(raw.floor_level.as_deref())
}

fn building_of(raw: &RawLayout) -> Option<u32> {
    raw.building_number
        .as_deref()
        .and_then(parse_int)
        .and_then(|n| u32::try_from(n).ok())
}

pub fn build_layouts(feed: &LayoutFeed) -> LayoutPlan {
    let entries: Vec<(&RawLayout, String)> = feed
        .layouts
        .iter()
        .filter_map(|raw| clean_text(raw.space_type.as_deref()).map(|space_type| (raw, space_type)))
        .collect();
    if entries.len() < feed.layouts.len() {
        debug!(
            skipped = feed.layouts.len() - entries.len(),
            "Layouts without a space type skipped"
        );
    }

    let buildings: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, (_, space_type))| space_type == BUILDING_SPACE_TYPE)
        .map(|(index, _)| index)
        .collect();

    let parents: Vec<Option<usize>> = entries
        .iter()
        .map(|(raw, space_type)| {
            if space_type == BUILDING_SPACE_TYPE {
                return None;
            }
            match building_of(raw) {
                Some(number) => buildings
                    .iter()
                    .copied()
                    .find(|&b| building_of(entries[b].0) == Some(number)),
                None if buildings.len() == 1 => Some(buildings[0]),
                None => None,
            }
        })
        .collect();

    let mut counters: BTreeMap<&str, u32> = BTreeMap::new();
    let layouts = entries
        .iter()
        .zip(&parents)
        .map(|((raw, space_type), parent)| {
            let counter = counters.entry(space_type.as_str()).or_insert(0);
            *counter += 1;

            let parent_raw: Option<&RawLayout> = parent.map(|p| entries[p].0);
            let floor_level = declared_floor(raw)
                .or_else(|| parent_raw.and_then(declared_floor))
                .unwrap_or_else(|| DEFAULT_FLOOR_LEVEL.to_string());
            let building_number =
                building_of(raw).or_else(|| parent_raw.and_then(building_of));

            Layout {
                space_type: space_type.clone(),
                space_index: *counter,
                building_number,
                floor_level,
                size_square_feet: raw.size_square_feet.as_deref().and_then(parse_area),
                is_exterior: raw.is_exterior.unwrap_or(false),
                is_finished: raw.is_finished,
                flooring_material_type: clean_text(raw.flooring_material_type.as_deref()),
                has_windows: raw.has_windows,
                pool_type: clean_text(raw.pool_type.as_deref()),
            }
        })
        .collect();

    LayoutPlan { layouts, parents }
}
