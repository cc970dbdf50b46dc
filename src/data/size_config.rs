use std::collections::BTreeMap;

use crate::coordinate::{to_pixel, Index, Pixel, Range};
use crate::error::{GridError, Result};
use crate::persistence::{property_key, Properties};

/// Sizes along one axis: a default plus per-index overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeConfig {
    default_size: Pixel,
    sizes: BTreeMap<Index, Pixel>,
}

impl SizeConfig {
    pub fn new(default_size: Pixel) -> Self {
        Self {
            default_size: default_size.max(0),
            sizes: BTreeMap::new(),
        }
    }

    pub fn default_size(&self) -> Pixel {
        self.default_size
    }

    pub fn size(&self, index: Index) -> Pixel {
        self.sizes.get(&index).copied().unwrap_or(self.default_size)
    }

    /// Override the size of one index; negative sizes are clamped to 0.
    pub fn set_size(&mut self, index: Index, size: Pixel) {
        let size = size.max(0);
        if size == self.default_size {
            self.sizes.remove(&index);
        } else {
            self.sizes.insert(index, size);
        }
    }

    /// Sum of the sizes of indices `0..count`.
    pub fn aggregate_size(&self, count: usize) -> Pixel {
        let base = self.default_size.saturating_mul(to_pixel(count));
        self.sizes
            .range(..count)
            .fold(base, |total, (_, size)| {
                total.saturating_add(size - self.default_size)
            })
    }

    /// Overrides move with their indices when indices are inserted.
    pub fn insert(&mut self, range: Range) {
        if range.is_empty() {
            return;
        }
        let shifted = self.sizes.split_off(&range.start);
        self.sizes
            .extend(shifted.into_iter().map(|(index, size)| (index + range.len(), size)));
    }

    /// Overrides of deleted indices are dropped, later ones shift down.
    pub fn delete(&mut self, range: Range) {
        if range.is_empty() {
            return;
        }
        let mut tail = self.sizes.split_off(&range.start);
        let after = tail.split_off(&range.end);
        self.sizes
            .extend(after.into_iter().map(|(index, size)| (index - range.len(), size)));
    }

    /// Persist as `<prefix>.<name>` = `index:size,...` and `<prefix>.<name>.default`.
    pub fn save(&self, prefix: &str, name: &str, properties: &mut Properties) {
        let key = property_key(prefix, name);
        let value = self
            .sizes
            .iter()
            .map(|(index, size)| format!("{index}:{size}"))
            .collect::<Vec<_>>()
            .join(",");
        properties.insert(format!("{key}.default"), self.default_size.to_string());
        properties.insert(key, value);
    }

    /// Restore sizes saved by [`SizeConfig::save`]; absent keys keep the current state.
    ///
    /// # Errors
    /// Returns [`GridError::InvalidState`] when a value does not parse; the
    /// configuration is left unchanged.
    pub fn load(&mut self, prefix: &str, name: &str, properties: &Properties) -> Result<()> {
        let key = property_key(prefix, name);
        let default_key = format!("{key}.default");

        let default_size = match properties.get(&default_key) {
            Some(value) => value
                .trim()
                .parse::<Pixel>()
                .map_err(|e| GridError::invalid_state(&default_key, e.to_string()))?,
            None => self.default_size,
        };
        let sizes = match properties.get(&key) {
            Some(value) => parse_sizes(&key, value)?,
            None => self.sizes.clone(),
        };

        self.default_size = default_size.max(0);
        self.sizes = sizes;
        Ok(())
    }
}

fn parse_sizes(key: &str, value: &str) -> Result<BTreeMap<Index, Pixel>> {
    let trimmed = value.trim().trim_end_matches(',');
    if trimmed.is_empty() {
        return Ok(BTreeMap::new());
    }
    trimmed
        .split(',')
        .map(|entry| {
            let (index, size) = entry
                .split_once(':')
                .ok_or_else(|| {
                    GridError::invalid_state(key, format!("'{entry}' is not index:size"))
                })?;
            let index = index
                .trim()
                .parse::<Index>()
                .map_err(|e| GridError::invalid_state(key, e.to_string()))?;
            let size = size
                .trim()
                .parse::<Pixel>()
                .map_err(|e| GridError::invalid_state(key, e.to_string()))?;
            Ok((index, size.max(0)))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_with_overrides() {
        let mut sizes = SizeConfig::new(10);
        sizes.set_size(1, 30);
        sizes.set_size(4, 0);
        assert_eq!(sizes.aggregate_size(0), 0);
        assert_eq!(sizes.aggregate_size(1), 10);
        assert_eq!(sizes.aggregate_size(2), 40);
        assert_eq!(sizes.aggregate_size(5), 60);
        assert_eq!(sizes.size(4), 0);
    }

    #[test]
    fn test_setting_default_removes_override() {
        let mut sizes = SizeConfig::new(10);
        sizes.set_size(2, 25);
        sizes.set_size(2, 10);
        assert_eq!(sizes, SizeConfig::new(10));
    }

    #[test]
    fn test_insert_shifts_overrides() {
        let mut sizes = SizeConfig::new(10);
        sizes.set_size(1, 11);
        sizes.set_size(3, 13);
        sizes.insert(Range::new(2, 4));
        assert_eq!(sizes.size(1), 11);
        assert_eq!(sizes.size(3), 10);
        assert_eq!(sizes.size(5), 13);
    }

    #[test]
    fn test_delete_drops_and_shifts_overrides() {
        let mut sizes = SizeConfig::new(10);
        sizes.set_size(1, 11);
        sizes.set_size(2, 12);
        sizes.set_size(5, 15);
        sizes.delete(Range::new(2, 4));
        assert_eq!(sizes.size(1), 11);
        assert_eq!(sizes.size(2), 10);
        assert_eq!(sizes.size(3), 15);
    }

    #[test]
    fn test_save_and_load() {
        let mut sizes = SizeConfig::new(20);
        sizes.set_size(0, 40);
        sizes.set_size(7, 5);
        let mut properties = Properties::new();
        sizes.save("grid", "rowHeights", &mut properties);
        assert_eq!(properties.get("grid.rowHeights").unwrap(), "0:40,7:5");
        assert_eq!(properties.get("grid.rowHeights.default").unwrap(), "20");

        let mut restored = SizeConfig::new(1);
        restored.load("grid", "rowHeights", &properties).unwrap();
        assert_eq!(restored, sizes);
    }

    #[test]
    fn test_load_rejects_garbage_and_keeps_state() {
        let mut sizes = SizeConfig::new(20);
        sizes.set_size(3, 30);
        let mut properties = Properties::new();
        properties.insert("grid.rowHeights".to_string(), "3-30".to_string());
        assert!(sizes.load("grid", "rowHeights", &properties).is_err());
        assert_eq!(sizes.size(3), 30);
    }
}
