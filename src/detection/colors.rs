use std::collections::HashMap;

use crate::models::Color;

/// Stable label -> color assignments for one session.
///
/// Entries are only ever added. Distinct labels may hash to the same color.
#[derive(Debug, Default, Clone)]
pub struct ColorRegistry {
    colors: HashMap<String, Color>,
}

impl ColorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Color for `label`, assigning and caching it on first use
    pub fn color_for(&mut self, label: &str) -> Color {
        if let Some(color) = self.colors.get(label) {
            return *color;
        }
        let color = Color::from(label_hash(label));
        self.colors.insert(label.to_string(), color);
        color
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// `hash = unit + ((hash << 5) - hash)` over the UTF-16 code units, wrapping at 32 bits
pub fn label_hash(label: &str) -> i32 {
    label.encode_utf16().fold(0i32, |hash, unit| {
        (unit as i32).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash))
    })
}
