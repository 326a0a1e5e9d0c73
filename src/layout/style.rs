//! Layout style - flexbox directives attached to a node.
//!
//! A pure value describing how a node participates in layout. Consumed
//! once per pass by the taffy bridge; never interpreted anywhere else.

use crate::types::{
    AlignContent, AlignItems, AlignSelf, Dimension, Edges, FlexDirection, FlexWrap, JustifyContent,
    Overflow, Position,
};

/// Insets for absolutely positioned elements. `Auto` leaves the edge free.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Inset {
    pub top: Dimension,
    pub right: Dimension,
    pub bottom: Dimension,
    pub left: Dimension,
}

/// Flexbox styling directives for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutStyle {
    // Container properties
    pub direction: FlexDirection,
    pub wrap: FlexWrap,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub align_content: AlignContent,
    pub row_gap: f32,
    pub column_gap: f32,
    pub overflow: Overflow,

    // Item properties
    pub align_self: AlignSelf,
    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub flex_basis: Dimension,

    // Positioning
    pub position: Position,
    pub inset: Inset,

    // Dimensions
    pub width: Dimension,
    pub height: Dimension,
    pub min_width: Dimension,
    pub min_height: Dimension,
    pub max_width: Dimension,
    pub max_height: Dimension,

    // Box insets
    pub margin: Edges,
    pub padding: Edges,
    pub border: Edges,
}

impl Default for LayoutStyle {
    fn default() -> Self {
        Self {
            direction: FlexDirection::default(),
            wrap: FlexWrap::default(),
            justify_content: JustifyContent::default(),
            align_items: AlignItems::default(),
            align_content: AlignContent::default(),
            row_gap: 0.0,
            column_gap: 0.0,
            overflow: Overflow::default(),
            align_self: AlignSelf::default(),
            flex_grow: 0.0,
            flex_shrink: 1.0,
            flex_basis: Dimension::Auto,
            position: Position::default(),
            inset: Inset::default(),
            width: Dimension::Auto,
            height: Dimension::Auto,
            min_width: Dimension::Auto,
            min_height: Dimension::Auto,
            max_width: Dimension::Auto,
            max_height: Dimension::Auto,
            margin: Edges::ZERO,
            padding: Edges::ZERO,
            border: Edges::ZERO,
        }
    }
}

impl LayoutStyle {
    /// Fixed-size style, the most common leaf configuration.
    pub fn sized(width: f32, height: f32) -> Self {
        Self {
            width: Dimension::Points(width),
            height: Dimension::Points(height),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flex_shrink_is_one() {
        let style = LayoutStyle::default();
        assert_eq!(style.flex_shrink, 1.0);
        assert_eq!(style.flex_grow, 0.0);
    }

    #[test]
    fn test_sized_helper() {
        let style = LayoutStyle::sized(40.0, 10.0);
        assert_eq!(style.width, Dimension::Points(40.0));
        assert_eq!(style.height, Dimension::Points(10.0));
    }
}
