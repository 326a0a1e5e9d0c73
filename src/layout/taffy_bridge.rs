//! Taffy Bridge - integration with the Taffy layout engine.
//!
//! Converts each mounted node's `LayoutStyle` to a Taffy style, runs the
//! flexbox computation once over the whole tree, and writes the resulting
//! frames back into the mounted tree.
//!
//! A fresh Taffy tree is built on every invocation. Layout is therefore a
//! pure function of the mounted tree and the available space: running it
//! twice on an unchanged tree yields identical frames.

use taffy::{
    AlignContent as TaffyAlignContent, AlignItems as TaffyAlignItems, AlignSelf as TaffyAlignSelf,
    AvailableSpace, Dimension as TaffyDimension, Display, FlexDirection as TaffyFlexDirection,
    FlexWrap as TaffyFlexWrap, JustifyContent as TaffyJustifyContent, LengthPercentage,
    LengthPercentageAuto, NodeId, Overflow as TaffyOverflow, Position as TaffyPosition, Rect,
    Size as TaffySize, Style, TaffyTree,
};

use crate::engine::tree::MountedNode;
use crate::layout::style::LayoutStyle;
use crate::types::{
    AlignContent, AlignItems, AlignSelf, Dimension, Edges, FlexDirection, FlexWrap, JustifyContent,
    Overflow, Point, Position, Size,
};

// =============================================================================
// Dimension conversion
// =============================================================================

/// Convert our Dimension to Taffy's Dimension.
fn to_taffy_dimension(dim: Dimension) -> TaffyDimension {
    match dim {
        Dimension::Auto => TaffyDimension::Auto,
        Dimension::Points(n) => TaffyDimension::Length(n),
        Dimension::Percent(p) => TaffyDimension::Percent(p / 100.0),
    }
}

/// Convert our Dimension to Taffy's LengthPercentageAuto.
fn to_taffy_lpa(dim: Dimension) -> LengthPercentageAuto {
    match dim {
        Dimension::Auto => LengthPercentageAuto::Auto,
        Dimension::Points(n) => LengthPercentageAuto::Length(n),
        Dimension::Percent(p) => LengthPercentageAuto::Percent(p / 100.0),
    }
}

fn to_taffy_edges_lpa(edges: Edges) -> Rect<LengthPercentageAuto> {
    Rect {
        top: LengthPercentageAuto::Length(edges.top),
        right: LengthPercentageAuto::Length(edges.right),
        bottom: LengthPercentageAuto::Length(edges.bottom),
        left: LengthPercentageAuto::Length(edges.left),
    }
}

fn to_taffy_edges_lp(edges: Edges) -> Rect<LengthPercentage> {
    Rect {
        top: LengthPercentage::Length(edges.top),
        right: LengthPercentage::Length(edges.right),
        bottom: LengthPercentage::Length(edges.bottom),
        left: LengthPercentage::Length(edges.left),
    }
}

// =============================================================================
// Enum conversions
// =============================================================================

fn to_taffy_flex_direction(dir: FlexDirection) -> TaffyFlexDirection {
    match dir {
        FlexDirection::Column => TaffyFlexDirection::Column,
        FlexDirection::Row => TaffyFlexDirection::Row,
        FlexDirection::ColumnReverse => TaffyFlexDirection::ColumnReverse,
        FlexDirection::RowReverse => TaffyFlexDirection::RowReverse,
    }
}

fn to_taffy_flex_wrap(wrap: FlexWrap) -> TaffyFlexWrap {
    match wrap {
        FlexWrap::NoWrap => TaffyFlexWrap::NoWrap,
        FlexWrap::Wrap => TaffyFlexWrap::Wrap,
        FlexWrap::WrapReverse => TaffyFlexWrap::WrapReverse,
    }
}

fn to_taffy_justify_content(justify: JustifyContent) -> Option<TaffyJustifyContent> {
    Some(match justify {
        JustifyContent::FlexStart => TaffyJustifyContent::FlexStart,
        JustifyContent::Center => TaffyJustifyContent::Center,
        JustifyContent::FlexEnd => TaffyJustifyContent::FlexEnd,
        JustifyContent::SpaceBetween => TaffyJustifyContent::SpaceBetween,
        JustifyContent::SpaceAround => TaffyJustifyContent::SpaceAround,
        JustifyContent::SpaceEvenly => TaffyJustifyContent::SpaceEvenly,
    })
}

fn to_taffy_align_items(align: AlignItems) -> Option<TaffyAlignItems> {
    Some(match align {
        AlignItems::Stretch => TaffyAlignItems::Stretch,
        AlignItems::FlexStart => TaffyAlignItems::FlexStart,
        AlignItems::Center => TaffyAlignItems::Center,
        AlignItems::FlexEnd => TaffyAlignItems::FlexEnd,
        AlignItems::Baseline => TaffyAlignItems::Baseline,
    })
}

fn to_taffy_align_content(align: AlignContent) -> Option<TaffyAlignContent> {
    Some(match align {
        AlignContent::Stretch => TaffyAlignContent::Stretch,
        AlignContent::FlexStart => TaffyAlignContent::FlexStart,
        AlignContent::Center => TaffyAlignContent::Center,
        AlignContent::FlexEnd => TaffyAlignContent::FlexEnd,
        AlignContent::SpaceBetween => TaffyAlignContent::SpaceBetween,
        AlignContent::SpaceAround => TaffyAlignContent::SpaceAround,
    })
}

fn to_taffy_align_self(align: AlignSelf) -> Option<TaffyAlignSelf> {
    match align {
        AlignSelf::Auto => None, // inherit from parent
        AlignSelf::Stretch => Some(TaffyAlignSelf::Stretch),
        AlignSelf::FlexStart => Some(TaffyAlignSelf::FlexStart),
        AlignSelf::Center => Some(TaffyAlignSelf::Center),
        AlignSelf::FlexEnd => Some(TaffyAlignSelf::FlexEnd),
        AlignSelf::Baseline => Some(TaffyAlignSelf::Baseline),
    }
}

fn to_taffy_overflow(overflow: Overflow) -> TaffyOverflow {
    match overflow {
        Overflow::Visible => TaffyOverflow::Visible,
        Overflow::Hidden => TaffyOverflow::Clip,
        Overflow::Scroll => TaffyOverflow::Scroll,
    }
}

fn to_taffy_position(position: Position) -> TaffyPosition {
    match position {
        Position::Relative => TaffyPosition::Relative,
        Position::Absolute => TaffyPosition::Absolute,
    }
}

// =============================================================================
// Style building
// =============================================================================

/// Build a Taffy Style from a node's LayoutStyle.
fn build_style(layout: &LayoutStyle) -> Style {
    Style {
        display: Display::Flex,
        position: to_taffy_position(layout.position),
        inset: Rect {
            top: to_taffy_lpa(layout.inset.top),
            right: to_taffy_lpa(layout.inset.right),
            bottom: to_taffy_lpa(layout.inset.bottom),
            left: to_taffy_lpa(layout.inset.left),
        },

        // Flex container properties
        flex_direction: to_taffy_flex_direction(layout.direction),
        flex_wrap: to_taffy_flex_wrap(layout.wrap),
        justify_content: to_taffy_justify_content(layout.justify_content),
        align_items: to_taffy_align_items(layout.align_items),
        align_content: to_taffy_align_content(layout.align_content),

        // Flex item properties
        flex_grow: layout.flex_grow,
        flex_shrink: layout.flex_shrink,
        flex_basis: to_taffy_dimension(layout.flex_basis),
        align_self: to_taffy_align_self(layout.align_self),

        // Dimensions
        size: TaffySize {
            width: to_taffy_dimension(layout.width),
            height: to_taffy_dimension(layout.height),
        },
        min_size: TaffySize {
            width: to_taffy_dimension(layout.min_width),
            height: to_taffy_dimension(layout.min_height),
        },
        max_size: TaffySize {
            width: to_taffy_dimension(layout.max_width),
            height: to_taffy_dimension(layout.max_height),
        },

        // Box insets
        margin: to_taffy_edges_lpa(layout.margin),
        padding: to_taffy_edges_lp(layout.padding),
        border: to_taffy_edges_lp(layout.border),

        // Gap
        gap: TaffySize {
            width: LengthPercentage::Length(layout.column_gap),
            height: LengthPercentage::Length(layout.row_gap),
        },

        // Overflow
        overflow: taffy::Point {
            x: to_taffy_overflow(layout.overflow),
            y: to_taffy_overflow(layout.overflow),
        },

        ..Default::default()
    }
}

// =============================================================================
// Main entry point
// =============================================================================

/// Compute layout for the mounted tree and write frames back into it.
///
/// `preserve_origin` keeps the root's previously committed origin instead
/// of resetting it to zero; child origins are always relative to their
/// parent and come straight from the flexbox computation.
pub(crate) fn compute_layout(root: &mut MountedNode, available: Size, preserve_origin: bool) {
    let mut tree: TaffyTree<()> = TaffyTree::new();
    let root_id = build_taffy_subtree(&mut tree, root);

    let space = TaffySize {
        width: AvailableSpace::Definite(available.width),
        height: AvailableSpace::Definite(available.height),
    };
    let _ = tree.compute_layout(root_id, space);

    let previous_origin = root.frame.origin;
    extract_frames(&tree, root_id, root);
    root.frame.origin = if preserve_origin {
        previous_origin
    } else {
        Point::ZERO
    };
}

fn build_taffy_subtree(tree: &mut TaffyTree<()>, mounted: &MountedNode) -> NodeId {
    let style = build_style(&mounted.node.layout);
    let id = tree.new_leaf(style).unwrap();
    for child in &mounted.children {
        let child_id = build_taffy_subtree(tree, child);
        let _ = tree.add_child(id, child_id);
    }
    id
}

fn extract_frames(tree: &TaffyTree<()>, id: NodeId, mounted: &mut MountedNode) {
    if let Ok(layout) = tree.layout(id) {
        mounted.frame = crate::types::Rect {
            origin: Point::new(layout.location.x, layout.location.y),
            size: Size::new(layout.size.width, layout.size.height),
        };
    }
    if let Ok(child_ids) = tree.children(id) {
        for (child_id, child) in child_ids.into_iter().zip(mounted.children.iter_mut()) {
            extract_frames(tree, child_id, child);
        }
    }
}
