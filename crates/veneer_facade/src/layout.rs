//! Layout boundary
//!
//! Facades whose descriptor carries a [`LayoutStyle`] take part in flex
//! layout. Any change to that set (a style change, a layout facade created
//! or destroyed, a `LayoutChanged` message) marks layout dirty; however many
//! triggers arrive, the next recompute happens once.
//!
//! ```text
//! World::take_layout_request ──► LayoutEngine::compute ──► World::apply_layout
//!   (style tree keyed by id)        (async, may run on a worker)   (offset_* props)
//! ```
//!
//! The layout tree is the facade tree with non-layout facades skipped: a
//! layout facade's layout parent is its nearest layout ancestor.

use std::future::Future;
use std::pin::Pin;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use taffy::{
    AlignItems, AvailableSpace, Dimension, Display, FlexDirection, JustifyContent,
    LengthPercentage, LengthPercentageAuto, NodeId, Rect, Size, Style, TaffyError, TaffyTree,
};
use veneer_core::{FacadeId, Value};

use crate::error::{FacadeError, Result};
use crate::world::World;

/// A length in a layout style
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Length {
    #[default]
    Auto,
    Px(f32),
    /// Fraction of the parent, `1.0` = 100%
    Percent(f32),
}

impl Length {
    fn to_dimension(self) -> Dimension {
        match self {
            Length::Auto => Dimension::Auto,
            Length::Px(px) => Dimension::Length(px),
            Length::Percent(fraction) => Dimension::Percent(fraction),
        }
    }
}

/// Padding or margin per side, in px
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub fn all(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    pub fn symmetric(horizontal: f32, vertical: f32) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutDirection {
    #[default]
    Row,
    Column,
    RowReverse,
    ColumnReverse,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Align {
    Start,
    End,
    Center,
    Stretch,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

/// Flex style of a layout facade
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutStyle {
    /// Hidden facades take no space
    pub hidden: bool,
    pub direction: LayoutDirection,
    pub justify_content: Option<Align>,
    /// `Space*` values are not meaningful here and fall back to the default
    pub align_items: Option<Align>,
    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub flex_basis: Length,
    pub width: Length,
    pub height: Length,
    pub min_width: Length,
    pub min_height: Length,
    pub max_width: Length,
    pub max_height: Length,
    pub padding: Edges,
    pub margin: Edges,
    pub gap: f32,
}

impl Default for LayoutStyle {
    fn default() -> Self {
        Self {
            hidden: false,
            direction: LayoutDirection::Row,
            justify_content: None,
            align_items: None,
            flex_grow: 0.0,
            flex_shrink: 1.0,
            flex_basis: Length::Auto,
            width: Length::Auto,
            height: Length::Auto,
            min_width: Length::Auto,
            min_height: Length::Auto,
            max_width: Length::Auto,
            max_height: Length::Auto,
            padding: Edges::default(),
            margin: Edges::default(),
            gap: 0.0,
        }
    }
}

impl LayoutStyle {
    pub fn row() -> Self {
        Self::default()
    }

    pub fn column() -> Self {
        Self {
            direction: LayoutDirection::Column,
            ..Self::default()
        }
    }

    pub fn size(mut self, width: Length, height: Length) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn grow(mut self, flex_grow: f32) -> Self {
        self.flex_grow = flex_grow;
        self
    }

    pub fn padding(mut self, padding: Edges) -> Self {
        self.padding = padding;
        self
    }

    pub fn gap(mut self, gap: f32) -> Self {
        self.gap = gap;
        self
    }

    pub fn justify(mut self, align: Align) -> Self {
        self.justify_content = Some(align);
        self
    }

    pub fn align_items(mut self, align: Align) -> Self {
        self.align_items = Some(align);
        self
    }

    pub fn to_taffy(&self) -> Style {
        let padding = |px: f32| LengthPercentage::Length(px);
        let margin = |px: f32| LengthPercentageAuto::Length(px);
        Style {
            display: if self.hidden {
                Display::None
            } else {
                Display::Flex
            },
            flex_direction: match self.direction {
                LayoutDirection::Row => FlexDirection::Row,
                LayoutDirection::Column => FlexDirection::Column,
                LayoutDirection::RowReverse => FlexDirection::RowReverse,
                LayoutDirection::ColumnReverse => FlexDirection::ColumnReverse,
            },
            justify_content: self.justify_content.map(|align| match align {
                Align::Start => JustifyContent::FlexStart,
                Align::End => JustifyContent::FlexEnd,
                Align::Center => JustifyContent::Center,
                Align::Stretch => JustifyContent::Stretch,
                Align::SpaceBetween => JustifyContent::SpaceBetween,
                Align::SpaceAround => JustifyContent::SpaceAround,
                Align::SpaceEvenly => JustifyContent::SpaceEvenly,
            }),
            align_items: self.align_items.and_then(|align| match align {
                Align::Start => Some(AlignItems::FlexStart),
                Align::End => Some(AlignItems::FlexEnd),
                Align::Center => Some(AlignItems::Center),
                Align::Stretch => Some(AlignItems::Stretch),
                Align::SpaceBetween | Align::SpaceAround | Align::SpaceEvenly => None,
            }),
            flex_grow: self.flex_grow,
            flex_shrink: self.flex_shrink,
            flex_basis: self.flex_basis.to_dimension(),
            size: Size {
                width: self.width.to_dimension(),
                height: self.height.to_dimension(),
            },
            min_size: Size {
                width: self.min_width.to_dimension(),
                height: self.min_height.to_dimension(),
            },
            max_size: Size {
                width: self.max_width.to_dimension(),
                height: self.max_height.to_dimension(),
            },
            padding: Rect {
                left: padding(self.padding.left),
                right: padding(self.padding.right),
                top: padding(self.padding.top),
                bottom: padding(self.padding.bottom),
            },
            margin: Rect {
                left: margin(self.margin.left),
                right: margin(self.margin.right),
                top: margin(self.margin.top),
                bottom: margin(self.margin.bottom),
            },
            gap: Size {
                width: LengthPercentage::Length(self.gap),
                height: LengthPercentage::Length(self.gap),
            },
            ..Style::default()
        }
    }
}

/// One node of a layout request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    pub id: FacadeId,
    pub style: LayoutStyle,
    /// Layout children in order
    pub children: Vec<FacadeId>,
}

/// Style tree sent to a layout engine
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutRequest {
    /// Layout facades with no layout ancestor
    pub roots: Vec<FacadeId>,
    pub nodes: Vec<LayoutNode>,
    pub viewport_width: Option<f32>,
    pub viewport_height: Option<f32>,
}

/// Computed box of one node, relative to its layout parent
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxMetrics {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeBox {
    pub id: FacadeId,
    pub metrics: BoxMetrics,
}

/// Engine output
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutResponse {
    pub boxes: Vec<NodeBox>,
}

impl LayoutResponse {
    pub fn get(&self, id: FacadeId) -> Option<BoxMetrics> {
        self.boxes
            .iter()
            .find(|node| node.id == id)
            .map(|node| node.metrics)
    }
}

pub type LayoutFuture = Pin<Box<dyn Future<Output = Result<LayoutResponse>> + Send>>;

/// Computes box metrics for a style tree
pub trait LayoutEngine {
    fn compute(&self, request: LayoutRequest) -> LayoutFuture;
}

/// In-process flexbox engine backed by taffy
#[derive(Clone, Copy, Debug, Default)]
pub struct TaffyLayoutEngine;

impl TaffyLayoutEngine {
    pub fn new() -> Self {
        Self
    }

    /// Solve a request synchronously
    pub fn compute_now(&self, request: &LayoutRequest) -> Result<LayoutResponse> {
        let mut builder = TreeBuilder {
            tree: TaffyTree::new(),
            styles: request.nodes.iter().map(|node| (node.id, node)).collect(),
            built: FxHashMap::default(),
            visiting: FxHashSet::default(),
        };
        let available = Size {
            width: available_space(request.viewport_width),
            height: available_space(request.viewport_height),
        };

        for &root in &request.roots {
            let node = builder.build(root)?;
            builder
                .tree
                .compute_layout(node, available)
                .map_err(layout_error)?;
        }

        let mut boxes = Vec::with_capacity(builder.built.len());
        for node in &request.nodes {
            let Some(&taffy_node) = builder.built.get(&node.id) else {
                tracing::trace!(id = ?node.id, "layout node unreachable from any root");
                continue;
            };
            let layout = builder.tree.layout(taffy_node).map_err(layout_error)?;
            boxes.push(NodeBox {
                id: node.id,
                metrics: BoxMetrics {
                    left: layout.location.x,
                    top: layout.location.y,
                    width: layout.size.width,
                    height: layout.size.height,
                },
            });
        }
        Ok(LayoutResponse { boxes })
    }
}

impl LayoutEngine for TaffyLayoutEngine {
    fn compute(&self, request: LayoutRequest) -> LayoutFuture {
        Box::pin(std::future::ready(self.compute_now(&request)))
    }
}

fn available_space(extent: Option<f32>) -> AvailableSpace {
    match extent {
        Some(px) => AvailableSpace::Definite(px),
        None => AvailableSpace::MaxContent,
    }
}

fn layout_error(err: TaffyError) -> FacadeError {
    FacadeError::Layout(err.to_string())
}

struct TreeBuilder<'a> {
    tree: TaffyTree<()>,
    styles: FxHashMap<FacadeId, &'a LayoutNode>,
    built: FxHashMap<FacadeId, NodeId>,
    visiting: FxHashSet<FacadeId>,
}

impl TreeBuilder<'_> {
    fn build(&mut self, id: FacadeId) -> Result<NodeId> {
        if self.built.contains_key(&id) || !self.visiting.insert(id) {
            return Err(FacadeError::Layout(format!(
                "{id:?} appears more than once in the layout tree"
            )));
        }
        let node = *self
            .styles
            .get(&id)
            .ok_or_else(|| FacadeError::Layout(format!("no style for {id:?}")))?;

        let children = node
            .children
            .iter()
            .map(|&child| self.build(child))
            .collect::<Result<Vec<_>>>()?;
        let taffy_node = self
            .tree
            .new_with_children(node.style.to_taffy(), &children)
            .map_err(layout_error)?;

        self.visiting.remove(&id);
        self.built.insert(id, taffy_node);
        Ok(taffy_node)
    }
}

impl World {
    /// Build a request if layout is dirty, clearing the flag
    pub fn take_layout_request(&mut self) -> Option<LayoutRequest> {
        if !self.layout_dirty {
            return None;
        }
        self.layout_dirty = false;

        let mut request = LayoutRequest {
            viewport_width: self.config.viewport_width,
            viewport_height: self.config.viewport_height,
            ..LayoutRequest::default()
        };
        self.collect_layout(self.root(), None, &mut request);
        Some(request)
    }

    fn collect_layout(&self, id: FacadeId, layout_parent: Option<usize>, request: &mut LayoutRequest) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        for child in node.child_ids() {
            let Some(child_node) = self.nodes.get(child) else {
                continue;
            };
            match &child_node.layout {
                Some(style) => {
                    match layout_parent {
                        Some(index) => request.nodes[index].children.push(child),
                        None => request.roots.push(child),
                    }
                    request.nodes.push(LayoutNode {
                        id: child,
                        style: style.clone(),
                        children: Vec::new(),
                    });
                    let index = request.nodes.len() - 1;
                    self.collect_layout(child, Some(index), request);
                }
                None => self.collect_layout(child, layout_parent, request),
            }
        }
    }

    /// Write computed boxes into facades as `offset_left`, `offset_top`,
    /// `offset_width` and `offset_height`, then run `after_update`.
    ///
    /// Writes go through the animation layer, so offsets with a transition
    /// animate. Boxes for facades destroyed since the request are skipped.
    pub fn apply_layout(&mut self, response: &LayoutResponse) -> Result<()> {
        let now = self.now_ms();
        for node_box in &response.boxes {
            let id = node_box.id;
            let metrics = node_box.metrics;
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            for (name, value) in [
                ("offset_left", metrics.left),
                ("offset_top", metrics.top),
                ("offset_width", metrics.width),
                ("offset_height", metrics.height),
            ] {
                node.write_animated(name, Value::from(value), now, &self.transition_defaults)?;
            }
            self.run_after_update(id);
            self.notify_world(id, crate::world::WorldMessage::NeedsRender);
        }
        Ok(())
    }

    /// Run one layout pass with `engine` if layout is dirty, blocking until
    /// the engine answers. Returns whether a pass ran.
    ///
    /// A failed pass is not retried until something marks layout dirty again.
    pub fn run_layout(&mut self, engine: &dyn LayoutEngine) -> Result<bool> {
        let Some(request) = self.take_layout_request() else {
            return Ok(false);
        };
        let nodes = request.nodes.len();
        let response = pollster::block_on(engine.compute(request))?;
        self.apply_layout(&response)?;
        tracing::debug!(nodes, "layout pass complete");
        Ok(true)
    }

    pub fn set_layout_engine(&mut self, engine: impl LayoutEngine + 'static) {
        self.layout_engine = Some(Box::new(engine));
        self.mark_layout_dirty();
    }

    pub fn is_layout_dirty(&self) -> bool {
        self.layout_dirty
    }

    pub(crate) fn run_installed_layout(&mut self) -> Result<bool> {
        let Some(engine) = self.layout_engine.take() else {
            return Ok(false);
        };
        let result = self.run_layout(engine.as_ref());
        self.layout_engine = Some(engine);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<FacadeId> {
        let mut map: SlotMap<FacadeId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn test_row_splits_width_by_grow() {
        let ids = ids(3);
        let request = LayoutRequest {
            roots: vec![ids[0]],
            nodes: vec![
                LayoutNode {
                    id: ids[0],
                    style: LayoutStyle::row().size(Length::Px(300.0), Length::Px(100.0)),
                    children: vec![ids[1], ids[2]],
                },
                LayoutNode {
                    id: ids[1],
                    style: LayoutStyle::default().grow(1.0),
                    children: Vec::new(),
                },
                LayoutNode {
                    id: ids[2],
                    style: LayoutStyle::default().grow(2.0),
                    children: Vec::new(),
                },
            ],
            ..LayoutRequest::default()
        };

        let response = TaffyLayoutEngine.compute_now(&request).unwrap();
        let first = response.get(ids[1]).unwrap();
        let second = response.get(ids[2]).unwrap();
        assert_eq!(first.width, 100.0);
        assert_eq!(second.width, 200.0);
        assert_eq!(second.left, 100.0);
        assert_eq!(second.height, 100.0);
    }

    #[test]
    fn test_missing_style_is_an_error() {
        let ids = ids(2);
        let request = LayoutRequest {
            roots: vec![ids[0]],
            nodes: vec![LayoutNode {
                id: ids[0],
                style: LayoutStyle::default(),
                children: vec![ids[1]],
            }],
            ..LayoutRequest::default()
        };
        assert!(matches!(
            TaffyLayoutEngine.compute_now(&request),
            Err(FacadeError::Layout(_))
        ));
    }

    #[test]
    fn test_cycle_is_an_error() {
        let ids = ids(1);
        let request = LayoutRequest {
            roots: vec![ids[0]],
            nodes: vec![LayoutNode {
                id: ids[0],
                style: LayoutStyle::default(),
                children: vec![ids[0]],
            }],
            ..LayoutRequest::default()
        };
        assert!(TaffyLayoutEngine.compute_now(&request).is_err());
    }

    #[test]
    fn test_style_from_json() {
        let style: LayoutStyle =
            serde_json::from_str(r#"{"direction": "column", "width": {"px": 40}, "gap": 4}"#)
                .unwrap();
        assert_eq!(style.direction, LayoutDirection::Column);
        assert_eq!(style.width, Length::Px(40.0));
        assert_eq!(style.flex_shrink, 1.0);
    }
}
