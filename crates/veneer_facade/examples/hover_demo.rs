//! Hover Demo
//!
//! Headless walk-through of a small toolbar: layout by taffy, hover and
//! active overlays that transition, click and double-click synthesis, and an
//! exit animation when a button is removed.
//!
//! Run with: RUST_LOG=debug cargo run -p veneer_facade --example hover_demo

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;
use veneer_animation::{AnimationSpec, Easing, KeyframeOffset, ManualClock, TransitionSpec};
use veneer_core::{EventType, FacadeId, Props, Value};
use veneer_facade::{
    Descriptor, Facade, FacadeCx, Hit, LayoutStyle, Length, RawEventKind, RawPointerEvent,
    TaffyLayoutEngine, World, WorldConfig,
};

/// A toolbar button; reports its scale whenever it changes
#[derive(Debug, Default)]
struct Button {
    props: Props,
    reported_scale: Option<f64>,
}

impl Facade for Button {
    fn get(&self, name: &str) -> Option<Value> {
        self.props.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: Value) -> veneer_facade::Result<()> {
        self.props.insert(name.to_string(), value);
        Ok(())
    }

    fn can_read(&self, _name: &str) -> bool {
        true
    }

    fn after_update(&mut self, cx: &mut FacadeCx) {
        let scale = self.props.get("scale").and_then(Value::as_number);
        if scale != self.reported_scale {
            self.reported_scale = scale;
            tracing::debug!(id = ?cx.id(), ?scale, "button scale");
        }
    }

    fn is_pointer_target(&self) -> bool {
        true
    }
}

type Boxes = Rc<RefCell<Vec<(FacadeId, [f32; 4])>>>;

fn toolbar(labels: &[&'static str], clicks: &Rc<RefCell<Vec<String>>>) -> Descriptor {
    let buttons = labels.iter().map(|&label| {
        let clicks = clicks.clone();
        let fade = AnimationSpec::new(120.0).keyframe(
            KeyframeOffset::TO,
            [("opacity".to_string(), Value::from(0.0))].into_iter().collect(),
        );
        Some(
            Descriptor::of::<Button>()
                .key(label)
                .prop("label", label)
                .prop("scale", 1.0)
                .prop("opacity", 1.0)
                .layout(LayoutStyle::default().size(Length::Px(80.0), Length::Px(32.0)))
                .transition("scale", TransitionSpec::timed(100.0).easing(Easing::EaseOutCubic))
                .hover([("scale".to_string(), Value::from(1.1))].into_iter().collect())
                .active([("scale".to_string(), Value::from(0.95))].into_iter().collect())
                .exit_animation(fade)
                .on(EventType::Click, move |event| {
                    clicks.borrow_mut().push(format!("click {label} @ {}", event.timestamp_ms));
                }),
        )
    });

    Descriptor::of::<veneer_facade::Group>()
        .key("toolbar")
        .layout(LayoutStyle::row().gap(8.0).size(Length::Auto, Length::Px(32.0)))
        .children(buttons.collect::<Vec<_>>())
}

/// Snapshot laid-out boxes so the hit tester can run without borrowing the world
fn snapshot_boxes(world: &World, boxes: &Boxes) -> Result<()> {
    let toolbar = world
        .child(world.root(), "toolbar")
        .ok_or_else(|| anyhow!("toolbar missing"))?;
    let number = |id: FacadeId, name: &str| {
        world
            .get(id, name)
            .and_then(|value| value.as_number())
            .unwrap_or(0.0) as f32
    };
    *boxes.borrow_mut() = world
        .children(toolbar)
        .into_iter()
        .map(|id| {
            let rect = [
                number(id, "offset_left"),
                number(id, "offset_top"),
                number(id, "offset_width"),
                number(id, "offset_height"),
            ];
            (id, rect)
        })
        .collect();
    Ok(())
}

fn run_frames(world: &mut World, clock: &ManualClock, frames: usize) {
    for _ in 0..frames {
        clock.advance(16.0);
        if !world.tick() {
            break;
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let clock = ManualClock::new();
    let mut world = World::new(WorldConfig::default())
        .with_clock(clock.clone())
        .with_layout_engine(TaffyLayoutEngine::new());

    let clicks = Rc::new(RefCell::new(Vec::new()));
    world.update_root([Some(toolbar(&["new", "open", "save"], &clicks))])?;
    world.tick();

    let boxes: Boxes = Rc::default();
    snapshot_boxes(&world, &boxes)?;
    for (id, rect) in boxes.borrow().iter() {
        tracing::info!(key = world.key(*id).unwrap_or("?"), ?rect, "laid out");
    }

    let tester_boxes = boxes.clone();
    world.set_hit_test_fn(move |event, _| {
        tester_boxes
            .borrow()
            .iter()
            .filter(|(_, [left, top, width, height])| {
                let inside_x = event.x >= *left && event.x < left + width;
                inside_x && event.y >= *top && event.y < top + height
            })
            .map(|(id, _)| Hit::new(*id, 0.0))
            .collect()
    });

    let send = |world: &mut World, kind, x: f32| {
        let event = RawPointerEvent::new(kind, x, 16.0).at(world.now_ms());
        world.handle_pointer_event(&event);
    };

    // Sweep across the toolbar, settling on "open"
    for x in [10.0, 60.0, 100.0, 130.0] {
        send(&mut world, RawEventKind::MouseMove, x);
        run_frames(&mut world, &clock, 3);
    }
    run_frames(&mut world, &clock, 10);
    let open = world
        .hovered(Default::default())
        .ok_or_else(|| anyhow!("nothing hovered"))?;
    tracing::info!(
        key = world.key(open).unwrap_or("?"),
        scale = ?world.get(open, "scale"),
        "hovering"
    );

    // Double click "open"
    for _ in 0..2 {
        send(&mut world, RawEventKind::MouseDown, 130.0);
        run_frames(&mut world, &clock, 2);
        send(&mut world, RawEventKind::MouseUp, 130.0);
        run_frames(&mut world, &clock, 2);
    }
    for click in clicks.borrow().iter() {
        tracing::info!("{click}");
    }

    // Drop "save"; it fades out before it is torn down
    world.update_root([Some(toolbar(&["new", "open"], &clicks))])?;
    let toolbar_id = world
        .child(world.root(), "toolbar")
        .ok_or_else(|| anyhow!("toolbar missing"))?;
    tracing::info!(exiting = world.exiting_children(toolbar_id).len(), "removed save");
    run_frames(&mut world, &clock, 20);
    tracing::info!(
        exiting = world.exiting_children(toolbar_id).len(),
        buttons = world.children(toolbar_id).len(),
        "settled"
    );

    Ok(())
}
