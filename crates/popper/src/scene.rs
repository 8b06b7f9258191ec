//! In-memory host.
//!
//! [`Scene`] plays both collaborator roles: it answers measurements from a
//! table of rectangles and hands out [`SceneRenderer`]s that apply renderer
//! calls to the same table while recording them. Used by the tests and by
//! `popperkit simulate`.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;

use crate::{AuxKey, Display, ElementId, Measurement, Rect, Renderer, StyleProperty, Viewport};

/// One renderer call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RenderOp {
    SetStyle {
        element: ElementId,
        property: StyleProperty,
        value: String,
    },
    SetVisible {
        element: ElementId,
        display: Display,
    },
    AddClass {
        element: ElementId,
        class: String,
    },
    RemoveClass {
        element: ElementId,
        class: String,
    },
    StoreAux {
        element: ElementId,
        key: AuxKey,
        value: f64,
    },
    Commit {
        element: ElementId,
    },
}

/// A renderer call with the time it was made.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedOp {
    /// Milliseconds on the scene clock.
    pub at_ms: f64,
    #[serde(flatten)]
    pub op: RenderOp,
}

#[derive(Debug, Clone)]
struct Element {
    rect: Rect,
    attached: bool,
    display: Option<Display>,
    styles: HashMap<StyleProperty, String>,
    classes: BTreeSet<String>,
    aux: HashMap<AuxKey, f64>,
}

impl Element {
    fn new(rect: Rect) -> Self {
        Self {
            rect,
            attached: true,
            display: None,
            styles: HashMap::new(),
            classes: BTreeSet::new(),
            aux: HashMap::new(),
        }
    }
}

type Clock = Rc<dyn Fn() -> Duration>;

struct SceneState {
    elements: HashMap<ElementId, Element>,
    viewport: Viewport,
    ops: Vec<RecordedOp>,
    clock: Option<Clock>,
}

/// A table of elements plus a viewport, shared by every renderer it hands out.
#[derive(Clone)]
pub struct Scene {
    state: Rc<RefCell<SceneState>>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::with_viewport(Viewport::new(1280.0, 720.0))
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_viewport(viewport: Viewport) -> Self {
        Self {
            state: Rc::new(RefCell::new(SceneState {
                elements: HashMap::new(),
                viewport,
                ops: Vec::new(),
                clock: None,
            })),
        }
    }

    /// Timestamp recorded operations with `clock`.
    pub fn set_clock(&self, clock: impl Fn() -> Duration + 'static) {
        self.state.borrow_mut().clock = Some(Rc::new(clock));
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.state.borrow_mut().viewport = viewport;
    }

    /// Add (or replace) an attached element.
    pub fn insert(&self, element: ElementId, rect: Rect) {
        self.state
            .borrow_mut()
            .elements
            .insert(element, Element::new(rect));
    }

    /// Move or resize an element.
    pub fn set_rect(&self, element: ElementId, rect: Rect) {
        if let Some(el) = self.state.borrow_mut().elements.get_mut(&element) {
            el.rect = rect;
        }
    }

    /// Detach an element from the tree. Its recorded state stays inspectable.
    pub fn remove(&self, element: ElementId) {
        if let Some(el) = self.state.borrow_mut().elements.get_mut(&element) {
            el.attached = false;
        }
    }

    /// A renderer applying its calls to this scene.
    pub fn renderer(&self) -> SceneRenderer {
        SceneRenderer {
            state: Rc::clone(&self.state),
        }
    }

    pub fn ops(&self) -> Vec<RecordedOp> {
        self.state.borrow().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.borrow_mut().ops.clear();
    }

    /// Number of times the element was made opaque.
    pub fn reveal_count(&self, element: ElementId) -> usize {
        self.state
            .borrow()
            .ops
            .iter()
            .filter(|r| {
                matches!(
                    &r.op,
                    RenderOp::SetStyle { element: e, property: StyleProperty::Opacity, value }
                        if *e == element && value == "1"
                )
            })
            .count()
    }

    pub fn style(&self, element: ElementId, property: StyleProperty) -> Option<String> {
        self.state
            .borrow()
            .elements
            .get(&element)
            .and_then(|el| el.styles.get(&property).cloned())
    }

    pub fn classes(&self, element: ElementId) -> Vec<String> {
        self.state
            .borrow()
            .elements
            .get(&element)
            .map(|el| el.classes.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn display(&self, element: ElementId) -> Option<Display> {
        self.state
            .borrow()
            .elements
            .get(&element)
            .and_then(|el| el.display)
    }

    pub fn aux(&self, element: ElementId, key: AuxKey) -> Option<f64> {
        self.state
            .borrow()
            .elements
            .get(&element)
            .and_then(|el| el.aux.get(&key).copied())
    }
}

impl Measurement for Scene {
    fn absolute_rect(&self, element: ElementId) -> Option<Rect> {
        self.state
            .borrow()
            .elements
            .get(&element)
            .filter(|el| el.attached)
            .map(|el| el.rect)
    }

    fn viewport(&self) -> Viewport {
        self.state.borrow().viewport
    }
}

/// [`Renderer`] backed by a [`Scene`].
///
/// Every call is recorded, including calls on detached elements; only
/// attached elements have their state updated.
#[derive(Clone)]
pub struct SceneRenderer {
    state: Rc<RefCell<SceneState>>,
}

impl SceneRenderer {
    fn apply(&mut self, op: RenderOp, update: impl FnOnce(&mut Element)) {
        let clock = self.state.borrow().clock.clone();
        let at_ms = clock.map_or(0.0, |now| (*now)().as_secs_f64() * 1000.0);

        let mut state = self.state.borrow_mut();
        let element = match &op {
            RenderOp::SetStyle { element, .. }
            | RenderOp::SetVisible { element, .. }
            | RenderOp::AddClass { element, .. }
            | RenderOp::RemoveClass { element, .. }
            | RenderOp::StoreAux { element, .. }
            | RenderOp::Commit { element } => *element,
        };
        if let Some(el) = state.elements.get_mut(&element).filter(|el| el.attached) {
            update(el);
        }
        state.ops.push(RecordedOp { at_ms, op });
    }
}

impl Renderer for SceneRenderer {
    fn is_attached(&self, element: ElementId) -> bool {
        self.state
            .borrow()
            .elements
            .get(&element)
            .is_some_and(|el| el.attached)
    }

    fn set_style(&mut self, element: ElementId, property: StyleProperty, value: &str) {
        let op = RenderOp::SetStyle {
            element,
            property,
            value: value.to_string(),
        };
        self.apply(op, |el| {
            el.styles.insert(property, value.to_string());
        });
    }

    fn set_visible(&mut self, element: ElementId, display: Display) {
        self.apply(RenderOp::SetVisible { element, display }, |el| {
            el.display = Some(display);
        });
    }

    fn add_class(&mut self, element: ElementId, class: &str) {
        let op = RenderOp::AddClass {
            element,
            class: class.to_string(),
        };
        self.apply(op, |el| {
            el.classes.insert(class.to_string());
        });
    }

    fn remove_class(&mut self, element: ElementId, class: &str) {
        let op = RenderOp::RemoveClass {
            element,
            class: class.to_string(),
        };
        self.apply(op, |el| {
            el.classes.remove(class);
        });
    }

    fn store_aux(&mut self, element: ElementId, key: AuxKey, value: f64) {
        self.apply(RenderOp::StoreAux { element, key, value }, |el| {
            el.aux.insert(key, value);
        });
    }

    fn read_aux(&self, element: ElementId, key: AuxKey) -> Option<f64> {
        self.state
            .borrow()
            .elements
            .get(&element)
            .and_then(|el| el.aux.get(&key).copied())
    }

    fn commit(&mut self, element: ElementId) {
        self.apply(RenderOp::Commit { element }, |_| {});
    }
}
