//! Layer opacity slider state shared by several views.
//!
//! Any view may change an opacity; every *other* registered view is then
//! told to refresh, in registration order. The caller is skipped so a view
//! reacting to its own change cannot loop.

/// Handle identifying a registered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(u32);

type Refresh = Box<dyn FnMut(&[f32])>;

/// Owns the per-layer opacities (outermost layer first) and the views to
/// notify when they change.
#[derive(Default)]
pub struct LayerOpacityManager {
    opacities: Vec<f32>,
    views: Vec<(ViewId, Refresh)>,
    next_id: u32,
}

impl LayerOpacityManager {
    /// Manager with no layers and no views.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to `layer_count` fully opaque layers. Registered views are kept
    /// and not notified.
    pub fn init(&mut self, layer_count: usize) {
        self.opacities = vec![1.0; layer_count];
    }

    /// Current opacities, outermost first.
    pub fn layer_opacities(&self) -> &[f32] {
        &self.opacities
    }

    /// Register a refresh callback, returning its handle. The callback
    /// receives the new opacities.
    pub fn add_view(&mut self, callback: impl FnMut(&[f32]) + 'static) -> ViewId {
        let id = ViewId(self.next_id);
        self.next_id += 1;
        self.views.push((id, Box::new(callback)));
        id
    }

    /// Unregister a view. Unknown handles are ignored.
    pub fn remove_view(&mut self, id: ViewId) {
        self.views.retain(|(view, _)| *view != id);
    }

    /// Number of registered views.
    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// Set one layer's opacity (clamped to `[0, 1]`) and notify every view
    /// except `from`. Out-of-range layers are ignored.
    pub fn set_layer_opacity(&mut self, layer: usize, value: f32, from: Option<ViewId>) {
        let Some(slot) = self.opacities.get_mut(layer) else {
            log::warn!(
                "ignoring opacity for layer {layer}; {} layers",
                self.opacities.len()
            );
            return;
        };
        *slot = value.clamp(0.0, 1.0);
        self.update_all_but(from);
    }

    /// Replace every opacity (each clamped to `[0, 1]`) and notify every
    /// view except `from`.
    pub fn set_layer_opacities(&mut self, values: &[f32], from: Option<ViewId>) {
        self.opacities = values.iter().map(|v| v.clamp(0.0, 1.0)).collect();
        self.update_all_but(from);
    }

    fn update_all_but(&mut self, from: Option<ViewId>) {
        let opacities = &self.opacities;
        for (id, callback) in &mut self.views {
            if Some(*id) != from {
                callback(opacities);
            }
        }
    }
}
