use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::display::{Alignment, DisplayElement, DisplaySurface};
use crate::presentation::{ButtonSignal, ControlId, Presentation};

const NOW_PLAYING_ID: &str = "nowPlaying";
const NOW_PLAYING_PRIORITY: i32 = 0;

struct Control {
    element: Box<dyn DisplayElement>,
    signal: ButtonSignal,
}

/// Owns every element the session has created on the display surface.
pub(crate) struct ControlBoard {
    surface: Arc<dyn DisplaySurface>,
    now_playing: Option<Box<dyn DisplayElement>>,
    now_playing_text: String,
    controls: BTreeMap<ControlId, Control>,
}

impl ControlBoard {
    pub(crate) fn new(surface: Arc<dyn DisplaySurface>) -> Self {
        Self {
            surface,
            now_playing: None,
            now_playing_text: String::new(),
            controls: BTreeMap::new(),
        }
    }

    fn create(&mut self, id: ControlId, priority: i32) {
        if self.controls.contains_key(&id) {
            return;
        }
        let spec = id.spec();
        let signal = spec.initial_signal();
        let mut element = self.surface.create(id.as_str(), Alignment::Left, priority);
        element.set_text(&signal.text);
        element.set_tooltip(&signal.tooltip);
        element.set_color(signal.color.as_deref());
        element.set_command(spec.command);
        element.show();
        trace!(control = id.as_str(), "Created control.");
        self.controls.insert(id, Control { element, signal });
    }

    fn remove(&mut self, id: ControlId) {
        if let Some(mut control) = self.controls.remove(&id) {
            control.element.dispose();
            trace!(control = id.as_str(), "Removed control.");
        }
    }

    /// Creates the now-playing element and the player controls.
    pub(crate) fn install_player_controls(&mut self) {
        self.remove(ControlId::Auth);
        if self.now_playing.is_none() {
            let mut element =
                self.surface.create(NOW_PLAYING_ID, Alignment::Left, NOW_PLAYING_PRIORITY);
            element.hide();
            self.now_playing = Some(element);
        }
        let count = ControlId::PLAYER.len() as i32;
        for (index, id) in ControlId::PLAYER.iter().enumerate() {
            // Higher priority sits further left.
            self.create(*id, count - index as i32);
        }
        debug!("Player controls installed.");
    }

    /// Tears every player element down and leaves only `auth`.
    pub(crate) fn install_auth_control(&mut self) {
        for id in ControlId::PLAYER {
            self.remove(id);
        }
        if let Some(mut element) = self.now_playing.take() {
            element.dispose();
        }
        self.now_playing_text.clear();
        self.create(ControlId::Auth, 0);
        debug!("Auth control installed.");
    }

    pub(crate) fn render(&mut self, presentation: &Presentation) {
        for update in presentation.updates() {
            if let Some(control) = self.controls.get_mut(&update.control) {
                if control.signal.text != update.text {
                    control.element.set_text(update.text);
                }
                if let Some(tooltip) = update.tooltip {
                    control.element.set_tooltip(tooltip);
                }
                if let Some(color) = update.color {
                    control.element.set_color(Some(color));
                }
                control.signal.apply(&update);
            }
        }

        if let Some(element) = self.now_playing.as_mut() {
            if presentation.now_playing_text.is_empty() {
                element.hide();
            } else {
                element.set_text(&presentation.now_playing_text);
                element.show();
            }
            self.now_playing_text = presentation.now_playing_text.clone();
        }
    }

    pub(crate) fn signals(&self) -> BTreeMap<ControlId, ButtonSignal> {
        self.controls
            .iter()
            .map(|(id, control)| (*id, control.signal.clone()))
            .collect()
    }

    pub(crate) fn now_playing_text(&self) -> &str {
        &self.now_playing_text
    }

    pub(crate) fn dispose_all(&mut self) {
        let ids: Vec<ControlId> = self.controls.keys().copied().collect();
        for id in ids {
            self.remove(id);
        }
        if let Some(mut element) = self.now_playing.take() {
            element.dispose();
        }
        self.now_playing_text.clear();
    }
}
