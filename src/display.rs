//! Seams to the host editor. The crate never renders anything itself; it
//! drives status-bar-like elements and user notifications through these
//! traits.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Right,
}

/// One status-bar-like element created by the host.
pub trait DisplayElement: Send {
    fn set_text(&mut self, text: &str);
    fn set_tooltip(&mut self, tooltip: &str);
    fn set_color(&mut self, color: Option<&str>);
    /// Host command run when the element is clicked.
    fn set_command(&mut self, command: &str);
    fn show(&mut self);
    fn hide(&mut self);
    fn dispose(&mut self);
}

pub trait DisplaySurface: Send + Sync {
    fn create(&self, id: &str, alignment: Alignment, priority: i32) -> Box<dyn DisplayElement>;
}

/// User-visible one-shot messages.
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str);
    fn info(&self, message: &str);
}
