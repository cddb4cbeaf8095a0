//! Present-to-present bookkeeping for the temporal reset flag.

use log::debug;

#[derive(Debug, Default)]
pub struct FrameBoundaryTracker {
    invoked_this_frame: bool,
    reset_pending: bool,
}

impl FrameBoundaryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the next evaluation must discard temporal history.
    pub fn reset_pending(&self) -> bool {
        self.reset_pending
    }

    pub fn invoked_this_frame(&self) -> bool {
        self.invoked_this_frame
    }

    /// Called after a successful evaluation; consumes the reset flag.
    pub fn mark_invoked(&mut self) {
        self.invoked_this_frame = true;
        self.reset_pending = false;
    }

    /// Called on present, after every draw of the frame.
    pub fn on_present(&mut self) {
        if !self.invoked_this_frame && !self.reset_pending {
            debug!("Frame ended without an upscaling pass, next evaluation resets history");
        }
        self.reset_pending = !self.invoked_this_frame;
        self.invoked_this_frame = false;
    }
}
