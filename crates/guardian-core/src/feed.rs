//! A reading source paired with the previous reading it produced.

use tracing::{debug, warn};

use guardian_contracts::{error::GuardianResult, reading::Reading, stream::StreamEvent};

use crate::{pipeline::Pipeline, traits::ReadingSource};

/// The driver-side state that must survive between ticks.
///
/// `previous` is the last reading this feed successfully pushed through the
/// pipeline. A replay source that wraps around is invisible here: the row
/// after the wrap is compared with the last row before it. Only a session
/// break reported by the source, or a restart, clears it.
pub struct Feed {
    source: Box<dyn ReadingSource>,
    previous: Option<Reading>,
}

impl Feed {
    pub fn new(source: Box<dyn ReadingSource>) -> Self {
        Self {
            source,
            previous: None,
        }
    }

    pub fn previous(&self) -> Option<&Reading> {
        self.previous.as_ref()
    }

    /// Forget the previous reading. Called whenever the driver (re)starts.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    pub fn check_ready(&self) -> GuardianResult<()> {
        self.source.check_ready()
    }

    pub fn size_hint(&self) -> Option<usize> {
        self.source.size_hint()
    }

    /// Pull one reading and run it through `pipeline`.
    ///
    /// Returns `None` when the tick was skipped: the source produced no
    /// usable reading or the audit append failed. `previous` is untouched
    /// in that case.
    pub fn tick(&mut self, pipeline: &Pipeline) -> Option<StreamEvent> {
        let reading = match self.source.next_reading() {
            Ok(reading) => reading,
            Err(e) => {
                warn!(error = %e, "tick skipped: no usable reading");
                return None;
            }
        };

        if self.source.take_session_break() && self.previous.is_some() {
            debug!(timestamp = reading.timestamp, "new session; previous reading cleared");
            self.previous = None;
        }

        match pipeline.process(reading, self.previous.as_ref()) {
            Ok(event) => {
                self.previous = Some(reading);
                Some(event)
            }
            Err(e) => {
                warn!(error = %e, timestamp = reading.timestamp, "tick skipped: pipeline error");
                None
            }
        }
    }
}
