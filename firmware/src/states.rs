//! State machine.

use ufmt::{uDisplay, uWrite, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Components are being set up
    Starting,
    /// The last read succeeded
    Running,
    /// The last read failed, indicators show the last known classification
    SensorFault,
}

impl State {
    /// Determine the state after a completed read.
    pub fn after_read(self, success: bool) -> Self {
        // Every state behaves the same, SensorFault only marks the outcome
        if success {
            Self::Running
        } else {
            Self::SensorFault
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::SensorFault => "SensorFault",
        }
    }
}

impl uDisplay for State {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str(self.as_str())
    }
}
