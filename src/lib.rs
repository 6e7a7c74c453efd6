pub mod app;
pub mod cli;
pub mod clock;
pub mod display;
pub mod drive;
pub mod format;
pub mod history;
pub mod session;
pub mod stopwatch;
pub mod sync;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use session::{Lap, SessionRecord};
pub use stopwatch::{Observer, State, StopWatch};
