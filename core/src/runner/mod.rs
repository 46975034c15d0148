mod drain;
mod inproc;
mod io_pump;
mod traits;
pub mod types;

pub use drain::{drain_session, DrainOptions, DrainReport, LineHandler};
pub use inproc::{InProcessFn, InProcessIo, InProcessWorkerPlugin, ProgressReporter};
pub use io_pump::{pump_lines, LineTap};
pub use traits::{WorkerPlugin, WorkerSession};
pub use types::{Channel, WorkerOutcome, WorkerStartArgs};
