pub mod events;
mod guard;
mod runner;
mod step;

pub use events::{
    CompositeEventSink, Event, EventSink, NoOpEventSink, StdoutEventSink, TextEventSink,
    TracingEventSink,
};
pub(crate) use guard::{panic_message, run_guarded, Guarded};
pub use runner::StepWorkflow;
pub use step::{action_fn, ActionError, ActionResult, DryRunAction, FnAction, Step, StepAction};
