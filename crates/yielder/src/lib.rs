//! Pull-based consumption of a dynamically growing set of async tasks.
//!
//! A [`Yielder`] accepts tasks (and directly injected values) at any time,
//! including from inside running tasks, and hands results back through a
//! synchronous iterator:
//!
//! - unordered: results come out as soon as they are ready
//! - ordered: results come out in exact spawn/put order, early finishers wait
//!
//! An optional pool size caps how many tasks run at once. The first task
//! failure is held back until every deliverable value has been yielded.

pub mod drain;
pub mod limiter;
pub mod registry;
mod shared;
mod sink;
pub mod spawner;
pub mod yielder;

pub use drain::{Drain, IntoDrain};
pub use limiter::Limiter;
pub use registry::TaskHandle;
pub use spawner::Spawner;
pub use yielder::Yielder;
pub use yieldpool_core::{load_dotenv, BoxError, TaskFailure, YieldConfig, YieldError};
