//! HTTP surface of the scheduler core: health and the workflow result
//! callback. The wider CRUD API lives elsewhere; only the callback is part
//! of the task lifecycle engine.

pub mod router;

pub use router::{router, ApiState};
