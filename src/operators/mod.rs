//! Operators built on the subscription engine.
//!
//! Every operator is an [`Observable`](crate::observable::Observable) that
//! subscribes to its source through
//! [`ObservableExt::subscribe`](crate::observable::ObservableExt::subscribe)
//! and owns an `Arc` to the next stage. Recoverable errors pass through
//! unchanged unless an operator exists to consume them.
//!
//! - [`Map`], [`Filter`]: per-value transforms
//! - [`ObserveOn`]: batched, serialized delivery on a scheduler
//! - [`SubscribeOn`]: the act of subscribing moved onto a scheduler
//! - [`ThrottleFirstByTick`]: first value per window of frame ticks
//! - [`EmitOnce`]: a single value, now or after a delay
//! - [`aggregate`]: fold a sequence into an [`OutcomeFuture`](crate::future::OutcomeFuture)

pub mod aggregate;
mod emit_once;
mod observe_on;
mod subscribe_on;
mod throttle_first_by_tick;
mod transform;

pub use emit_once::{emit_once, emit_once_after, emit_once_after_on, EmitOnce};
pub use observe_on::ObserveOn;
pub use subscribe_on::SubscribeOn;
pub use throttle_first_by_tick::ThrottleFirstByTick;
pub use transform::{Filter, Map};
