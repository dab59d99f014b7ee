//! # Process-wide interception hub.
//!
//! [`Plugins`] holds optional hooks that every component funnels through:
//!
//! ```text
//!   undeliverable errors ──► error handler     (default: log on target rxvisor::uncaught)
//!   scheduled tasks      ──► on_schedule       (wrap / decorate a task)
//!   built-in schedulers  ──► init_* / on_*     (substitute computation or io)
//!   operator assembly    ──► on_assembly       (inspect / replace a freshly built Observable)
//!   subscribe            ──► on_subscribe      (inspect / replace the subscribing observer)
//! ```
//!
//! ## Rules
//! - Hooks are single-writer / many-reader atomic references; reading a hook never locks.
//! - After [`Plugins::lockdown`] every setter fails with `RxError::IllegalState`.
//! - A panicking hook is caught, logged as uncaught, and the default behavior is used.
//! - The assembly and subscribe hooks are type-erased ([`Assembly`], [`AnyObserver`]); a hook
//!   that changes the element type is rejected and the original value kept.

mod erased;
mod hub;

pub use erased::{AnyObserver, Assembly, SubscribeInfo};
pub use hub::{
    AssemblyHook, ErrorHandler, InitSchedulerHook, Plugins, ScheduleHook, SchedulerHook,
    SubscribeHook,
};
