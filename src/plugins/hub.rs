use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use super::{AnyObserver, Assembly, SubscribeInfo};
use crate::error::RxError;
use crate::observable::Observable;
use crate::observers::BoxObserver;
use crate::schedulers::{Runnable, SchedulerRef};

/// Receives errors that cannot be delivered through a pipeline.
pub type ErrorHandler = Arc<dyn Fn(RxError) + Send + Sync>;
/// Wraps every task handed to a scheduler or worker.
pub type ScheduleHook = Arc<dyn Fn(Runnable) -> Runnable + Send + Sync>;
/// Substitutes a built-in scheduler on every lookup.
pub type SchedulerHook = Arc<dyn Fn(SchedulerRef) -> SchedulerRef + Send + Sync>;
/// Substitutes a built-in scheduler when it is first created; receives the default factory.
pub type InitSchedulerHook =
    Arc<dyn Fn(&dyn Fn() -> SchedulerRef) -> SchedulerRef + Send + Sync>;
/// Inspects or replaces every assembled observable.
pub type AssemblyHook = Arc<dyn Fn(Assembly) -> Assembly + Send + Sync>;
/// Inspects or replaces every subscribing observer. Returning `None` fails the subscribe.
pub type SubscribeHook =
    Arc<dyn Fn(&SubscribeInfo, AnyObserver) -> Option<AnyObserver> + Send + Sync>;

static GLOBAL: OnceLock<Plugins> = OnceLock::new();

/// # Hook registry.
///
/// Operators and schedulers consult [`Plugins::global`]. Independent instances can be built
/// with [`Plugins::new`] (useful to exercise hooks in isolation).
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use rxvisor::{Plugins, RxError};
///
/// let plugins = Plugins::new();
/// plugins.set_error_handler(Some(Arc::new(|e: RxError| eprintln!("dropped: {e}")))).unwrap();
/// plugins.lockdown();
/// assert!(plugins.set_error_handler(None).is_err());
/// ```
#[derive(Default)]
pub struct Plugins {
    locked: AtomicBool,
    error_handler: ArcSwapOption<ErrorHook>,
    on_schedule: ArcSwapOption<ScheduleHookCell>,
    init_computation: ArcSwapOption<InitHookCell>,
    init_io: ArcSwapOption<InitHookCell>,
    on_computation: ArcSwapOption<SchedulerHookCell>,
    on_io: ArcSwapOption<SchedulerHookCell>,
    on_assembly: ArcSwapOption<AssemblyHookCell>,
    on_subscribe: ArcSwapOption<SubscribeHookCell>,
}

// `ArcSwapOption<T>` stores `Arc<T>`; the hooks are already `Arc<dyn ..>`, so each one is
// stored as a sized newtype.
struct ErrorHook(ErrorHandler);
struct ScheduleHookCell(ScheduleHook);
struct InitHookCell(InitSchedulerHook);
struct SchedulerHookCell(SchedulerHook);
struct AssemblyHookCell(AssemblyHook);
struct SubscribeHookCell(SubscribeHook);

impl Plugins {
    /// Creates an empty, unlocked registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by every operator and scheduler.
    pub fn global() -> &'static Plugins {
        GLOBAL.get_or_init(Plugins::new)
    }

    /// Prevents any further hook change. One-way.
    pub fn lockdown(&self) {
        if !self.locked.swap(true, Ordering::AcqRel) {
            tracing::debug!("plugins locked down");
        }
    }

    /// Whether [`lockdown`](Plugins::lockdown) was called.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Removes every hook.
    pub fn reset(&self) -> Result<(), RxError> {
        self.ensure_unlocked()?;
        self.error_handler.store(None);
        self.on_schedule.store(None);
        self.init_computation.store(None);
        self.init_io.store(None);
        self.on_computation.store(None);
        self.on_io.store(None);
        self.on_assembly.store(None);
        self.on_subscribe.store(None);
        tracing::debug!("plugins reset");
        Ok(())
    }

    fn ensure_unlocked(&self) -> Result<(), RxError> {
        if self.is_locked() {
            return Err(RxError::illegal_state("Plugins can't be changed anymore"));
        }
        Ok(())
    }

    /// Installs (or with `None` removes) the undeliverable-error handler.
    pub fn set_error_handler(&self, handler: Option<ErrorHandler>) -> Result<(), RxError> {
        self.ensure_unlocked()?;
        self.error_handler.store(handler.map(|h| Arc::new(ErrorHook(h))));
        tracing::debug!(hook = "error_handler", "plugin hook changed");
        Ok(())
    }

    /// Installs (or removes) the task-wrapping hook.
    pub fn set_schedule_handler(&self, hook: Option<ScheduleHook>) -> Result<(), RxError> {
        self.ensure_unlocked()?;
        self.on_schedule.store(hook.map(|h| Arc::new(ScheduleHookCell(h))));
        tracing::debug!(hook = "on_schedule", "plugin hook changed");
        Ok(())
    }

    /// Installs (or removes) the hook consulted when the computation scheduler is created.
    pub fn set_init_computation_handler(
        &self,
        hook: Option<InitSchedulerHook>,
    ) -> Result<(), RxError> {
        self.ensure_unlocked()?;
        self.init_computation.store(hook.map(|h| Arc::new(InitHookCell(h))));
        tracing::debug!(hook = "init_computation", "plugin hook changed");
        Ok(())
    }

    /// Installs (or removes) the hook consulted when the io scheduler is created.
    pub fn set_init_io_handler(&self, hook: Option<InitSchedulerHook>) -> Result<(), RxError> {
        self.ensure_unlocked()?;
        self.init_io.store(hook.map(|h| Arc::new(InitHookCell(h))));
        tracing::debug!(hook = "init_io", "plugin hook changed");
        Ok(())
    }

    /// Installs (or removes) the hook consulted on every computation lookup.
    pub fn set_computation_handler(&self, hook: Option<SchedulerHook>) -> Result<(), RxError> {
        self.ensure_unlocked()?;
        self.on_computation.store(hook.map(|h| Arc::new(SchedulerHookCell(h))));
        tracing::debug!(hook = "on_computation", "plugin hook changed");
        Ok(())
    }

    /// Installs (or removes) the hook consulted on every io lookup.
    pub fn set_io_handler(&self, hook: Option<SchedulerHook>) -> Result<(), RxError> {
        self.ensure_unlocked()?;
        self.on_io.store(hook.map(|h| Arc::new(SchedulerHookCell(h))));
        tracing::debug!(hook = "on_io", "plugin hook changed");
        Ok(())
    }

    /// Installs (or removes) the assembly hook.
    pub fn set_assembly_handler(&self, hook: Option<AssemblyHook>) -> Result<(), RxError> {
        self.ensure_unlocked()?;
        self.on_assembly.store(hook.map(|h| Arc::new(AssemblyHookCell(h))));
        tracing::debug!(hook = "on_assembly", "plugin hook changed");
        Ok(())
    }

    /// Installs (or removes) the subscribe hook.
    pub fn set_subscribe_handler(&self, hook: Option<SubscribeHook>) -> Result<(), RxError> {
        self.ensure_unlocked()?;
        self.on_subscribe.store(hook.map(|h| Arc::new(SubscribeHookCell(h))));
        tracing::debug!(hook = "on_subscribe", "plugin hook changed");
        Ok(())
    }

    /// Routes an error that has no downstream left.
    ///
    /// Bug kinds (see [`RxError::is_bug`]) reach the handler as-is; anything else is wrapped
    /// in [`RxError::Undeliverable`]. Without a handler, or if the handler panics, the error
    /// is logged on target `rxvisor::uncaught`.
    pub fn on_error(&self, error: RxError) {
        let error = if error.is_bug() {
            error
        } else {
            RxError::Undeliverable {
                cause: Arc::new(error),
            }
        };
        match self.error_handler.load_full() {
            Some(hook) => {
                let forwarded = error.clone();
                if guarded("error_handler", move || (hook.0)(forwarded)).is_none() {
                    uncaught(&error);
                }
            }
            None => uncaught(&error),
        }
    }

    /// Passes a task through the task-wrapping hook.
    pub fn on_schedule(&self, task: Runnable) -> Runnable {
        let Some(hook) = self.on_schedule.load_full() else {
            return task;
        };
        // The hook only sees a proxy so the real task survives a panicking hook.
        let slot = Arc::new(Mutex::new(Some(task)));
        let proxied = Arc::clone(&slot);
        let proxy: Runnable = Box::new(move || {
            let task = proxied.lock().take();
            if let Some(task) = task {
                task();
            }
        });
        match guarded("on_schedule", move || (hook.0)(proxy)) {
            Some(wrapped) => wrapped,
            None => Box::new(move || {
                let task = slot.lock().take();
                if let Some(task) = task {
                    task();
                }
            }),
        }
    }

    pub(crate) fn init_computation(&self, default: &dyn Fn() -> SchedulerRef) -> SchedulerRef {
        Self::apply_init(self.init_computation.load_full(), "init_computation", default)
    }

    pub(crate) fn init_io(&self, default: &dyn Fn() -> SchedulerRef) -> SchedulerRef {
        Self::apply_init(self.init_io.load_full(), "init_io", default)
    }

    fn apply_init(
        hook: Option<Arc<InitHookCell>>,
        site: &'static str,
        default: &dyn Fn() -> SchedulerRef,
    ) -> SchedulerRef {
        match hook {
            Some(hook) => guarded(site, || (hook.0)(default)).unwrap_or_else(default),
            None => default(),
        }
    }

    pub(crate) fn on_computation(&self, scheduler: SchedulerRef) -> SchedulerRef {
        Self::apply_scheduler(self.on_computation.load_full(), "on_computation", scheduler)
    }

    pub(crate) fn on_io(&self, scheduler: SchedulerRef) -> SchedulerRef {
        Self::apply_scheduler(self.on_io.load_full(), "on_io", scheduler)
    }

    fn apply_scheduler(
        hook: Option<Arc<SchedulerHookCell>>,
        site: &'static str,
        scheduler: SchedulerRef,
    ) -> SchedulerRef {
        match hook {
            Some(hook) => {
                let fallback = Arc::clone(&scheduler);
                guarded(site, move || (hook.0)(scheduler)).unwrap_or(fallback)
            }
            None => scheduler,
        }
    }

    /// Passes a freshly built observable through the assembly hook.
    ///
    /// Operators assembled by the hook itself (e.g. a hook that appends a `filter`) are
    /// not passed through it again.
    pub(crate) fn on_assembly<T: Send + 'static>(
        &self,
        name: &'static str,
        observable: Observable<T>,
    ) -> Observable<T> {
        if IN_ASSEMBLY_HOOK.with(Cell::get) {
            return observable;
        }
        let Some(hook) = self.on_assembly.load_full() else {
            return observable;
        };
        let fallback = observable.clone();
        let assembly = Assembly::new(name, observable);
        let _nested = AssemblyHookScope::enter();
        match guarded("on_assembly", move || (hook.0)(assembly)) {
            Some(replaced) => match replaced.into_observable::<T>() {
                Some(obs) => obs,
                None => {
                    self.on_error(RxError::illegal_state(format!(
                        "assembly hook changed the element type of `{name}`"
                    )));
                    fallback
                }
            },
            None => fallback,
        }
    }

    /// Passes the subscribing observer through the subscribe hook.
    ///
    /// Fails with [`RxError::Null`] if the hook returns no observer (or panics, which loses
    /// the observer) and with [`RxError::IllegalState`] if it changes the element type.
    pub(crate) fn on_subscribe<T: 'static>(
        &self,
        source: &'static str,
        observer: BoxObserver<T>,
    ) -> Result<BoxObserver<T>, RxError> {
        let Some(hook) = self.on_subscribe.load_full() else {
            return Ok(observer);
        };
        let info = SubscribeInfo { source };
        let erased = AnyObserver::new(observer);
        let replaced = guarded("on_subscribe", move || (hook.0)(&info, erased)).flatten();
        match replaced {
            Some(any) => any.downcast::<T>().map_err(|_| {
                RxError::illegal_state(format!(
                    "subscribe hook changed the element type of `{source}`"
                ))
            }),
            None => Err(RxError::null("Plugin returned null Observer")),
        }
    }
}

impl std::fmt::Debug for Plugins {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugins")
            .field("locked", &self.is_locked())
            .field("error_handler", &self.error_handler.load().is_some())
            .field("on_assembly", &self.on_assembly.load().is_some())
            .field("on_subscribe", &self.on_subscribe.load().is_some())
            .finish_non_exhaustive()
    }
}

thread_local! {
    static IN_ASSEMBLY_HOOK: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as running the assembly hook until dropped.
struct AssemblyHookScope;

impl AssemblyHookScope {
    fn enter() -> Self {
        IN_ASSEMBLY_HOOK.with(|flag| flag.set(true));
        AssemblyHookScope
    }
}

impl Drop for AssemblyHookScope {
    fn drop(&mut self) {
        IN_ASSEMBLY_HOOK.with(|flag| flag.set(false));
    }
}

/// Runs a hook, turning a panic into `None` after logging it as uncaught.
fn guarded<R>(site: &'static str, f: impl FnOnce() -> R) -> Option<R> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            let err = RxError::from_panic(payload.as_ref());
            tracing::error!(
                target: "rxvisor::uncaught",
                hook = site,
                label = err.as_label(),
                error = %err,
                "plugin hook panicked"
            );
            None
        }
    }
}

/// Last-resort sink for errors nobody handles.
fn uncaught(error: &RxError) {
    tracing::error!(
        target: "rxvisor::uncaught",
        label = error.as_label(),
        error = %error,
        "undeliverable error"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schedulers::TokioScheduler;
    use std::sync::atomic::AtomicUsize;

    fn capture(plugins: &Plugins) -> Arc<Mutex<Vec<RxError>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        plugins
            .set_error_handler(Some(Arc::new(move |e: RxError| sink.lock().push(e))))
            .unwrap();
        seen
    }

    #[test]
    fn bug_kinds_arrive_unwrapped() {
        let plugins = Plugins::new();
        let seen = capture(&plugins);
        plugins.on_error(RxError::null("missing"));
        plugins.on_error(RxError::SchedulerFatal {
            message: "boom".into(),
        });
        let kinds: Vec<_> = seen.lock().iter().map(RxError::kind).collect();
        assert_eq!(kinds, vec![ErrorKind::Null, ErrorKind::SchedulerFatal]);
    }

    #[test]
    fn other_errors_arrive_wrapped() {
        let plugins = Plugins::new();
        let seen = capture(&plugins);
        plugins.on_error(RxError::custom(std::io::Error::other("gone")));
        let seen = seen.lock();
        assert_eq!(seen[0].kind(), ErrorKind::Undeliverable);
        assert_eq!(seen[0].cause().map(RxError::kind), Some(ErrorKind::Custom));
    }

    #[test]
    fn panicking_error_handler_falls_back() {
        let plugins = Plugins::new();
        plugins
            .set_error_handler(Some(Arc::new(|_: RxError| panic!("handler broke"))))
            .unwrap();
        plugins.on_error(RxError::null("x"));
    }

    #[test]
    fn lockdown_freezes_every_setter() {
        let plugins = Plugins::new();
        plugins.lockdown();
        assert!(plugins.is_locked());
        let err = plugins.set_error_handler(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalState);
        assert!(plugins.set_schedule_handler(None).is_err());
        assert!(plugins.set_assembly_handler(None).is_err());
        assert!(plugins.set_subscribe_handler(None).is_err());
        assert!(plugins.reset().is_err());
    }

    #[test]
    fn panicking_schedule_hook_keeps_the_task() {
        let plugins = Plugins::new();
        plugins
            .set_schedule_handler(Some(Arc::new(|_: Runnable| -> Runnable {
                panic!("wrapper broke")
            })))
            .unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let task = plugins.on_schedule(Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        task();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn schedule_hook_wraps_tasks() {
        let plugins = Plugins::new();
        let wrapped = Arc::new(AtomicUsize::new(0));
        let w = Arc::clone(&wrapped);
        plugins
            .set_schedule_handler(Some(Arc::new(move |task: Runnable| -> Runnable {
                let w = Arc::clone(&w);
                Box::new(move || {
                    w.fetch_add(1, Ordering::SeqCst);
                    task();
                })
            })))
            .unwrap();
        plugins.on_schedule(Box::new(|| {}))();
        assert_eq!(wrapped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scheduler_hooks_substitute_and_fall_back() {
        let plugins = Plugins::new();
        let replacement: SchedulerRef = TokioScheduler::from_current().unwrap();
        let r = Arc::clone(&replacement);
        plugins
            .set_computation_handler(Some(Arc::new(move |_: SchedulerRef| Arc::clone(&r))))
            .unwrap();
        let original: SchedulerRef = TokioScheduler::from_current().unwrap();
        let chosen = plugins.on_computation(Arc::clone(&original));
        assert!(Arc::ptr_eq(&chosen, &replacement));

        plugins
            .set_io_handler(Some(Arc::new(|_: SchedulerRef| -> SchedulerRef {
                panic!("io hook broke")
            })))
            .unwrap();
        let chosen = plugins.on_io(Arc::clone(&original));
        assert!(Arc::ptr_eq(&chosen, &original));
    }

    #[test]
    fn assembly_hook_cannot_change_the_element_type() {
        let plugins = Plugins::new();
        plugins
            .set_assembly_handler(Some(Arc::new(|a: Assembly| {
                Assembly::new(a.name(), Observable::just("wrong type"))
            })))
            .unwrap();
        let seen = capture(&plugins);
        let source = Observable::just(1);
        let kept = plugins.on_assembly("just", source.clone());
        assert!(kept.ptr_eq(&source));
        assert_eq!(seen.lock()[0].kind(), ErrorKind::IllegalState);
    }

    #[test]
    fn subscribe_hook_returning_nothing_is_null() {
        let plugins = Plugins::new();
        plugins
            .set_subscribe_handler(Some(Arc::new(|_: &SubscribeInfo, _: AnyObserver| None)))
            .unwrap();
        let rec = crate::test_support::Recorder::<u8>::new();
        match plugins.on_subscribe("just", rec.boxed()) {
            Ok(_) => panic!("a hook returning no observer must fail the subscribe"),
            Err(err) => assert_eq!(err.kind(), ErrorKind::Null),
        }
    }
}
