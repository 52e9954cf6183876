//! # Marquee Core
//!
//! Core traits and types for Marquee's checkout-to-fulfillment workflow.
//!
//! Every state transition in the workflow (opening a pending order,
//! confirming it from a verified gateway event, releasing inventory on a
//! refund) flows through the same shape:
//!
//! - **State**: owned domain state for an aggregate
//! - **Action**: all inputs to a reducer (commands and recorded events)
//! - **Reducer**: pure function `(State, Action, Environment) → Effects`
//! - **Effect**: a description of a side effect, never its execution
//! - **Environment**: injected dependencies (clock, gateway, archive)
//!
//! Keeping the transitions pure is what makes the fulfillment reconciler
//! testable under at-least-once webhook delivery: a redelivered event is
//! just the same action reduced twice, and the tests can assert it is a
//! no-op the second time.
//!
//! ## Example
//!
//! ```ignore
//! use marquee_core::{effect::Effect, reducer::Reducer, SmallVec};
//!
//! impl Reducer for FulfillmentReducer {
//!     type State = CheckoutState;
//!     type Action = FulfillmentAction;
//!     type Environment = FulfillmentEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut CheckoutState,
//!         action: FulfillmentAction,
//!         env: &FulfillmentEnvironment,
//!     ) -> SmallVec<[Effect<FulfillmentAction>; 4]> {
//!         // exactly one transition per verified gateway event
//!         SmallVec::new()
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Reducer module - the core trait for business logic.
///
/// Reducers are pure functions: `(State, Action, Environment) → Effects`.
/// They validate, update state in place, and return effect descriptions.
/// All of Marquee's consistency-sensitive logic (idempotency guards, the
/// inventory delta applied together with an order transition) lives in
/// reducer implementations so it can be exercised without I/O.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic.
    ///
    /// # Type Parameters
    ///
    /// - `State`: the domain state this reducer operates on
    /// - `Action`: the action type this reducer processes
    /// - `Environment`: the injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects.
        ///
        /// This is a pure function that:
        /// 1. Validates the action against current state
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed by the store
        ///
        /// Reducers must be safe to call with the same action twice:
        /// actions that would repeat a completed transition are expected
        /// to leave state untouched.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - side effect descriptions.
///
/// Effects are values returned from reducers and executed by the store
/// runtime. A reducer that wants to archive an order or schedule a
/// follow-up action describes the work here instead of performing it.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Describes a side effect to be executed after a transition commits.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: the action type an effect may feed back into the reducer
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (for timeouts, retries)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after the delay
            action: Box<Action>,
        },

        /// Arbitrary async computation.
        ///
        /// Resolves to `Option<Action>`; `Some` is fed back into the
        /// reducer as a new transition.
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Wrap an async computation as an effect.
        pub fn future<F>(fut: F) -> Effect<Action>
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }
    }
}

/// Environment module - dependency injection traits.
///
/// External dependencies are abstracted behind traits and injected via
/// each aggregate's Environment parameter. The only trait defined here is
/// the one every aggregate needs; domain-specific dependencies (payment
/// gateway, order archive) live with the code that owns them.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability.
    ///
    /// Order timestamps (`created_at`, `purchased_at`, `refunded_at`) are
    /// all read through this seam so reducer tests can pin time.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;

    #[test]
    fn effect_merge_is_parallel() {
        let merged: Effect<()> = Effect::merge(vec![Effect::None, Effect::None]);
        assert!(matches!(merged, Effect::Parallel(ref effects) if effects.len() == 2));
    }

    #[test]
    fn effect_chain_is_sequential() {
        let chained: Effect<()> = Effect::chain(vec![Effect::None]);
        assert!(matches!(chained, Effect::Sequential(ref effects) if effects.len() == 1));
    }

    #[test]
    fn future_effect_resolves_to_feedback_action() {
        let effect: Effect<u32> = Effect::future(async { Some(7) });
        let Effect::Future(fut) = effect else {
            unreachable!("Effect::future must produce a Future variant");
        };
        assert_eq!(tokio_test::block_on(fut), Some(7));
    }
}
