//! Property tests for state stack ordering and loop termination.
//!
//! Random sequences of stack operations are checked against a plain
//! `VecDeque` model, and random state lifetimes are checked to always drain
//! the loop.

use std::collections::VecDeque;
use std::time::Duration;

use cadence_runtime::prelude::*;
use proptest::prelude::*;

const NAMES: [&str; 8] = ["s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7"];

struct Tagged {
    name: &'static str,
    flags: StateFlags,
}

impl Tagged {
    fn new(tag: usize) -> Self {
        Self {
            name: NAMES[tag % NAMES.len()],
            flags: StateFlags::new(),
        }
    }
}

impl State for Tagged {
    fn name(&self) -> &'static str {
        self.name
    }

    fn update(&mut self, _ctx: &mut FrameContext<'_>) -> bool {
        true
    }

    fn render(&mut self, _ctx: &mut FrameContext<'_>) -> bool {
        true
    }

    fn flags(&self) -> &StateFlags {
        &self.flags
    }

    fn flags_mut(&mut self) -> &mut StateFlags {
        &mut self.flags
    }
}

#[derive(Debug, Clone)]
enum StackOp {
    Overlay(usize),
    Permanent(usize),
    RemoveCurrent,
}

fn stack_op_strategy() -> impl Strategy<Value = StackOp> {
    prop_oneof![
        (0..NAMES.len()).prop_map(StackOp::Overlay),
        (0..NAMES.len()).prop_map(StackOp::Permanent),
        Just(StackOp::RemoveCurrent),
    ]
}

/// Dies after `lifetime` updates; the first update optionally pushes an
/// overlay that dies after `child` updates.
struct Mortal {
    flags: StateFlags,
    updates: u32,
    lifetime: u32,
    child: Option<u32>,
}

impl State for Mortal {
    fn name(&self) -> &'static str {
        "mortal"
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) -> bool {
        self.updates += 1;
        if self.updates == 1 {
            if let Some(child) = self.child.take() {
                ctx.make_temporary(Mortal {
                    flags: StateFlags::new(),
                    updates: 0,
                    lifetime: child,
                    child: None,
                });
            }
        }
        if self.updates >= self.lifetime {
            self.flags.kill();
        }
        true
    }

    fn render(&mut self, _ctx: &mut FrameContext<'_>) -> bool {
        true
    }

    fn flags(&self) -> &StateFlags {
        &self.flags
    }

    fn flags_mut(&mut self) -> &mut StateFlags {
        &mut self.flags
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Overlays go to the front, permanents to the back, removal pops the
    /// front, exactly like a deque.
    #[test]
    fn stack_matches_deque_model(ops in prop::collection::vec(stack_op_strategy(), 0..64)) {
        let mut stack = StateStack::new();
        let mut model: VecDeque<&'static str> = VecDeque::new();

        for op in &ops {
            match op {
                StackOp::Overlay(tag) => {
                    stack.push_overlay(Tagged::new(*tag));
                    model.push_front(NAMES[*tag]);
                }
                StackOp::Permanent(tag) => {
                    stack.push_permanent(Tagged::new(*tag));
                    model.push_back(NAMES[*tag]);
                }
                StackOp::RemoveCurrent => {
                    let removed = stack.remove_current();
                    prop_assert_eq!(removed, model.pop_front().is_some());
                }
            }

            prop_assert_eq!(stack.len(), model.len());
            prop_assert_eq!(stack.names(), model.iter().copied().collect::<Vec<_>>());
            match model.front() {
                Some(front) => {
                    prop_assert_eq!(stack.current().name(), *front);
                    prop_assert_eq!(stack.previous().name(), *model.back().unwrap());
                }
                None => {
                    prop_assert!(stack.try_current().is_err());
                    prop_assert!(stack.try_previous().is_err());
                }
            }
        }
    }

    /// Any mix of self-terminating states and overlays drains the stack, and
    /// every update is accounted for.
    #[test]
    fn mortal_states_always_drain(
        lifetime in 1u32..20,
        child in prop::option::of(1u32..20),
        step_ms in 1u64..40,
    ) {
        let clock = Clock::new(Box::new(ManualSource::stepping(Duration::from_millis(step_ms))));
        let config = RuntimeConfig {
            max_iterations: Some(100_000),
            ..Default::default()
        };
        let mut runtime = RuntimeLoop::with_parts(
            config,
            clock,
            UtilizationSampler::disabled(),
            HeadlessInput::new(),
        )
        .unwrap();
        runtime
            .initialize(Mortal {
                flags: StateFlags::new(),
                updates: 0,
                lifetime,
                child,
            })
            .unwrap();

        let summary = runtime.run().unwrap();
        let expected = u64::from(lifetime) + child.map_or(0, u64::from);
        prop_assert_eq!(summary.total_updates, expected);
        prop_assert!(summary.inner_iterations < 100_000);
        prop_assert!(runtime.stack().is_empty());
        prop_assert_eq!(runtime.phase(), LoopPhase::Terminating);
    }
}
