//! Headless menu -> gameplay -> pause demo.
//!
//! Run with:
//!   cargo run --example headless_demo -p cadence-runtime
//!   cargo run --example headless_demo -p cadence-runtime -- --realtime
//!   cargo run --example headless_demo -p cadence-runtime -- --config cadence.json
//!
//! By default the loop runs against a simulated clock advancing 1ms per
//! iteration, so the whole session finishes instantly. `--realtime` uses the
//! monotonic clock and the platform CPU sampler instead. Set `RUST_LOG=debug`
//! to see transitions and per-second frame statistics.

use std::time::Duration;

use cadence_runtime::prelude::*;

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// Shows for half a second, then hands over to gameplay.
struct Menu {
    flags: StateFlags,
    ticks: u32,
}

impl State for Menu {
    fn name(&self) -> &'static str {
        "menu"
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) -> bool {
        self.ticks += 1;
        if self.ticks == 30 {
            println!("menu: starting game");
            ctx.make_permanent(Gameplay::new());
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

/// Moves a ball for five simulated seconds, pausing every two.
struct Gameplay {
    flags: StateFlags,
    ticks: u32,
    position: f64,
}

impl Gameplay {
    const SPEED_PER_TICK: f64 = 2.5;

    fn new() -> Self {
        Self {
            flags: StateFlags::new(),
            ticks: 0,
            position: 0.0,
        }
    }
}

impl State for Gameplay {
    fn name(&self) -> &'static str {
        "gameplay"
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) -> bool {
        self.ticks += 1;
        self.position += Self::SPEED_PER_TICK * ctx.delta_factor();

        if self.ticks % 120 == 0 {
            println!(
                "gameplay: tick {} position {:.1} ({} fps, {} ups, cpu {:.1}%)",
                self.ticks,
                self.position,
                ctx.stats().frames_per_second,
                ctx.stats().updates_per_second,
                ctx.cpu_percentage()
            );
            ctx.make_temporary(Pause { flags: StateFlags::new(), ticks: 0 });
        }
        if self.ticks >= 300 {
            println!("gameplay: finished");
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

/// Overlay that resumes the game after a quarter second.
struct Pause {
    flags: StateFlags,
    ticks: u32,
}

impl State for Pause {
    fn name(&self) -> &'static str {
        "pause"
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) -> bool {
        self.ticks += 1;
        if self.ticks == 15 {
            println!("pause: resuming");
            if let Some(game) = ctx.previous_mut() {
                game.activate();
            }
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

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut realtime = false;
    let mut config = RuntimeConfig::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--realtime" => realtime = true,
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config needs a path"))?;
                config = RuntimeConfig::from_path(&path)?;
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    let summary = if realtime {
        let mut runtime = RuntimeLoop::new(config, HeadlessInput::new())?;
        runtime.initialize(Menu { flags: StateFlags::new(), ticks: 0 })?;
        let summary = runtime.run()?;
        runtime.shutdown();
        summary
    } else {
        let clock = Clock::new(Box::new(ManualSource::stepping(Duration::from_millis(1))));
        let mut runtime = RuntimeLoop::with_parts(
            config,
            clock,
            UtilizationSampler::disabled(),
            HeadlessInput::new(),
        )?;
        runtime.initialize(Menu { flags: StateFlags::new(), ticks: 0 })?;
        let summary = runtime.run()?;
        runtime.shutdown();
        summary
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
