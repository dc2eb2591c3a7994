use std::fmt;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use log::{debug, info, trace};

use crate::config::Config;
use crate::sink::Sink;
use crate::strategy::Strategy;

/// Best-of-N timing of one strategy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Measurement {
    pub strategy: Strategy,
    pub iterations: u64,
    pub best: Duration,
    pub last: u64,
    pub rounds: u32,
}

impl Measurement {
    /// Until a round is recorded `best` is `Duration::MAX` and `last` is 0,
    /// which is also what gets reported for zero measured rounds.
    pub fn new(strategy: Strategy, iterations: u64) -> Self {
        Self {
            strategy,
            iterations,
            best: Duration::MAX,
            last: 0,
            rounds: 0,
        }
    }

    /// Keeps the faster of `elapsed` and the current best.
    pub fn record(&mut self, elapsed: Duration, result: u64) {
        self.best = self.best.min(elapsed);
        self.last = result;
        self.rounds += 1;
    }

    pub fn ns_per_op(&self) -> f64 {
        if self.iterations == 0 {
            return 0.0;
        }
        self.best.as_nanos() as f64 / self.iterations as f64
    }

    pub fn total_ms(&self) -> f64 {
        self.best.as_nanos() as f64 / 1_000_000.0
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<14} best = {:8.3} ns/op, total = {:.3} ms, last = {}",
            self.strategy.name(),
            self.ns_per_op(),
            self.total_ms(),
            self.last
        )
    }
}

/// Runs every strategy `rounds` times untimed.
pub fn warm_up(iterations: u64, rounds: u32, sink: &mut Sink) {
    for _ in 0..rounds {
        for strategy in Strategy::ALL {
            sink.fold(strategy.run(iterations));
        }
    }
}

/// Times `rounds` trials of `strategy` and keeps the fastest.
pub fn measure(strategy: Strategy, iterations: u64, rounds: u32, sink: &mut Sink) -> Measurement {
    let runner = strategy.runner();
    let mut measurement = Measurement::new(strategy, iterations);
    for _ in 0..rounds {
        let start = Instant::now();
        let result = runner(iterations);
        let elapsed = start.elapsed();
        measurement.record(elapsed, result);
        sink.fold(result);
    }
    measurement
}

/// Warm-up, measurement and report. Returns the final sink.
pub fn run<W: Write>(config: &Config, out: &mut W) -> io::Result<Sink> {
    info!(
        "iterations={} warm_up_rounds={} measured_rounds={}",
        config.iterations, config.warm_up_rounds, config.measured_rounds
    );
    let mut sink = Sink::new();

    debug!("warming up");
    warm_up(config.iterations, config.warm_up_rounds, &mut sink);

    for strategy in Strategy::ALL {
        debug!("measuring {strategy}");
        let measurement = measure(strategy, config.iterations, config.measured_rounds, &mut sink);
        info!("{strategy}: best {:?}", measurement.best);
        writeln!(out, "{measurement}")?;
    }

    trace!("sink={:#x}", sink.value());
    if let Some(line) = sink.diagnostic() {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(sink)
}

#[test]
fn test_best_never_increases() {
    let mut measurement = Measurement::new(Strategy::NoLock, 10);
    let mut previous = measurement.best;
    for elapsed in [40, 25, 30, 25, 10, 90] {
        measurement.record(Duration::from_nanos(elapsed), 10);
        assert!(measurement.best <= previous);
        previous = measurement.best;
    }
    assert_eq!(measurement.best, Duration::from_nanos(10));
    assert_eq!(measurement.rounds, 6);
}

#[test]
fn test_ns_per_op() {
    let mut measurement = Measurement::new(Strategy::MonitorLock, 1_000);
    measurement.record(Duration::from_micros(3), 1_000);
    assert_eq!(measurement.ns_per_op(), 3.0);
    assert_eq!(measurement.total_ms(), 0.003);

    let mut empty = Measurement::new(Strategy::MonitorLock, 0);
    empty.record(Duration::from_nanos(50), 0);
    assert_eq!(empty.ns_per_op(), 0.0);
}

#[test]
fn test_report_line_format() {
    let mut measurement = Measurement::new(Strategy::ExplicitLock, 1_000);
    measurement.record(Duration::from_nanos(12_345), 1_000);
    assert_eq!(
        measurement.to_string(),
        "ExplicitLock   best =   12.345 ns/op, total = 0.012 ms, last = 1000"
    );
}

#[test]
fn test_measure_folds_every_round() {
    let mut sink = Sink::new();
    let measurement = measure(Strategy::NoLock, 7, 3, &mut sink);
    assert_eq!(measurement.last, 7);
    assert_eq!(measurement.rounds, 3);
    assert!(measurement.ns_per_op().is_finite());
    assert!(measurement.ns_per_op() >= 0.0);
    // Odd number of folds of the same value.
    assert_eq!(sink.value(), 7);
}

#[test]
fn test_run_prints_one_line_per_strategy() {
    let config = Config {
        iterations: 1_000,
        warm_up_rounds: 1,
        measured_rounds: 1,
    };
    let mut out = Vec::new();
    let sink = run(&config, &mut out).unwrap();

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    for (line, strategy) in lines.iter().zip(Strategy::ALL) {
        assert!(line.starts_with(strategy.name()));
        assert!(line.ends_with("last = 1000"));
    }
    // Three warm-up folds and three measured folds cancel out.
    assert_eq!(sink.value(), 0);
}

#[test]
fn test_sink_is_deterministic() {
    let config = Config {
        iterations: 321,
        warm_up_rounds: 2,
        measured_rounds: 3,
    };
    let first = run(&config, &mut io::sink()).unwrap();
    let second = run(&config, &mut io::sink()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.hit_sentinel(), second.hit_sentinel());
}

#[test]
fn test_zero_measured_rounds_still_reports() {
    let config = Config {
        iterations: 1_000,
        warm_up_rounds: 1,
        measured_rounds: 0,
    };
    let mut out = Vec::new();
    run(&config, &mut out).unwrap();

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    for (line, strategy) in lines.iter().zip(Strategy::ALL) {
        assert!(line.starts_with(strategy.name()));
        assert!(line.ends_with("last = 0"));
    }

    let measurement = measure(Strategy::MonitorLock, 1_000, 0, &mut Sink::new());
    assert_eq!(measurement.rounds, 0);
    assert_eq!(measurement.best, Duration::MAX);
    assert!(measurement.ns_per_op().is_finite());
}
