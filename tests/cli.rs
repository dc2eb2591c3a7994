use std::process::{Command, Output};

fn lock_overhead(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lock-overhead"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn small_run_reports_every_strategy() {
    let output = lock_overhead(&["1000", "1", "1"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 3, "{stdout}");
    for (line, name) in lines.iter().zip(["NoLock", "MonitorLock", "ExplicitLock"]) {
        assert!(line.starts_with(&format!("{name:<14} best = ")), "{line}");
        assert!(line.contains(" ns/op, total = "), "{line}");
        assert!(line.ends_with(" ms, last = 1000"), "{line}");
    }
}

#[test]
fn reported_ns_per_op_is_finite() {
    let output = lock_overhead(&["5000", "0", "2"]);
    assert!(output.status.success());

    for line in String::from_utf8(output.stdout).unwrap().lines() {
        let ns: f64 = line
            .split("best =")
            .nth(1)
            .and_then(|rest| rest.split("ns/op").next())
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        assert!(ns.is_finite() && ns >= 0.0, "{line}");
    }
}

#[test]
fn non_numeric_argument_fails_without_report() {
    let output = lock_overhead(&["abc"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(!output.stderr.is_empty());
}

#[test]
fn zero_measured_rounds_still_reports() {
    let output = lock_overhead(&["1000", "1", "0"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 3, "{stdout}");
    assert!(lines.iter().all(|line| line.ends_with(" ms, last = 0")), "{stdout}");
}

#[test]
fn help_flag_is_not_accepted() {
    let output = lock_overhead(&["-h"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn same_inputs_give_same_output_shape() {
    let first = lock_overhead(&["200", "2", "2"]);
    let second = lock_overhead(&["200", "2", "2"]);
    let count = |out: &Output| String::from_utf8_lossy(&out.stdout).lines().count();
    assert_eq!(count(&first), count(&second));
}
