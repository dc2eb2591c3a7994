use std::hint::black_box;

/// Arbitrary value the sink is never expected to reach.
pub const SENTINEL: u64 = 0x9e37_79b9_7f4a_7c15;

/// XOR accumulator of every strategy result.
///
/// Results only feed this value and the final sentinel comparison, which
/// keeps the optimizer from treating the counting loops as dead code.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Sink {
    value: u64,
}

impl Sink {
    pub const fn new() -> Self {
        Self { value: 0 }
    }

    pub fn fold(&mut self, result: u64) {
        self.value = black_box(self.value ^ result);
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn hit_sentinel(&self) -> bool {
        black_box(self.value) == SENTINEL
    }

    /// The extra report line, present only when the sentinel was hit.
    pub fn diagnostic(&self) -> Option<String> {
        self.hit_sentinel()
            .then(|| format!("Unlikely, but the sink landed on {:#x}", self.value))
    }
}

#[test]
fn test_fold_is_xor() {
    let mut sink = Sink::new();
    sink.fold(0b1100);
    sink.fold(0b1010);
    assert_eq!(sink.value(), 0b0110);
    sink.fold(0b0110);
    assert_eq!(sink, Sink::default());
}

#[test]
fn test_diagnostic_only_on_sentinel() {
    let mut sink = Sink::new();
    sink.fold(1_000);
    assert!(sink.diagnostic().is_none());

    let mut sink = Sink::new();
    sink.fold(SENTINEL);
    let line = sink.diagnostic().unwrap();
    assert!(line.contains("0x9e3779b97f4a7c15"));
}
