#![no_main]

use jsgate::{Sandbox, SandboxConfig};
use libfuzzer_sys::fuzz_target;

/// Evaluation steps per run; keeps infinite loops from hanging the fuzzer
const EXECUTION_QUOTA: u64 = 100_000;

fuzz_target!(|data: &[u8]| {
    // Only process valid UTF-8
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };

    // Smaller limit for the evaluator (more expensive per byte)
    if source.len() > 10_000 {
        return;
    }

    let mut config = SandboxConfig::safe();
    config.execution_quota = Some(EXECUTION_QUOTA);
    config.timeout_ms = 2_000;
    for name in ["setTimeout", "setInterval", "clearTimeout", "clearInterval", "RegExp"] {
        config.globals.push(name.to_string());
    }
    let sandbox = Sandbox::new(config);

    // Errors are expected; panics are not
    let Ok(program) = sandbox.compile(source) else {
        return;
    };
    if let Ok(ret) = program.execute(&[]) {
        let _ = sandbox.resolve_promise(&ret.result);
    }
    let _ = sandbox.advance_timers(1_000);
});
