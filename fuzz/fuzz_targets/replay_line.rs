#![no_main]

use compile_trace::clock::ManualClock;
use compile_trace::config::TraceConfig;
use compile_trace::replay;
use compile_trace::session::TraceSession;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing must never panic
        for (i, line) in input.lines().enumerate() {
            let _ = replay::parse_line(line, i + 1);
        }

        // Nor may any stream of valid notifications
        let config = TraceConfig {
            min_event_duration_ns: 0,
            ..TraceConfig::default()
        };
        if let Ok(session) = TraceSession::with_sink(Vec::new(), ManualClock::new(), config) {
            let _ = replay::replay(input.as_bytes(), session);
        }
    }
});
