//! Fuzz the scenario text parser: arbitrary input must parse or error,
//! never panic, and accepted input must round-trip through the writer.

#![no_main]

use libfuzzer_sys::fuzz_target;
use skirmish::Scenario;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(scenario) = Scenario::parse(text) {
        let rendered = scenario.to_text();
        let reparsed = Scenario::parse(&rendered).expect("writer output must reparse");
        assert_eq!(scenario.grid_size, reparsed.grid_size);
        assert_eq!(scenario.rounds, reparsed.rounds);
        assert_eq!(scenario.waves.len(), reparsed.waves.len());
    }
});
