#![no_main]

use arbitrary::Arbitrary;
use halo_model::Model;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    first: &'a str,
    second: &'a str,
    probe: &'a str,
}

fuzz_target!(|input: Input<'_>| {
    let Ok(first) = serde_json::from_str::<serde_json::Value>(input.first) else {
        return;
    };
    let Ok(model) = Model::new(first) else {
        return;
    };
    let _ = model.get(input.probe);
    let _ = model.rel(input.probe);
    let _ = model.command(input.probe);
    if let Ok(second) = serde_json::from_str::<serde_json::Value>(input.second) {
        let _ = model.reinit(second);
    }
    let _ = model.to_json();
});
