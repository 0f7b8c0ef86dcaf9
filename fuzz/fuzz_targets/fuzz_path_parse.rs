#![no_main]

use halo_model::Path;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let path = Path::parse(data);
    // Re-parsing the display form of a parsed path is stable.
    let shown = path.to_string();
    let again = Path::parse(&shown);
    assert_eq!(again.to_string(), shown);
});
