#![no_main]

use arbitrary::Arbitrary;
use halo_uri::Template;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    template: &'a str,
    params: Vec<(&'a str, &'a str)>,
}

fuzz_target!(|input: Input<'_>| {
    let template = Template::parse(input.template);
    let _ = template.variables();
    let _ = template.expand(&input.params);
});
