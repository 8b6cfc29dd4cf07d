use std::path::Path;

fn main() {
    let args = libtest_mimic::Arguments::from_args();

    let fixtures_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
    let cases = tests::discover(&fixtures_root).expect("failed to discover fixtures");
    let trials = cases.into_iter().map(tests::TestCase::trial).collect();

    libtest_mimic::run(&args, trials).exit();
}
