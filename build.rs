use std::env;
use std::path::Path;

const HINT_VAR: &str = "EXAMPLES_ROOT_HINT";

// Bakes a fallback examples root into the binary for checkouts where the
// tool is run from outside the examples tree.
fn main() {
    println!("cargo:rerun-if-env-changed={HINT_VAR}");

    let Some(hint) = env::var_os(HINT_VAR).filter(|hint| !hint.is_empty()) else {
        return;
    };
    match Path::new(&hint).canonicalize() {
        Ok(root) if root.is_dir() => {
            println!("cargo:rustc-env={HINT_VAR}={}", root.display());
        }
        _ => println!(
            "cargo:warning={HINT_VAR}={} is not a directory; ignoring it",
            Path::new(&hint).display()
        ),
    }
}
