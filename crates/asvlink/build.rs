// Stamp target triple and profile into `asvlink version --extended`.
fn main() {
    for (from, to) in [
        ("TARGET", "ASVLINK_BUILD_TARGET"),
        ("PROFILE", "ASVLINK_BUILD_PROFILE"),
    ] {
        println!("cargo:rerun-if-env-changed={from}");
        if let Ok(value) = std::env::var(from) {
            println!("cargo:rustc-env={to}={value}");
        }
    }
}
